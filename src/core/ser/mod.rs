// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Big-endian byte-stream primitives shared by every wire layer.

pub mod cursor;

pub use cursor::{truncate_at_rune_boundary, Cursor, CursorMut};
