// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scale module (0x0005): three signed unitless axis scales, fixed-point
//! with 100% represented as 1,000,000 (spec §4.B.4, resolved in DESIGN.md).

use crate::core::ser::{Cursor, CursorMut};
use crate::error::CodecError;

/// Fixed-point units per 100%.
pub const UNITY: i32 = 1_000_000;

#[derive(Copy, Clone, Debug)]
pub struct Scale {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Default for Scale {
    fn default() -> Self {
        Self::from_percent(100.0, 100.0, 100.0)
    }
}

impl Scale {
    /// Construct from raw fixed-point axis values.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Construct from per-axis percentages (100.0 == unscaled).
    pub fn from_percent(x: f64, y: f64, z: f64) -> Self {
        let conv = |p: f64| (p / 100.0 * UNITY as f64).round() as i32;
        Self { x: conv(x), y: conv(y), z: conv(z) }
    }

    /// Axis values converted back to percentages.
    pub fn to_percent(&self) -> (f64, f64, f64) {
        let conv = |v: i32| v as f64 / UNITY as f64 * 100.0;
        (conv(self.x), conv(self.y), conv(self.z))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 12];
        let mut w = CursorMut::new(&mut buf);
        w.write_i32(self.x).unwrap();
        w.write_i32(self.y).unwrap();
        w.write_i32(self.z).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Cursor::new(bytes);
        Ok(Self { x: r.read_i32()?, y: r.read_i32()?, z: r.read_i32()? })
    }
}
