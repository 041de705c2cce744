// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer encode/decode/validate (spec §4.B). Each layer exposes the same
//! four operations: construct, decode, validate, encode.

pub mod advertisement;
pub mod module;
pub mod module_adv;
pub mod name_adv;
pub mod point;
pub mod root;
pub mod system_adv;
pub mod transform;

pub use advertisement::{AdvertisementLayer, AdvertisementVector};
pub use module::{ModuleId, ModuleLayer};
pub use module_adv::ModuleAdvertisementLayer;
pub use name_adv::{NameAdvertisementLayer, PointDescriptor};
pub use point::PointLayer;
pub use root::{RootLayer, RootVector};
pub use system_adv::SystemAdvertisementLayer;
pub use transform::{TransformLayer, TransformOptions};
