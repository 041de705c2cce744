// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Standard (ESTA) module value types (spec §4.B.4).
//!
//! Each type here encodes/decodes its own `additional` payload for a
//! [`crate::protocol::layers::ModuleLayer`]; they carry no `PDULength` or
//! identifier of their own, since the surrounding `ModuleLayer` already
//! handles framing.

pub mod position;
pub mod position_vel_acc;
pub mod reference_frame;
pub mod rotation;
pub mod rotation_vel_acc;
pub mod scale;

pub use position::{Position, PositionScale};
pub use position_vel_acc::PositionVelAcc;
pub use reference_frame::ReferenceFrame;
pub use rotation::Rotation;
pub use rotation_vel_acc::RotationVelAcc;
pub use scale::Scale;

use crate::protocol::constants::{
    MANUFACTURER_ESTA, MODULE_POSITION, MODULE_POSITION_VEL_ACC, MODULE_REFERENCE_FRAME,
    MODULE_ROTATION, MODULE_ROTATION_VEL_ACC, MODULE_SCALE,
};
use crate::protocol::layers::ModuleId;

impl Position {
    pub fn module_id() -> ModuleId {
        ModuleId::new(MANUFACTURER_ESTA, MODULE_POSITION)
    }
}

impl PositionVelAcc {
    pub fn module_id() -> ModuleId {
        ModuleId::new(MANUFACTURER_ESTA, MODULE_POSITION_VEL_ACC)
    }
}

impl Rotation {
    pub fn module_id() -> ModuleId {
        ModuleId::new(MANUFACTURER_ESTA, MODULE_ROTATION)
    }
}

impl RotationVelAcc {
    pub fn module_id() -> ModuleId {
        ModuleId::new(MANUFACTURER_ESTA, MODULE_ROTATION_VEL_ACC)
    }
}

impl Scale {
    pub fn module_id() -> ModuleId {
        ModuleId::new(MANUFACTURER_ESTA, MODULE_SCALE)
    }
}

impl ReferenceFrame {
    pub fn module_id() -> ModuleId {
        ModuleId::new(MANUFACTURER_ESTA, MODULE_REFERENCE_FRAME)
    }
}
