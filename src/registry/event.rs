// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owned, `Clone`-able change events the registry publishes (spec §6,
//! Design Notes "signal/slot event emission in source -> change-event bus
//! in target"). No event borrows into registry storage.

use crate::core::ids::{Address, Cid, Group, System};
use crate::protocol::layers::ModuleId;

/// Which conceptual axis of a Point's Transform data changed. A
/// velocity/acceleration module change fans out into two axis events (spec
/// §4.G: "posVelAcc -> two events, rotVelAcc -> two events").
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ModuleAxis {
    Position,
    Velocity,
    Acceleration,
    Rotation,
    RotationalVelocity,
    RotationalAcceleration,
    Scale,
    ReferenceFrame,
}

impl ModuleAxis {
    /// The axes a change to `module` fans out into, or an empty slice for a
    /// module this crate does not interpret semantically (spec §7,
    /// `UnknownModule`: decoded structurally, not interpreted).
    pub fn for_module(module: ModuleId) -> &'static [ModuleAxis] {
        use crate::protocol::constants::{
            MANUFACTURER_ESTA, MODULE_POSITION, MODULE_POSITION_VEL_ACC, MODULE_REFERENCE_FRAME,
            MODULE_ROTATION, MODULE_ROTATION_VEL_ACC, MODULE_SCALE,
        };
        if module.manufacturer_id != MANUFACTURER_ESTA {
            return &[];
        }
        match module.module_number {
            MODULE_POSITION => &[ModuleAxis::Position],
            MODULE_POSITION_VEL_ACC => &[ModuleAxis::Velocity, ModuleAxis::Acceleration],
            MODULE_ROTATION => &[ModuleAxis::Rotation],
            MODULE_ROTATION_VEL_ACC => {
                &[ModuleAxis::RotationalVelocity, ModuleAxis::RotationalAcceleration]
            }
            MODULE_SCALE => &[ModuleAxis::Scale],
            MODULE_REFERENCE_FRAME => &[ModuleAxis::ReferenceFrame],
            _ => &[],
        }
    }
}

/// Every change-event variant the registry can emit (spec §6's "subscribe
/// to change events" list).
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ChangeEvent {
    NewComponent(Cid),
    RemovedComponent(Cid),
    NewSystem(Cid, System),
    RemovedSystem(Cid, System),
    NewGroup(Cid, System, Group),
    RemovedGroup(Cid, System, Group),
    NewPoint(Cid, Address),
    UpdatedPoint(Cid, Address),
    ExpiredPoint(Cid, Address),
    RemovedPoint(Cid, Address),
    UpdatedModule(Cid, Address, ModuleAxis),
}
