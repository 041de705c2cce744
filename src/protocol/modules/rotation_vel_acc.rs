// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rotation Velocity/Acceleration module (0x0004): per-axis angular
//! velocity in µ°/s and angular acceleration in µ°/s^2 (spec §4.B.4).

use crate::core::ser::{Cursor, CursorMut};
use crate::error::CodecError;

#[derive(Copy, Clone, Debug, Default)]
pub struct RotationVelAcc {
    pub velocity_x: i32,
    pub velocity_y: i32,
    pub velocity_z: i32,
    pub acceleration_x: i32,
    pub acceleration_y: i32,
    pub acceleration_z: i32,
}

impl RotationVelAcc {
    pub fn new(
        velocity_x: i32,
        velocity_y: i32,
        velocity_z: i32,
        acceleration_x: i32,
        acceleration_y: i32,
        acceleration_z: i32,
    ) -> Self {
        Self { velocity_x, velocity_y, velocity_z, acceleration_x, acceleration_y, acceleration_z }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 24];
        let mut w = CursorMut::new(&mut buf);
        w.write_i32(self.velocity_x).unwrap();
        w.write_i32(self.velocity_y).unwrap();
        w.write_i32(self.velocity_z).unwrap();
        w.write_i32(self.acceleration_x).unwrap();
        w.write_i32(self.acceleration_y).unwrap();
        w.write_i32(self.acceleration_z).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Cursor::new(bytes);
        Ok(Self {
            velocity_x: r.read_i32()?,
            velocity_y: r.read_i32()?,
            velocity_z: r.read_i32()?,
            acceleration_x: r.read_i32()?,
            acceleration_y: r.read_i32()?,
            acceleration_z: r.read_i32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let v = RotationVelAcc::new(1, -2, 3, -4, 5, -6);
        let decoded = RotationVelAcc::decode(&v.encode()).unwrap();
        assert_eq!(decoded.velocity_z, 3);
        assert_eq!(decoded.acceleration_y, 5);
    }
}
