// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rotation module (0x0003): three axes of rotation in micro-degrees,
//! range 0..=359_999_999 (spec §4.B.4).

use crate::core::ser::{Cursor, CursorMut};
use crate::error::CodecError;

const LAYER: &str = "Rotation";

/// Exclusive upper bound for a single axis, in micro-degrees (360 degrees).
pub const MAX_MICRO_DEGREES: u32 = 359_999_999;

#[derive(Copy, Clone, Debug)]
pub struct Rotation {
    x: u32,
    y: u32,
    z: u32,
}

impl Rotation {
    /// Construct from raw micro-degree values, rejecting anything outside
    /// `0..=MAX_MICRO_DEGREES`.
    pub fn new(x: u32, y: u32, z: u32) -> Result<Self, CodecError> {
        for (field, value) in [("X", x), ("Y", y), ("Z", z)] {
            if value > MAX_MICRO_DEGREES {
                return Err(CodecError::FieldOutOfRange { layer: LAYER, field });
            }
        }
        Ok(Self { x, y, z })
    }

    /// Construct from fractional-degree values, truncating to micro-degrees.
    pub fn from_degrees(x: f64, y: f64, z: f64) -> Result<Self, CodecError> {
        let to_micro = |d: f64| -> u32 {
            let wrapped = d.rem_euclid(360.0);
            (wrapped * 1_000_000.0).round() as u32
        };
        Self::new(to_micro(x), to_micro(y), to_micro(z))
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn z(&self) -> u32 {
        self.z
    }

    /// Axis values converted back to fractional degrees.
    pub fn degrees(&self) -> (f64, f64, f64) {
        let to_deg = |v: u32| v as f64 / 1_000_000.0;
        (to_deg(self.x), to_deg(self.y), to_deg(self.z))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 12];
        let mut w = CursorMut::new(&mut buf);
        w.write_u32(self.x).unwrap();
        w.write_u32(self.y).unwrap();
        w.write_u32(self.z).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Cursor::new(bytes);
        let x = r.read_u32()?;
        let y = r.read_u32()?;
        let z = r.read_u32()?;
        Self::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let r = Rotation::new(0, 180_000_000, MAX_MICRO_DEGREES).unwrap();
        let decoded = Rotation::decode(&r.encode()).unwrap();
        assert_eq!(decoded.y(), 180_000_000);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Rotation::new(MAX_MICRO_DEGREES + 1, 0, 0).is_err());
    }

    #[test]
    fn from_degrees_wraps_and_converts() {
        let r = Rotation::from_degrees(370.0, 0.0, 0.0).unwrap();
        assert_eq!(r.x(), 10_000_000);
    }
}
