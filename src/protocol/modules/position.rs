// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Position module (0x0001): X/Y/Z axes, millimetre or micrometre scale
//! (spec §4.B.4).

use crate::core::ser::{Cursor, CursorMut};
use crate::error::CodecError;

/// Bit 7 of the Position module's Options octet: 1 => millimetres, 0 => micrometres.
const MILLIMETRE_BIT: u8 = 0b1000_0000;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PositionScale {
    Micrometres,
    Millimetres,
}

#[derive(Copy, Clone, Debug)]
pub struct Position {
    pub scale: PositionScale,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    /// Construct from raw values already in the module's native units.
    pub fn new(scale: PositionScale, x: i32, y: i32, z: i32) -> Self {
        Self { scale, x, y, z }
    }

    /// Construct directly from millimetre values.
    pub fn from_millimetres(x: i32, y: i32, z: i32) -> Self {
        Self { scale: PositionScale::Millimetres, x, y, z }
    }

    /// Construct directly from micrometre values.
    pub fn from_micrometres(x: i32, y: i32, z: i32) -> Self {
        Self { scale: PositionScale::Micrometres, x, y, z }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 13];
        let mut w = CursorMut::new(&mut buf);
        let options = match self.scale {
            PositionScale::Millimetres => MILLIMETRE_BIT,
            PositionScale::Micrometres => 0,
        };
        w.write_u8(options).unwrap();
        w.write_i32(self.x).unwrap();
        w.write_i32(self.y).unwrap();
        w.write_i32(self.z).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Cursor::new(bytes);
        let options = r.read_u8()?;
        let scale = if options & MILLIMETRE_BIT != 0 {
            PositionScale::Millimetres
        } else {
            PositionScale::Micrometres
        };
        let x = r.read_i32()?;
        let y = r.read_i32()?;
        let z = r.read_i32()?;
        Ok(Self { scale, x, y, z })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_millimetres() {
        let p = Position::from_millimetres(1, -2, 3);
        let decoded = Position::decode(&p.encode()).unwrap();
        assert_eq!(decoded.scale, PositionScale::Millimetres);
        assert_eq!((decoded.x, decoded.y, decoded.z), (1, -2, 3));
    }

    #[test]
    fn roundtrip_micrometres() {
        let p = Position::from_micrometres(1_000_000, 0, -5);
        let decoded = Position::decode(&p.encode()).unwrap();
        assert_eq!(decoded.scale, PositionScale::Micrometres);
    }
}
