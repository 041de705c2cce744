// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform layer: carried inside a Transform message (spec §4.B.2).

use crate::core::ids::System;
use crate::core::ser::{Cursor, CursorMut};
use crate::core::time::Timestamp;
use crate::error::CodecError;
use crate::protocol::constants::VECTOR_OTP_POINT;

const LAYER: &str = "Transform";

/// `LengthOffset`: PDULength excludes Vector + PDULength fields (4 octets).
pub const LENGTH_OFFSET: u16 = 4;

/// Fixed header size (Vector through Reserved), not including child Point layers.
pub const HEADER_LEN: usize = 18;

/// Bit 7 of the Transform layer's Options octet.
const FULL_POINT_SET_BIT: u8 = 0b1000_0000;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct TransformOptions {
    pub full_point_set: bool,
}

impl TransformOptions {
    pub fn to_wire(self) -> u8 {
        if self.full_point_set {
            FULL_POINT_SET_BIT
        } else {
            0
        }
    }

    pub fn from_wire(byte: u8) -> Self {
        Self { full_point_set: byte & FULL_POINT_SET_BIT != 0 }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TransformLayer {
    pub pdu_length: u16,
    pub system: System,
    pub timestamp: Timestamp,
    pub options: TransformOptions,
}

impl TransformLayer {
    pub fn new(system: System, timestamp: Timestamp, options: TransformOptions) -> Self {
        Self { pdu_length: 0, system, timestamp, options }
    }

    pub fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<usize, CodecError> {
        cursor.write_u16(VECTOR_OTP_POINT)?;
        let length_at = cursor.offset();
        cursor.write_u16(self.pdu_length)?;
        cursor.write_u8(self.system.get())?;
        cursor.write_u64(self.timestamp.as_micros())?;
        cursor.write_u8(self.options.to_wire())?;
        cursor.write_zeros(4)?;
        Ok(length_at)
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let vector = cursor.read_u16()?;
        if vector != VECTOR_OTP_POINT {
            return Err(CodecError::BadVector { layer: LAYER, vector });
        }
        let pdu_length = cursor.read_u16()?;
        let system = System::new(cursor.read_u8()?)
            .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "System" })?;
        let timestamp = Timestamp::from_micros(cursor.read_u64()?);
        let options = TransformOptions::from_wire(cursor.read_u8()?);
        cursor.skip(4)?;
        Ok(Self { pdu_length, system, timestamp, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::System;

    #[test]
    fn roundtrip() {
        let layer = TransformLayer::new(
            System::new(1).unwrap(),
            Timestamp::from_micros(123_456),
            TransformOptions { full_point_set: true },
        );
        let mut buf = [0u8; HEADER_LEN];
        let mut w = CursorMut::new(&mut buf);
        layer.encode(&mut w).unwrap();
        let decoded = TransformLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.system, layer.system);
        assert_eq!(decoded.timestamp, layer.timestamp);
        assert!(decoded.options.full_point_set);
    }

    #[test]
    fn rejects_system_out_of_range() {
        assert!(System::new(0).is_err());
        assert!(System::new(201).is_err());
    }

    #[test]
    fn full_point_set_bit_roundtrips() {
        assert!(TransformOptions::from_wire(0x80).full_point_set);
        assert!(!TransformOptions::from_wire(0x00).full_point_set);
    }
}
