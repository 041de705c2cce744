// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point layer: one Point's identity/priority wrapper inside a Transform
//! message, carrying zero or more Module layers (spec §4.B.3).

use crate::core::ids::{Group, Point, Priority};
use crate::core::ser::{Cursor, CursorMut};
use crate::core::time::Timestamp;
use crate::error::CodecError;
use crate::protocol::constants::VECTOR_OTP_MODULE;

const LAYER: &str = "Point";

/// `LengthOffset`: PDULength excludes Vector + PDULength fields.
pub const LENGTH_OFFSET: u16 = 4;

/// Fixed header size (Vector through Reserved), not including child Modules.
pub const HEADER_LEN: usize = 24;

#[derive(Copy, Clone, Debug)]
pub struct PointLayer {
    pub pdu_length: u16,
    pub priority: Priority,
    pub group: Group,
    pub point: Point,
    pub timestamp: Timestamp,
}

impl PointLayer {
    pub fn new(priority: Priority, group: Group, point: Point, timestamp: Timestamp) -> Self {
        Self { pdu_length: 0, priority, group, point, timestamp }
    }

    pub fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<usize, CodecError> {
        cursor.write_u16(VECTOR_OTP_MODULE)?;
        let length_at = cursor.offset();
        cursor.write_u16(self.pdu_length)?;
        cursor.write_u8(self.priority.get())?;
        cursor.write_u16(self.group.get())?;
        cursor.write_u32(self.point.get())?;
        cursor.write_u64(self.timestamp.as_micros())?;
        cursor.write_u8(0)?; // Options, reserved
        cursor.write_zeros(4)?;
        Ok(length_at)
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let vector = cursor.read_u16()?;
        if vector != VECTOR_OTP_MODULE {
            return Err(CodecError::BadVector { layer: LAYER, vector });
        }
        let pdu_length = cursor.read_u16()?;
        let priority = Priority::new(cursor.read_u8()?)?;
        let group = Group::new(cursor.read_u16()?)
            .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "Group" })?;
        let point = Point::new(cursor.read_u32()?)
            .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "Point" })?;
        let timestamp = Timestamp::from_micros(cursor.read_u64()?);
        let _options = cursor.read_u8()?;
        cursor.skip(4)?;
        Ok(Self { pdu_length, priority, group, point, timestamp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PointLayer {
        PointLayer::new(
            Priority::new(100).unwrap(),
            Group::new(1).unwrap(),
            Point::new(1).unwrap(),
            Timestamp::from_micros(42),
        )
    }

    #[test]
    fn roundtrip() {
        let layer = sample();
        let mut buf = [0u8; HEADER_LEN];
        layer.encode(&mut CursorMut::new(&mut buf)).unwrap();
        let decoded = PointLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.priority, layer.priority);
        assert_eq!(decoded.group, layer.group);
        assert_eq!(decoded.point, layer.point);
    }

    #[test]
    fn reserved_priority_is_rejected() {
        assert!(Priority::new(201).is_err());
    }
}
