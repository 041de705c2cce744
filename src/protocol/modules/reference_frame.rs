// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference Frame module (0x0006): the Address of the Point this Point's
//! Transform values are relative to (spec §4.B.4).

use crate::core::ids::{Address, Group, Point, System};
use crate::core::ser::{Cursor, CursorMut};
use crate::error::CodecError;

const LAYER: &str = "ReferenceFrame";

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ReferenceFrame {
    pub relative_to: Address,
}

impl ReferenceFrame {
    pub fn new(relative_to: Address) -> Self {
        Self { relative_to }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 7];
        let mut w = CursorMut::new(&mut buf);
        w.write_u8(self.relative_to.system.get()).unwrap();
        w.write_u16(self.relative_to.group.get()).unwrap();
        w.write_u32(self.relative_to.point.get()).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Cursor::new(bytes);
        let system = System::new(r.read_u8()?)
            .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "System" })?;
        let group = Group::new(r.read_u16()?)
            .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "Group" })?;
        let point = Point::new(r.read_u32()?)
            .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "Point" })?;
        Ok(Self { relative_to: Address::new(system, group, point) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let frame = ReferenceFrame::new(Address::new(
            System::new(1).unwrap(),
            Group::new(2).unwrap(),
            Point::new(3).unwrap(),
        ));
        let decoded = ReferenceFrame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rejects_invalid_system() {
        let mut bytes = ReferenceFrame::new(Address::new(
            System::new(1).unwrap(),
            Group::new(1).unwrap(),
            Point::new(1).unwrap(),
        ))
        .encode();
        bytes[0] = 0;
        assert!(ReferenceFrame::decode(&bytes).is_err());
    }
}
