// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Name-Advertisement inner layer: Request, or Response carrying a sorted
//! list of (System, Group, Point, PointName) descriptors (spec §4.B.5).

use crate::core::ids::{Address, Group, Point, System};
use crate::core::ser::{Cursor, CursorMut};
use crate::error::{CodecError, MessageError};
use crate::protocol::constants::{list_bounds, VECTOR_OTP_NAME_ADVERTISEMENT_LIST};
use crate::protocol::layers::advertisement::RESPONSE_BIT;

const LAYER: &str = "NameAdvertisement";

pub const LENGTH_OFFSET: u16 = 4;
pub const HEADER_LEN: usize = 6;

/// System(1) + Group(2) + Point(4) + PointName(32).
const ITEM_LEN: usize = 39;

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PointDescriptor {
    pub address: Address,
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct NameAdvertisementLayer {
    pub pdu_length: u16,
    pub response: bool,
    pub descriptors: Vec<PointDescriptor>,
}

impl NameAdvertisementLayer {
    pub fn request() -> Self {
        Self { pdu_length: 0, response: false, descriptors: Vec::new() }
    }

    pub fn response() -> Self {
        Self { pdu_length: 0, response: true, descriptors: Vec::new() }
    }

    fn list_payload_len(count: usize) -> usize {
        count * ITEM_LEN
    }

    /// Append a descriptor, failing with `ListFull` on overflow (spec §7).
    /// Callers are responsible for keeping the list address-sorted (spec
    /// §4.B.5, "a sorted list").
    pub fn push(&mut self, descriptor: PointDescriptor) -> Result<(), MessageError> {
        if Self::list_payload_len(self.descriptors.len() + 1) > list_bounds::NAME_LIST_MAX {
            return Err(MessageError::ListFull { max: list_bounds::NAME_LIST_MAX });
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<usize, CodecError> {
        cursor.write_u16(VECTOR_OTP_NAME_ADVERTISEMENT_LIST)?;
        let length_at = cursor.offset();
        let payload_len = if self.response { Self::list_payload_len(self.descriptors.len()) } else { 0 };
        let pdu_length = (HEADER_LEN + payload_len) as u16 - LENGTH_OFFSET;
        cursor.write_u16(pdu_length)?;
        cursor.write_u8(if self.response { RESPONSE_BIT } else { 0 })?;
        cursor.write_u8(0)?; // Reserved
        if self.response {
            for d in &self.descriptors {
                cursor.write_u8(d.address.system.get())?;
                cursor.write_u16(d.address.group.get())?;
                cursor.write_u32(d.address.point.get())?;
                cursor.write_name(&d.name, 32)?;
            }
        }
        Ok(length_at)
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let vector = cursor.read_u16()?;
        if vector != VECTOR_OTP_NAME_ADVERTISEMENT_LIST {
            return Err(CodecError::BadVector { layer: LAYER, vector });
        }
        let pdu_length = cursor.read_u16()?;
        let options = cursor.read_u8()?;
        let response = options & RESPONSE_BIT != 0;
        cursor.skip(1)?; // Reserved

        let mut descriptors = Vec::new();
        if response {
            let payload_len =
                (pdu_length as usize + LENGTH_OFFSET as usize).saturating_sub(HEADER_LEN);
            if payload_len % ITEM_LEN != 0 {
                return Err(CodecError::Malformed {
                    layer: LAYER,
                    reason: "name list payload not a multiple of item size",
                });
            }
            for _ in 0..(payload_len / ITEM_LEN) {
                let system = System::new(cursor.read_u8()?)
                    .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "System" })?;
                let group = Group::new(cursor.read_u16()?)
                    .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "Group" })?;
                let point = Point::new(cursor.read_u32()?)
                    .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "Point" })?;
                let name = cursor.read_name(32)?;
                descriptors.push(PointDescriptor { address: Address::new(system, group, point), name });
            }
        }
        Ok(Self { pdu_length, response, descriptors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(system: u8, group: u16, point: u32, name: &str) -> PointDescriptor {
        PointDescriptor {
            address: Address::new(
                System::new(system).unwrap(),
                Group::new(group).unwrap(),
                Point::new(point).unwrap(),
            ),
            name: name.to_string(),
        }
    }

    #[test]
    fn request_has_no_list_payload() {
        let layer = NameAdvertisementLayer::request();
        let mut buf = vec![0u8; HEADER_LEN];
        layer.encode(&mut CursorMut::new(&mut buf)).unwrap();
        let decoded = NameAdvertisementLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert!(!decoded.response);
        assert!(decoded.descriptors.is_empty());
    }

    #[test]
    fn response_roundtrips_descriptors() {
        let mut layer = NameAdvertisementLayer::response();
        layer.push(descriptor(1, 1, 1, "Fixture-1")).unwrap();
        layer.push(descriptor(1, 1, 2, "Fixture-2")).unwrap();
        let mut buf = vec![0u8; HEADER_LEN + layer.descriptors.len() * ITEM_LEN];
        layer.encode(&mut CursorMut::new(&mut buf)).unwrap();
        let decoded = NameAdvertisementLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.descriptors.len(), 2);
        assert_eq!(decoded.descriptors[0].name, "Fixture-1");
        assert_eq!(decoded.descriptors[1].address.point.get(), 2);
    }
}
