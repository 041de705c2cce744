// SPDX-License-Identifier: Apache-2.0 OR MIT

//! System-Advertisement inner layer: Request, or Response carrying the list
//! of Systems the sender supports (spec §4.B.5).

use crate::core::ids::System;
use crate::core::ser::{Cursor, CursorMut};
use crate::error::{CodecError, MessageError};
use crate::protocol::constants::{list_bounds, VECTOR_OTP_SYSTEM_ADVERTISEMENT_LIST};
use crate::protocol::layers::advertisement::RESPONSE_BIT;

const LAYER: &str = "SystemAdvertisement";

pub const LENGTH_OFFSET: u16 = 4;
pub const HEADER_LEN: usize = 6;

/// Each System number occupies 1 octet in the list.
const ITEM_LEN: usize = 1;

#[derive(Clone, Debug, Default)]
pub struct SystemAdvertisementLayer {
    pub pdu_length: u16,
    pub response: bool,
    pub systems: Vec<System>,
}

impl SystemAdvertisementLayer {
    pub fn request() -> Self {
        Self { pdu_length: 0, response: false, systems: Vec::new() }
    }

    pub fn response() -> Self {
        Self { pdu_length: 0, response: true, systems: Vec::new() }
    }

    pub fn push(&mut self, system: System) -> Result<(), MessageError> {
        if (self.systems.len() + 1) * ITEM_LEN > list_bounds::SYSTEM_LIST_MAX {
            return Err(MessageError::ListFull { max: list_bounds::SYSTEM_LIST_MAX });
        }
        self.systems.push(system);
        Ok(())
    }

    pub fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<usize, CodecError> {
        cursor.write_u16(VECTOR_OTP_SYSTEM_ADVERTISEMENT_LIST)?;
        let length_at = cursor.offset();
        let payload_len = if self.response { self.systems.len() * ITEM_LEN } else { 0 };
        let pdu_length = (HEADER_LEN + payload_len) as u16 - LENGTH_OFFSET;
        cursor.write_u16(pdu_length)?;
        cursor.write_u8(if self.response { RESPONSE_BIT } else { 0 })?;
        cursor.write_u8(0)?; // Reserved
        if self.response {
            for s in &self.systems {
                cursor.write_u8(s.get())?;
            }
        }
        Ok(length_at)
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let vector = cursor.read_u16()?;
        if vector != VECTOR_OTP_SYSTEM_ADVERTISEMENT_LIST {
            return Err(CodecError::BadVector { layer: LAYER, vector });
        }
        let pdu_length = cursor.read_u16()?;
        let options = cursor.read_u8()?;
        let response = options & RESPONSE_BIT != 0;
        cursor.skip(1)?;

        let mut systems = Vec::new();
        if response {
            let payload_len =
                (pdu_length as usize + LENGTH_OFFSET as usize).saturating_sub(HEADER_LEN);
            for _ in 0..payload_len {
                let system = System::new(cursor.read_u8()?)
                    .map_err(|_| CodecError::FieldOutOfRange { layer: LAYER, field: "System" })?;
                systems.push(system);
            }
        }
        Ok(Self { pdu_length, response, systems })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrip() {
        let layer = SystemAdvertisementLayer::request();
        let mut buf = vec![0u8; HEADER_LEN];
        layer.encode(&mut CursorMut::new(&mut buf)).unwrap();
        let decoded = SystemAdvertisementLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert!(!decoded.response);
        assert!(decoded.systems.is_empty());
    }

    #[test]
    fn response_roundtrip_with_systems() {
        let mut layer = SystemAdvertisementLayer::response();
        layer.push(System::new(1).unwrap()).unwrap();
        layer.push(System::new(200).unwrap()).unwrap();
        let mut buf = vec![0u8; HEADER_LEN + layer.systems.len()];
        layer.encode(&mut CursorMut::new(&mut buf)).unwrap();
        let decoded = SystemAdvertisementLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.systems.iter().map(|s| s.get()).collect::<Vec<_>>(), vec![1, 200]);
    }
}
