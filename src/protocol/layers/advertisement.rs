// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Advertisement layer: a two-field wrapper selecting Module/Name/System
//! advertisement payloads (spec §4.B.5).

use crate::core::ser::{Cursor, CursorMut};
use crate::error::CodecError;
use crate::protocol::constants::{
    VECTOR_OTP_ADVERTISEMENT_MODULE, VECTOR_OTP_ADVERTISEMENT_NAME, VECTOR_OTP_ADVERTISEMENT_SYSTEM,
};

const LAYER: &str = "Advertisement";

/// `LengthOffset`: PDULength excludes Vector + PDULength fields.
pub const LENGTH_OFFSET: u16 = 4;
pub const HEADER_LEN: usize = 4;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AdvertisementVector {
    Module,
    Name,
    System,
    Unknown(u16),
}

impl AdvertisementVector {
    pub fn wire(self) -> u16 {
        match self {
            AdvertisementVector::Module => VECTOR_OTP_ADVERTISEMENT_MODULE,
            AdvertisementVector::Name => VECTOR_OTP_ADVERTISEMENT_NAME,
            AdvertisementVector::System => VECTOR_OTP_ADVERTISEMENT_SYSTEM,
            AdvertisementVector::Unknown(v) => v,
        }
    }

    pub fn from_wire(v: u16) -> Self {
        match v {
            VECTOR_OTP_ADVERTISEMENT_MODULE => AdvertisementVector::Module,
            VECTOR_OTP_ADVERTISEMENT_NAME => AdvertisementVector::Name,
            VECTOR_OTP_ADVERTISEMENT_SYSTEM => AdvertisementVector::System,
            other => AdvertisementVector::Unknown(other),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct AdvertisementLayer {
    pub pdu_length: u16,
    pub vector: AdvertisementVector,
}

impl AdvertisementLayer {
    pub fn new(vector: AdvertisementVector) -> Self {
        Self { pdu_length: 0, vector }
    }

    pub fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<usize, CodecError> {
        cursor.write_u16(self.vector.wire())?;
        let length_at = cursor.offset();
        cursor.write_u16(self.pdu_length)?;
        Ok(length_at)
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let vector = AdvertisementVector::from_wire(cursor.read_u16()?);
        if matches!(vector, AdvertisementVector::Unknown(_)) {
            return Err(CodecError::BadVector { layer: LAYER, vector: vector.wire() });
        }
        let pdu_length = cursor.read_u16()?;
        Ok(Self { pdu_length, vector })
    }
}

/// Request/Response bit shared by Name-Adv and System-Adv inner layers.
pub const RESPONSE_BIT: u8 = 0b1000_0000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let layer = AdvertisementLayer::new(AdvertisementVector::Name);
        let mut buf = [0u8; HEADER_LEN];
        layer.encode(&mut CursorMut::new(&mut buf)).unwrap();
        let decoded = AdvertisementLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.vector, AdvertisementVector::Name);
    }
}
