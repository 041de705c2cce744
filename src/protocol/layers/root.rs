// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root (OTP) layer: the outer PDU carried by every datagram (spec §4.B.1).

use crate::core::ids::Cid;
use crate::core::ser::{Cursor, CursorMut};
use crate::core::time::Folio;
use crate::error::CodecError;
use crate::protocol::constants::{
    PREAMBLE, VECTOR_OTP_ADVERTISEMENT_MESSAGE, VECTOR_OTP_TRANSFORM_MESSAGE,
};

const LAYER: &str = "Root";

/// The Root layer's `Vector` field: selects Transform vs Advertisement.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RootVector {
    Transform,
    Advertisement,
    /// Preserved verbatim for forward compatibility; never produced by this
    /// crate's encoder, but a decode must not fail on it structurally until
    /// validated against the expected set at the call site.
    Unknown(u16),
}

impl RootVector {
    pub fn wire(self) -> u16 {
        match self {
            RootVector::Transform => VECTOR_OTP_TRANSFORM_MESSAGE,
            RootVector::Advertisement => VECTOR_OTP_ADVERTISEMENT_MESSAGE,
            RootVector::Unknown(v) => v,
        }
    }

    pub fn from_wire(v: u16) -> Self {
        match v {
            VECTOR_OTP_TRANSFORM_MESSAGE => RootVector::Transform,
            VECTOR_OTP_ADVERTISEMENT_MESSAGE => RootVector::Advertisement,
            other => RootVector::Unknown(other),
        }
    }
}

/// `LengthOffset`: PDULength excludes the first 16 octets (preamble + vector + length field).
pub const LENGTH_OFFSET: u16 = 16;

/// Fixed header size, preamble through ComponentName (spec §4.B.1).
pub const HEADER_LEN: usize = 79;

#[derive(Clone, Debug)]
pub struct RootLayer {
    pub vector: RootVector,
    pub pdu_length: u16,
    pub cid: Cid,
    pub folio: Folio,
    pub page: u16,
    pub last_page: u16,
    pub component_name: String,
}

impl RootLayer {
    pub fn new(
        vector: RootVector,
        cid: Cid,
        folio: Folio,
        page: u16,
        last_page: u16,
        component_name: impl Into<String>,
    ) -> Self {
        Self {
            vector,
            pdu_length: 0,
            cid,
            folio,
            page,
            last_page,
            component_name: component_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        match self.vector {
            RootVector::Unknown(v) => {
                return Err(CodecError::BadVector { layer: LAYER, vector: v })
            }
            _ => {}
        }
        if self.cid.is_zero() {
            return Err(CodecError::Malformed { layer: LAYER, reason: "CID must be nonzero" });
        }
        if self.page > self.last_page {
            return Err(CodecError::Malformed { layer: LAYER, reason: "Page exceeds LastPage" });
        }
        Ok(())
    }

    /// Encode the fixed header (preamble through ComponentName) to `cursor`,
    /// leaving the PDULength field to be patched once the full message size
    /// is known (see `protocol::message`).
    pub fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<usize, CodecError> {
        self.validate()?;
        cursor.write_bytes(&PREAMBLE)?;
        cursor.write_u16(self.vector.wire())?;
        let length_at = cursor.offset();
        cursor.write_u16(self.pdu_length)?;
        cursor.write_u8(0)?; // FooterOptions, reserved
        cursor.write_u8(0)?; // FooterLength, reserved
        cursor.write_uuid(&self.cid.as_bytes())?;
        cursor.write_u32(self.folio.0)?;
        cursor.write_u16(self.page)?;
        cursor.write_u16(self.last_page)?;
        cursor.write_u8(0)?; // Options, reserved
        cursor.write_zeros(4)?; // Reserved
        cursor.write_name(&self.component_name, 32)?;
        Ok(length_at)
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let preamble = cursor.read_bytes(12)?;
        if preamble != PREAMBLE {
            return Err(CodecError::BadPreamble);
        }
        let vector = RootVector::from_wire(cursor.read_u16()?);
        let pdu_length = cursor.read_u16()?;
        let _footer_options = cursor.read_u8()?;
        let _footer_length = cursor.read_u8()?;
        let cid = Cid::from_bytes(cursor.read_uuid()?);
        let folio = Folio(cursor.read_u32()?);
        let page = cursor.read_u16()?;
        let last_page = cursor.read_u16()?;
        let _options = cursor.read_u8()?;
        cursor.skip(4)?;
        let component_name = cursor.read_name(32)?;

        let layer = RootLayer {
            vector,
            pdu_length,
            cid,
            folio,
            page,
            last_page,
            component_name,
        };
        layer.validate()?;
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RootLayer {
        RootLayer::new(
            RootVector::Transform,
            Cid::from_bytes([1; 16]),
            Folio(326),
            0,
            0,
            "Automation-Server-Primary",
        )
    }

    #[test]
    fn roundtrip() {
        let layer = sample();
        let mut buf = [0u8; HEADER_LEN];
        {
            let mut w = CursorMut::new(&mut buf);
            layer.encode(&mut w).unwrap();
        }
        let decoded = RootLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.cid, layer.cid);
        assert_eq!(decoded.folio, layer.folio);
        assert_eq!(decoded.component_name, layer.component_name);
    }

    #[test]
    fn rejects_bad_preamble() {
        let mut buf = [0u8; HEADER_LEN];
        let layer = sample();
        {
            let mut w = CursorMut::new(&mut buf);
            layer.encode(&mut w).unwrap();
        }
        buf[0] = 0xFF;
        assert!(matches!(
            RootLayer::decode(&mut Cursor::new(&buf)),
            Err(CodecError::BadPreamble)
        ));
    }

    #[test]
    fn rejects_page_exceeding_last_page() {
        let mut layer = sample();
        layer.page = 2;
        layer.last_page = 1;
        assert!(layer.validate().is_err());
    }

    #[test]
    fn rejects_zero_cid() {
        let mut layer = sample();
        layer.cid = Cid::zero();
        assert!(layer.validate().is_err());
    }
}
