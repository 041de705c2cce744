// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Module layer: a typed payload (position, rotation, ...) attached to a
//! Point (spec §4.B.4).
//!
//! Decoding requires peeking `PDULength` before consuming the Additional
//! field, since Modules are concatenated back-to-back inside a Point with no
//! outer count - the only way to find the next Module's start is this
//! layer's own length.

use crate::core::ser::{Cursor, CursorMut};
use crate::error::CodecError;

const LAYER: &str = "Module";

/// `LengthOffset`: PDULength excludes ManufacturerID + PDULength fields.
pub const LENGTH_OFFSET: u16 = 4;

/// (ManufacturerID, ModuleNumber) - a module's wire identity.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ModuleId {
    pub manufacturer_id: u16,
    pub module_number: u16,
}

impl ModuleId {
    pub fn new(manufacturer_id: u16, module_number: u16) -> Self {
        Self { manufacturer_id, module_number }
    }

    pub fn is_esta_standard(self) -> bool {
        self.manufacturer_id == crate::protocol::constants::MANUFACTURER_ESTA
    }
}

/// A single decoded (but not semantically interpreted) Module layer.
///
/// `additional` holds the module-specific payload verbatim so that unknown
/// modules pass through byte-for-byte (spec §7, `UnknownModule`).
#[derive(Clone, Debug)]
pub struct ModuleLayer {
    pub id: ModuleId,
    pub additional: Vec<u8>,
}

impl ModuleLayer {
    pub fn new(id: ModuleId, additional: Vec<u8>) -> Self {
        Self { id, additional }
    }

    pub fn encoded_len(&self) -> usize {
        4 + self.additional.len()
    }

    pub fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<(), CodecError> {
        cursor.write_u16(self.id.manufacturer_id)?;
        let pdu_length = LENGTH_OFFSET + self.additional.len() as u16;
        cursor.write_u16(pdu_length)?;
        cursor.write_u16(self.id.module_number)?;
        cursor.write_bytes(&self.additional)?;
        Ok(())
    }

    /// Decode one Module layer, leaving the cursor positioned at the start
    /// of the next Module (if any).
    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let manufacturer_id = cursor.read_u16()?;
        let pdu_length = cursor.read_u16()?;
        if pdu_length < LENGTH_OFFSET {
            return Err(CodecError::Malformed {
                layer: LAYER,
                reason: "PDULength smaller than header",
            });
        }
        let module_number = cursor.read_u16()?;
        let additional_len = (pdu_length - LENGTH_OFFSET) as usize;
        let additional = cursor.read_bytes(additional_len)?.to_vec();
        Ok(Self { id: ModuleId::new(manufacturer_id, module_number), additional })
    }

    /// Decode every Module layer remaining in `cursor` until it is exhausted.
    ///
    /// Producers must never emit two modules with the same
    /// `(ManufacturerID, ModuleNumber)` in one Point (spec §4.B.4); this
    /// decoder does not enforce that on the receive side (a malformed
    /// Producer's duplicate simply overwrites at the call site), matching
    /// the "decoded structurally, not interpreted" policy for unrecognized
    /// content in general.
    pub fn decode_all(cursor: &mut Cursor<'_>) -> Result<Vec<Self>, CodecError> {
        let mut modules = Vec::new();
        while cursor.remaining() > 0 {
            modules.push(Self::decode(cursor)?);
        }
        Ok(modules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_single_module() {
        let m = ModuleLayer::new(ModuleId::new(0, 1), vec![1, 2, 3, 4]);
        let mut buf = vec![0u8; m.encoded_len()];
        m.encode(&mut CursorMut::new(&mut buf)).unwrap();
        let decoded = ModuleLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.id, m.id);
        assert_eq!(decoded.additional, m.additional);
    }

    #[test]
    fn decode_all_splits_consecutive_modules_by_their_own_length() {
        let a = ModuleLayer::new(ModuleId::new(0, 1), vec![0xAA; 13]);
        let b = ModuleLayer::new(ModuleId::new(0, 3), vec![0xBB; 12]);
        let mut buf = vec![0u8; a.encoded_len() + b.encoded_len()];
        {
            let mut w = CursorMut::new(&mut buf);
            a.encode(&mut w).unwrap();
            b.encode(&mut w).unwrap();
        }
        let decoded = ModuleLayer::decode_all(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].id, a.id);
        assert_eq!(decoded[1].id, b.id);
        assert_eq!(decoded[1].additional, b.additional);
    }

    #[test]
    fn unknown_module_preserved_by_identifier() {
        let unknown = ModuleLayer::new(ModuleId::new(0x1234, 0x5678), vec![9, 9, 9]);
        let mut buf = vec![0u8; unknown.encoded_len()];
        unknown.encode(&mut CursorMut::new(&mut buf)).unwrap();
        let decoded = ModuleLayer::decode(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.id, unknown.id);
        assert_eq!(decoded.additional, vec![9, 9, 9]);
    }
}
