// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Module-Advertisement inner layer: a packed list of module identifiers a
//! Consumer understands (spec §4.B.5).

use crate::core::ser::{Cursor, CursorMut};
use crate::error::{CodecError, MessageError};
use crate::protocol::constants::{list_bounds, VECTOR_OTP_MODULE_ADVERTISEMENT_LIST};
use crate::protocol::layers::module::ModuleId;

const LAYER: &str = "ModuleAdvertisement";

pub const LENGTH_OFFSET: u16 = 4;
/// Fixed header size: Vector + PDULength + Reserved.
pub const HEADER_LEN: usize = 8;

/// One (ManufacturerID, ModuleNumber) pair occupies 4 octets in the list.
const ITEM_LEN: usize = 4;

#[derive(Clone, Debug, Default)]
pub struct ModuleAdvertisementLayer {
    pub pdu_length: u16,
    pub modules: Vec<ModuleId>,
}

impl ModuleAdvertisementLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_payload_len(count: usize) -> usize {
        count * ITEM_LEN
    }

    /// Append a module identifier, failing with `ListFull` if doing so would
    /// exceed the list's maximum payload (spec §4.B.5, §7).
    pub fn push(&mut self, id: ModuleId) -> Result<(), MessageError> {
        if Self::list_payload_len(self.modules.len() + 1) > list_bounds::MODULE_LIST_MAX {
            return Err(MessageError::ListFull { max: list_bounds::MODULE_LIST_MAX });
        }
        self.modules.push(id);
        Ok(())
    }

    pub fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<usize, CodecError> {
        cursor.write_u16(VECTOR_OTP_MODULE_ADVERTISEMENT_LIST)?;
        let length_at = cursor.offset();
        let payload_len = Self::list_payload_len(self.modules.len());
        let pdu_length = (HEADER_LEN + payload_len) as u16 - LENGTH_OFFSET;
        cursor.write_u16(pdu_length)?;
        cursor.write_zeros(4)?; // Reserved
        for m in &self.modules {
            cursor.write_u16(m.manufacturer_id)?;
            cursor.write_u16(m.module_number)?;
        }
        Ok(length_at)
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self, CodecError> {
        let vector = cursor.read_u16()?;
        if vector != VECTOR_OTP_MODULE_ADVERTISEMENT_LIST {
            return Err(CodecError::BadVector { layer: LAYER, vector });
        }
        let pdu_length = cursor.read_u16()?;
        cursor.skip(4)?;
        let payload_len =
            (pdu_length as usize + LENGTH_OFFSET as usize).saturating_sub(HEADER_LEN);
        if payload_len % ITEM_LEN != 0 {
            return Err(CodecError::Malformed {
                layer: LAYER,
                reason: "module list payload not a multiple of item size",
            });
        }
        let count = payload_len / ITEM_LEN;
        let mut modules = Vec::with_capacity(count);
        for _ in 0..count {
            let manufacturer_id = cursor.read_u16()?;
            let module_number = cursor.read_u16()?;
            modules.push(ModuleId::new(manufacturer_id, module_number));
        }
        Ok(Self { pdu_length, modules })
    }
}
