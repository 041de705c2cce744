// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Message assembly: stacking layers into one encoded datagram and paging a
//! Transform message's Points across multiple datagrams when they do not
//! fit in one (spec §4.C).
//!
//! Every layer's `encode()` writes a placeholder `PDULength` and returns the
//! cursor offset of that field; layers that nest other layers of
//! variable size (Root, Transform, Point, Advertisement) have that
//! placeholder patched here once their full encoded size is known. Leaf
//! layers whose payload size is known up front (Module, the three
//! advertisement list layers) compute their own `PDULength` during encode
//! and the returned offset is unused.

use crate::core::ids::{Cid, Group, Point as PointId, Priority, System};
use crate::core::ser::{Cursor, CursorMut};
use crate::core::time::{Folio, Timestamp};
use crate::error::{CodecError, MessageError};
use crate::protocol::constants::size_bounds;
use crate::protocol::layers::module::ModuleLayer;
use crate::protocol::layers::{
    advertisement, point, root, transform, AdvertisementLayer, AdvertisementVector,
    ModuleAdvertisementLayer, NameAdvertisementLayer, PointLayer, RootLayer, RootVector,
    SystemAdvertisementLayer, TransformLayer, TransformOptions,
};

/// Patch a layer's `PDULength` field now that its full encoded extent
/// (`start_of_layer..cursor.offset()`) is known.
fn patch_length(
    cursor: &mut CursorMut<'_>,
    start_of_layer: usize,
    length_at: usize,
    length_offset: u16,
) -> Result<(), CodecError> {
    let total = (cursor.offset() - start_of_layer) as u16;
    cursor.patch_u16(length_at, total - length_offset)?;
    Ok(())
}

/// One Point's full contribution to a Transform message: its identity,
/// priority and timestamp, plus the Module layers carried inside it. A
/// `PointBlock` is never split across pages (spec §4.C).
#[derive(Clone, Debug)]
pub struct PointBlock {
    pub priority: Priority,
    pub group: Group,
    pub point: PointId,
    pub timestamp: Timestamp,
    pub modules: Vec<ModuleLayer>,
}

impl PointBlock {
    pub fn new(
        priority: Priority,
        group: Group,
        point: PointId,
        timestamp: Timestamp,
        modules: Vec<ModuleLayer>,
    ) -> Self {
        Self { priority, group, point, timestamp, modules }
    }

    pub fn encoded_len(&self) -> usize {
        point::HEADER_LEN + self.modules.iter().map(ModuleLayer::encoded_len).sum::<usize>()
    }

    fn encode(&self, cursor: &mut CursorMut<'_>) -> Result<(), CodecError> {
        let start = cursor.offset();
        let layer = PointLayer::new(self.priority, self.group, self.point, self.timestamp);
        let length_at = layer.encode(cursor)?;
        for m in &self.modules {
            m.encode(cursor)?;
        }
        patch_length(cursor, start, length_at, point::LENGTH_OFFSET)
    }
}

/// A decoded Point plus its Module layers, read back out of a Transform page.
#[derive(Clone, Debug)]
pub struct DecodedPoint {
    pub priority: Priority,
    pub group: Group,
    pub point: PointId,
    pub timestamp: Timestamp,
    pub modules: Vec<ModuleLayer>,
}

/// One fully decoded Transform datagram (one Page of a Folio).
#[derive(Clone, Debug)]
pub struct DecodedTransformPage {
    pub cid: Cid,
    pub folio: Folio,
    pub page: u16,
    pub last_page: u16,
    pub component_name: String,
    pub system: System,
    pub timestamp: Timestamp,
    pub full_point_set: bool,
    pub points: Vec<DecodedPoint>,
}

/// A Producer's Transform message for one System: the points it carries,
/// before paging.
#[derive(Clone, Debug)]
pub struct TransformMessage {
    pub cid: Cid,
    pub component_name: String,
    pub system: System,
    pub timestamp: Timestamp,
    pub full_point_set: bool,
    pub points: Vec<PointBlock>,
}

impl TransformMessage {
    /// Fixed bytes preceding the first Point block in every page: the Root
    /// layer's header plus the Transform layer's header.
    const FIXED_OVERHEAD: usize = root::HEADER_LEN + transform::HEADER_LEN;

    /// Encode this message as one or more datagrams, splitting at Point
    /// boundaries so no datagram exceeds the Transform message size bound
    /// (spec §4.C, §6). All pages share `folio` and are numbered
    /// `0..=last_page`.
    pub fn encode_pages(&self, folio: Folio) -> Result<Vec<Vec<u8>>, MessageError> {
        let mut pages: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut current_size = Self::FIXED_OVERHEAD;

        for (i, block) in self.points.iter().enumerate() {
            let len = block.encoded_len();
            if Self::FIXED_OVERHEAD + len > size_bounds::TRANSFORM_MAX {
                return Err(MessageError::MessageTooBig { max: size_bounds::TRANSFORM_MAX });
            }
            if !current.is_empty() && current_size + len > size_bounds::TRANSFORM_MAX {
                pages.push(std::mem::take(&mut current));
                current_size = Self::FIXED_OVERHEAD;
            }
            current.push(i);
            current_size += len;
        }
        pages.push(current);

        let last_page = (pages.len() - 1) as u16;
        let mut datagrams = Vec::with_capacity(pages.len());
        for (page_index, indices) in pages.iter().enumerate() {
            let payload_len: usize = indices.iter().map(|&i| self.points[i].encoded_len()).sum();
            let mut buf = vec![0u8; Self::FIXED_OVERHEAD + payload_len];
            {
                let mut w = CursorMut::new(&mut buf);
                let root = RootLayer::new(
                    RootVector::Transform,
                    self.cid,
                    folio,
                    page_index as u16,
                    last_page,
                    self.component_name.clone(),
                );
                let root_length_at = root.encode(&mut w)?;
                let transform_start = w.offset();
                let transform_layer =
                    TransformLayer::new(self.system, self.timestamp, TransformOptions {
                        full_point_set: self.full_point_set,
                    });
                let transform_length_at = transform_layer.encode(&mut w)?;
                for &i in indices {
                    self.points[i].encode(&mut w)?;
                }
                patch_length(&mut w, transform_start, transform_length_at, transform::LENGTH_OFFSET)?;
                patch_length(&mut w, 0, root_length_at, root::LENGTH_OFFSET)?;
            }
            datagrams.push(buf);
        }
        Ok(datagrams)
    }
}

/// Decode a single Transform datagram (one Page).
pub fn decode_transform_page(bytes: &[u8]) -> Result<DecodedTransformPage, CodecError> {
    let mut r = Cursor::new(bytes);
    let root = RootLayer::decode(&mut r)?;
    if !matches!(root.vector, RootVector::Transform) {
        return Err(CodecError::BadVector { layer: "Root", vector: root.vector.wire() });
    }
    let transform_layer = TransformLayer::decode(&mut r)?;
    let points_len = (transform_layer.pdu_length as usize + transform::LENGTH_OFFSET as usize)
        .saturating_sub(transform::HEADER_LEN);
    let points_bytes = r.read_bytes(points_len)?;

    let mut pr = Cursor::new(points_bytes);
    let mut points = Vec::new();
    while pr.remaining() > 0 {
        let point_layer = PointLayer::decode(&mut pr)?;
        let modules_len = (point_layer.pdu_length as usize + point::LENGTH_OFFSET as usize)
            .saturating_sub(point::HEADER_LEN);
        let module_bytes = pr.read_bytes(modules_len)?;
        let modules = ModuleLayer::decode_all(&mut Cursor::new(module_bytes))?;
        points.push(DecodedPoint {
            priority: point_layer.priority,
            group: point_layer.group,
            point: point_layer.point,
            timestamp: point_layer.timestamp,
            modules,
        });
    }

    Ok(DecodedTransformPage {
        cid: root.cid,
        folio: root.folio,
        page: root.page,
        last_page: root.last_page,
        component_name: root.component_name,
        system: transform_layer.system,
        timestamp: transform_layer.timestamp,
        full_point_set: transform_layer.options.full_point_set,
        points,
    })
}

/// The advertisement-specific payload of an Advertisement message.
#[derive(Clone, Debug)]
pub enum AdvertisementPayload {
    Module(ModuleAdvertisementLayer),
    Name(NameAdvertisementLayer),
    System(SystemAdvertisementLayer),
}

/// A Module/Name/System-Advertisement message (spec §4.B.5). Unlike
/// Transform messages, every advertisement list's maximum payload already
/// fits within its message's size bound in a single datagram (the
/// `list_bounds`/`size_bounds` pairs in `constants` are chosen that way),
/// so advertisement messages are always a single page.
#[derive(Clone, Debug)]
pub struct AdvertisementMessage {
    pub cid: Cid,
    pub component_name: String,
    pub payload: AdvertisementPayload,
}

impl AdvertisementMessage {
    pub fn encode(&self, folio: Folio) -> Result<Vec<u8>, MessageError> {
        let (adv_vector, max_size) = match &self.payload {
            AdvertisementPayload::Module(_) => (AdvertisementVector::Module, size_bounds::MODULE_ADV_MAX),
            AdvertisementPayload::Name(_) => (AdvertisementVector::Name, size_bounds::NAME_ADV_MAX),
            AdvertisementPayload::System(_) => (AdvertisementVector::System, size_bounds::SYSTEM_ADV_MAX),
        };

        let mut buf = vec![0u8; max_size];
        let written = {
            let mut w = CursorMut::new(&mut buf);
            let root = RootLayer::new(
                RootVector::Advertisement,
                self.cid,
                folio,
                0,
                0,
                self.component_name.clone(),
            );
            let root_length_at = root.encode(&mut w)?;
            let adv_start = w.offset();
            let adv = AdvertisementLayer::new(adv_vector);
            let adv_length_at = adv.encode(&mut w)?;
            match &self.payload {
                AdvertisementPayload::Module(m) => {
                    m.encode(&mut w)?;
                }
                AdvertisementPayload::Name(n) => {
                    n.encode(&mut w)?;
                }
                AdvertisementPayload::System(s) => {
                    s.encode(&mut w)?;
                }
            }
            patch_length(&mut w, adv_start, adv_length_at, advertisement::LENGTH_OFFSET)?;
            patch_length(&mut w, 0, root_length_at, root::LENGTH_OFFSET)?;
            w.offset()
        };
        buf.truncate(written);
        Ok(buf)
    }
}

/// A decoded Advertisement message's inner payload.
#[derive(Clone, Debug)]
pub enum DecodedAdvertisement {
    Module(ModuleAdvertisementLayer),
    Name(NameAdvertisementLayer),
    System(SystemAdvertisementLayer),
}

#[derive(Clone, Debug)]
pub struct DecodedAdvertisementMessage {
    pub cid: Cid,
    pub folio: Folio,
    pub component_name: String,
    pub payload: DecodedAdvertisement,
}

pub fn decode_advertisement(bytes: &[u8]) -> Result<DecodedAdvertisementMessage, CodecError> {
    let mut r = Cursor::new(bytes);
    let root = RootLayer::decode(&mut r)?;
    if !matches!(root.vector, RootVector::Advertisement) {
        return Err(CodecError::BadVector { layer: "Root", vector: root.vector.wire() });
    }
    let adv = AdvertisementLayer::decode(&mut r)?;
    let payload = match adv.vector {
        AdvertisementVector::Module => {
            DecodedAdvertisement::Module(ModuleAdvertisementLayer::decode(&mut r)?)
        }
        AdvertisementVector::Name => {
            DecodedAdvertisement::Name(NameAdvertisementLayer::decode(&mut r)?)
        }
        AdvertisementVector::System => {
            DecodedAdvertisement::System(SystemAdvertisementLayer::decode(&mut r)?)
        }
        AdvertisementVector::Unknown(v) => {
            return Err(CodecError::BadVector { layer: "Advertisement", vector: v })
        }
    };
    Ok(DecodedAdvertisementMessage {
        cid: root.cid,
        folio: root.folio,
        component_name: root.component_name,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::{Group, Point, Priority, System};
    use crate::protocol::layers::module::ModuleId;
    use crate::protocol::modules::Position;

    fn sample_point(point: u32) -> PointBlock {
        let position = Position::from_millimetres(1, 2, 3);
        let module = ModuleLayer::new(Position::module_id(), position.encode());
        PointBlock::new(
            Priority::default(),
            Group::new(1).unwrap(),
            Point::new(point).unwrap(),
            Timestamp::from_micros(1000),
            vec![module],
        )
    }

    fn sample_message(points: Vec<PointBlock>) -> TransformMessage {
        TransformMessage {
            cid: Cid::from_bytes([7; 16]),
            component_name: "Fixture-Producer".to_string(),
            system: System::new(1).unwrap(),
            timestamp: Timestamp::from_micros(123),
            full_point_set: true,
            points,
        }
    }

    #[test]
    fn single_page_roundtrip() {
        let message = sample_message(vec![sample_point(1), sample_point(2)]);
        let pages = message.encode_pages(Folio::new(5)).unwrap();
        assert_eq!(pages.len(), 1);
        let decoded = decode_transform_page(&pages[0]).unwrap();
        assert_eq!(decoded.folio, Folio::new(5));
        assert_eq!(decoded.page, 0);
        assert_eq!(decoded.last_page, 0);
        assert_eq!(decoded.points.len(), 2);
        assert_eq!(decoded.points[0].point.get(), 1);
        assert_eq!(decoded.points[1].point.get(), 2);
        assert!(decoded.full_point_set);
    }

    #[test]
    fn splits_into_multiple_pages_when_too_large() {
        // Each point with a Position module is well under 100 bytes; force
        // enough of them that the total exceeds TRANSFORM_MAX.
        let count = size_bounds::TRANSFORM_MAX / 20 + 5;
        let points = (1..=count as u32).map(sample_point).collect();
        let message = sample_message(points);
        let pages = message.encode_pages(Folio::new(1)).unwrap();
        assert!(pages.len() > 1);

        let mut seen_points = 0;
        for (i, page) in pages.iter().enumerate() {
            assert!(page.len() <= size_bounds::TRANSFORM_MAX);
            let decoded = decode_transform_page(page).unwrap();
            assert_eq!(decoded.page, i as u16);
            assert_eq!(decoded.last_page as usize, pages.len() - 1);
            seen_points += decoded.points.len();
        }
        assert_eq!(seen_points, count);
    }

    #[test]
    fn rejects_point_too_large_for_any_page() {
        let huge_modules = vec![ModuleLayer::new(ModuleId::new(0, 1), vec![0u8; size_bounds::TRANSFORM_MAX])];
        let block = PointBlock::new(
            Priority::default(),
            Group::new(1).unwrap(),
            Point::new(1).unwrap(),
            Timestamp::from_micros(0),
            huge_modules,
        );
        let message = sample_message(vec![block]);
        assert!(matches!(
            message.encode_pages(Folio::new(0)),
            Err(MessageError::MessageTooBig { .. })
        ));
    }

    #[test]
    fn advertisement_roundtrip_for_each_payload() {
        let cid = Cid::from_bytes([3; 16]);

        let mut module_adv = ModuleAdvertisementLayer::new();
        module_adv.push(Position::module_id()).unwrap();
        let message = AdvertisementMessage {
            cid,
            component_name: "Fixture-Consumer".to_string(),
            payload: AdvertisementPayload::Module(module_adv),
        };
        let bytes = message.encode(Folio::new(9)).unwrap();
        let decoded = decode_advertisement(&bytes).unwrap();
        assert_eq!(decoded.cid, cid);
        assert_eq!(decoded.folio, Folio::new(9));
        assert!(matches!(decoded.payload, DecodedAdvertisement::Module(_)));

        let system_message = AdvertisementMessage {
            cid,
            component_name: "Fixture-Consumer".to_string(),
            payload: AdvertisementPayload::System(SystemAdvertisementLayer::request()),
        };
        let bytes = system_message.encode(Folio::new(0)).unwrap();
        let decoded = decode_advertisement(&bytes).unwrap();
        match decoded.payload {
            DecodedAdvertisement::System(layer) => assert!(!layer.response),
            _ => panic!("expected System payload"),
        }
    }
}
