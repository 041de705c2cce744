// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end pipeline: encode a multi-page Transform message, reassemble
//! its pages out of order, decode each completed folio, merge into a
//! registry shared with a running priority merger, and read back the
//! winning contributor's module state (spec §8, scenarios 4 and 5 combined
//! across a folio boundary).

use std::time::{Duration, Instant};

use otp::core::ids::{Address, Cid, Group, Name, Point as PointId, Priority, System};
use otp::core::time::{Folio, Timestamp};
use otp::folio::{FolioReassembler, FolioScope};
use otp::merger::Merger;
use otp::protocol::layers::module::ModuleLayer;
use otp::protocol::message::{decode_transform_page, PointBlock, TransformMessage};
use otp::protocol::modules::Position;
use otp::registry::{ComponentKind, Registry};

fn point_block(point: u32, millimetres: (i32, i32, i32)) -> PointBlock {
    let position = Position::from_millimetres(millimetres.0, millimetres.1, millimetres.2);
    let module = ModuleLayer::new(Position::module_id(), position.encode());
    PointBlock::new(
        Priority::default(),
        Group::new(1).unwrap(),
        PointId::new(point).unwrap(),
        Timestamp::from_micros(42),
        vec![module],
    )
}

#[test]
fn out_of_order_pages_merge_into_the_winning_snapshot() {
    let cid = Cid::new_v4();
    let system = System::new(7).unwrap();

    // Enough points that encode_pages is forced to split across pages.
    use otp::protocol::constants::size_bounds;
    let count = size_bounds::TRANSFORM_MAX / 20 + 5;
    let points: Vec<PointBlock> =
        (1..=count as u32).map(|i| point_block(i, (i as i32, 0, 0))).collect();

    let message = TransformMessage {
        cid,
        component_name: "Fixture-Producer".to_string(),
        system,
        timestamp: Timestamp::from_micros(42),
        full_point_set: true,
        points,
    };
    let folio = Folio::new(10);
    let pages = message.encode_pages(folio).unwrap();
    assert!(pages.len() > 1, "fixture should force a multi-page folio");

    let (registry, _events, dirty) = Registry::new();
    let merger = Merger::spawn(registry.clone(), dirty);
    registry.upsert_component(cid, Name::new("Fixture-Producer"), None, ComponentKind::Producer, Instant::now());

    let reassembler = FolioReassembler::new();
    let scope = FolioScope::Transform(system);
    let now = Instant::now();

    // Feed pages in reverse order: nothing should merge until the last one
    // (page 0) arrives and completes the folio.
    let last_page = (pages.len() - 1) as u16;
    let mut completed = None;
    for (page_number, page) in pages.iter().enumerate().rev() {
        let outcome =
            reassembler.accept(cid, scope, folio, page_number as u16, last_page, page.clone(), now);
        match outcome {
            otp::folio::Outcome::Complete(datagrams) => completed = Some(datagrams),
            otp::folio::Outcome::Pending => {}
            otp::folio::Outcome::Discarded => panic!("unexpected discard while reassembling"),
        }
    }
    let datagrams = completed.expect("folio should complete once every page arrived");
    assert_eq!(datagrams.len(), pages.len());

    for datagram in &datagrams {
        let decoded = decode_transform_page(datagram).unwrap();
        for point in decoded.points {
            let address = Address::new(decoded.system, point.group, point.point);
            let modules = point.modules.into_iter().map(|m| (m.id, m.additional)).collect();
            registry.upsert_point(cid, address, point.priority, point.timestamp, modules, Instant::now());
        }
    }

    // Give the background merger a chance to observe the dirty signals.
    let deadline = Instant::now() + Duration::from_secs(2);
    let last_address =
        Address::new(system, Group::new(1).unwrap(), PointId::new(count as u32).unwrap());
    while Instant::now() < deadline && registry.winning_component(last_address).is_none() {
        std::thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(registry.winning_component(last_address), Some(cid));
    let snapshot = registry.read_point(last_address).expect("winning point has a snapshot");
    assert_eq!(snapshot.cid, cid);
    let module = snapshot.modules.get(&Position::module_id()).expect("Position module present");
    let decoded_position = Position::decode(&module.additional).unwrap();
    assert_eq!((decoded_position.x, decoded_position.y, decoded_position.z), (count as i32, 0, 0));

    drop(merger);
}
