// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Consumer role: joins every System's Transform multicast group it cares
//! about, feeds incoming datagrams through folio reassembly into the
//! component registry, periodically asks Producers for their Name/System
//! lists, and announces the modules it understands (spec §4.G).
//!
//! Like [`crate::producer::Producer`], this is a dedicated-thread worker
//! grounded in the teacher's `discovery/cloud/poller_thread.rs` idiom rather
//! than an async task, since its only blocking points are socket reads and
//! plain sleeps.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::{AddressFamily, ConsumerConfig};
use crate::core::ids::{Address, Cid, Name, System};
use crate::core::time::Folio;
use crate::folio::{FolioReassembler, FolioScope};
use crate::protocol::constants::{
    ADVERTISEMENT_MULTICAST_V4, ADVERTISEMENT_MULTICAST_V6, ADVERTISEMENT_STARTUP_WAIT,
    ADVERTISEMENT_TIMING, OTP_PORT,
};
use crate::protocol::layers::ModuleAdvertisementLayer;
use crate::protocol::message::{
    decode_advertisement, decode_transform_page, AdvertisementMessage, AdvertisementPayload,
    DecodedAdvertisement,
};
use crate::protocol::modules::{Position, PositionVelAcc, ReferenceFrame, Rotation, RotationVelAcc, Scale};
use crate::registry::{ComponentKind, Registry};
use crate::transport::SocketAdapter;

/// The module ids this crate's standard module helpers understand,
/// advertised in every Module-Advertisement this Consumer sends (spec
/// §4.B.4).
fn understood_modules() -> Vec<crate::protocol::layers::ModuleId> {
    vec![
        Position::module_id(),
        PositionVelAcc::module_id(),
        Rotation::module_id(),
        RotationVelAcc::module_id(),
        Scale::module_id(),
        ReferenceFrame::module_id(),
    ]
}

struct ConsumerState {
    systems: HashSet<u8>,
    module_adv_folio: Folio,
    name_adv_folio: Folio,
    system_adv_folio: Folio,
}

impl Default for ConsumerState {
    fn default() -> Self {
        Self {
            systems: HashSet::new(),
            module_adv_folio: Folio::new(0),
            name_adv_folio: Folio::new(0),
            system_adv_folio: Folio::new(0),
        }
    }
}

/// A single OTP Consumer: joins Transform groups for the Systems it cares
/// about, merges received pose data into a [`Registry`], and drives the
/// request/response advertisement exchange.
pub struct Consumer {
    config: ConsumerConfig,
    socket: Arc<Mutex<Box<dyn SocketAdapter>>>,
    state: Arc<Mutex<ConsumerState>>,
    registry: Registry,
    reassembler: FolioReassembler,
    boot: Instant,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Consumer {
    /// Bind `socket`, join the advertisement multicast group, and start the
    /// receive and periodic-advertisement threads. `registry` is typically
    /// shared with a [`crate::merger::Merger`] spawned against the same
    /// `dirty`/`events` receivers returned by [`Registry::new`].
    pub fn new(
        config: ConsumerConfig,
        mut socket: impl SocketAdapter + 'static,
        registry: Registry,
    ) -> io::Result<Self> {
        socket.bind(config.interface.as_deref(), config.bind_address)?;
        let adv_group = match config.address_family {
            AddressFamily::V4 => IpAddr::V4(ADVERTISEMENT_MULTICAST_V4),
            AddressFamily::V6 => IpAddr::V6(ADVERTISEMENT_MULTICAST_V6),
        };
        socket.join_multicast(adv_group)?;

        let socket: Arc<Mutex<Box<dyn SocketAdapter>>> = Arc::new(Mutex::new(Box::new(socket)));
        let state = Arc::new(Mutex::new(ConsumerState::default()));
        let reassembler = FolioReassembler::new();
        let running = Arc::new(AtomicBool::new(true));
        let boot = Instant::now();

        let mut threads = Vec::new();
        threads.push(Self::spawn_receive_thread(
            Arc::clone(&socket),
            registry.clone(),
            reassembler.clone(),
            Arc::clone(&running),
        ));
        threads.push(Self::spawn_advertisement_thread(
            config.clone(),
            Arc::clone(&socket),
            Arc::clone(&state),
            Arc::clone(&running),
            boot,
        ));

        Ok(Self { config, socket, state, registry, reassembler, boot, running, threads })
    }

    pub fn local_cid(&self) -> Cid {
        self.config.local_cid
    }

    pub fn local_name(&self) -> &crate::core::ids::Name {
        &self.config.local_name
    }

    pub fn uptime(&self) -> Duration {
        self.boot.elapsed()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.lock().local_addr()
    }

    /// A handle onto the registry this Consumer feeds. Clone and subscribe
    /// to its change-event receiver to observe merged updates.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start tracking `system`: joins its Transform multicast group so
    /// Producer datagrams for it are delivered locally (spec §4.H — unlike a
    /// Producer, a Consumer MUST join to receive grouped traffic).
    pub fn add_system(&self, system: System) -> io::Result<()> {
        {
            let mut st = self.state.lock();
            if !st.systems.insert(system.get()) {
                return Ok(());
            }
        }
        let group = match self.config.address_family {
            AddressFamily::V4 => IpAddr::V4(crate::protocol::constants::transform_multicast_v4(system.get())),
            AddressFamily::V6 => IpAddr::V6(crate::protocol::constants::transform_multicast_v6(system.get())),
        };
        self.socket.lock().join_multicast(group)
    }

    pub fn remove_system(&self, system: System) -> io::Result<()> {
        {
            let mut st = self.state.lock();
            if !st.systems.remove(&system.get()) {
                return Ok(());
            }
        }
        let group = match self.config.address_family {
            AddressFamily::V4 => IpAddr::V4(crate::protocol::constants::transform_multicast_v4(system.get())),
            AddressFamily::V6 => IpAddr::V6(crate::protocol::constants::transform_multicast_v6(system.get())),
        };
        self.socket.lock().leave_multicast(group)
    }

    /// Read the current merged pose for one Point, following the
    /// registry's winning contributor (spec §6).
    pub fn read_point(&self, address: Address) -> Option<crate::registry::PointSnapshot> {
        self.registry.read_point(address)
    }

    fn spawn_receive_thread(
        socket: Arc<Mutex<Box<dyn SocketAdapter>>>,
        registry: Registry,
        reassembler: FolioReassembler,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        thread::Builder::new()
            .name("otp-consumer-receive".to_string())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    let datagram = { socket.lock().recv() };
                    let datagram = match datagram {
                        Ok(d) => d,
                        Err(_) => continue,
                    };
                    Self::handle_datagram(&registry, &reassembler, &datagram.bytes, datagram.arrived_at);
                }
            })
            .expect("failed to spawn consumer receive thread")
    }

    fn handle_datagram(
        registry: &Registry,
        reassembler: &FolioReassembler,
        bytes: &[u8],
        arrived_at: Instant,
    ) {
        // A Transform page and an Advertisement message both begin with the
        // Root layer; try Transform first since it is the high-frequency
        // path, falling back to Advertisement on vector mismatch.
        if let Ok(page) = decode_transform_page(bytes) {
            let scope = FolioScope::Transform(page.system);
            let outcome = reassembler.accept(
                page.cid,
                scope,
                page.folio,
                page.page,
                page.last_page,
                bytes.to_vec(),
                arrived_at,
            );
            if let crate::folio::Outcome::Complete(pages) = outcome {
                Self::merge_transform_pages(registry, &pages, arrived_at);
            }
            return;
        }

        if let Ok(decoded) = decode_advertisement(bytes) {
            Self::merge_advertisement(registry, decoded, arrived_at);
        }
    }

    fn merge_transform_pages(registry: &Registry, pages: &[Vec<u8>], now: Instant) {
        for raw in pages {
            let Ok(page) = decode_transform_page(raw) else { continue };
            registry.upsert_component(page.cid, Name::new(page.component_name.clone()), None, ComponentKind::Producer, now);
            for point in page.points {
                let address = Address::new(page.system, point.group, point.point);
                let modules = point
                    .modules
                    .into_iter()
                    .map(|m| (m.id, m.additional))
                    .collect();
                registry.upsert_point(page.cid, address, point.priority, point.timestamp, modules, now);
            }
        }
    }

    fn merge_advertisement(registry: &Registry, decoded: crate::protocol::message::DecodedAdvertisementMessage, now: Instant) {
        match decoded.payload {
            DecodedAdvertisement::Name(layer) if layer.response => {
                registry.upsert_component(
                    decoded.cid,
                    Name::new(decoded.component_name.clone()),
                    None,
                    ComponentKind::Producer,
                    now,
                );
                for descriptor in layer.descriptors {
                    registry.upsert_point_name(decoded.cid, descriptor.address, Name::new(descriptor.name), now);
                }
            }
            DecodedAdvertisement::System(layer) if layer.response => {
                registry.upsert_component(
                    decoded.cid,
                    Name::new(decoded.component_name.clone()),
                    None,
                    ComponentKind::Producer,
                    now,
                );
                registry.set_systems(decoded.cid, layer.systems, now);
            }
            DecodedAdvertisement::Module(layer) => {
                registry.upsert_component(
                    decoded.cid,
                    Name::new(decoded.component_name.clone()),
                    None,
                    ComponentKind::Unknown,
                    now,
                );
                for module in layer.modules {
                    registry.record_module_interest(decoded.cid, module, now);
                }
            }
            // Requests (Name/System with `response == false`) are a
            // Producer's concern, not a Consumer's; a Consumer only emits
            // them and ignores any it overhears from a peer.
            _ => {}
        }
    }

    fn spawn_advertisement_thread(
        config: ConsumerConfig,
        socket: Arc<Mutex<Box<dyn SocketAdapter>>>,
        state: Arc<Mutex<ConsumerState>>,
        running: Arc<AtomicBool>,
        boot: Instant,
    ) -> JoinHandle<()> {
        thread::Builder::new()
            .name("otp-consumer-advertise".to_string())
            .spawn(move || {
                // A Consumer MUST NOT act on Producer output until the
                // startup wait has elapsed, but it announces itself and
                // requests Name/System lists immediately so Producers have
                // time to answer before that wait is up (spec §4.H/§4.G).
                Self::update_otp_map(&config, &socket, &state);
                let mut last_tick = Instant::now();
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(50));
                    if last_tick.elapsed() < ADVERTISEMENT_TIMING {
                        continue;
                    }
                    last_tick = Instant::now();
                    if boot.elapsed() < ADVERTISEMENT_STARTUP_WAIT {
                        continue;
                    }
                    Self::update_otp_map(&config, &socket, &state);
                }
            })
            .expect("failed to spawn consumer advertisement thread")
    }

    /// Emit this Consumer's Module-Advertisement plus a Name-Adv Request and
    /// a System-Adv Request, refreshing its view of every Producer's Systems
    /// and named Points (spec §4.G, "updateOTPMap").
    fn update_otp_map(
        config: &ConsumerConfig,
        socket: &Arc<Mutex<Box<dyn SocketAdapter>>>,
        state: &Arc<Mutex<ConsumerState>>,
    ) {
        let destination = match config.address_family {
            AddressFamily::V4 => SocketAddr::new(IpAddr::V4(ADVERTISEMENT_MULTICAST_V4), OTP_PORT),
            AddressFamily::V6 => SocketAddr::new(IpAddr::V6(ADVERTISEMENT_MULTICAST_V6), OTP_PORT),
        };

        let mut module_adv = ModuleAdvertisementLayer::new();
        for id in understood_modules() {
            let _ = module_adv.push(id);
        }

        let (module_folio, name_folio, system_folio) = {
            let mut st = state.lock();
            let module_folio = st.module_adv_folio;
            st.module_adv_folio = module_folio.next();
            let name_folio = st.name_adv_folio;
            st.name_adv_folio = name_folio.next();
            let system_folio = st.system_adv_folio;
            st.system_adv_folio = system_folio.next();
            (module_folio, name_folio, system_folio)
        };

        let messages = [
            AdvertisementMessage {
                cid: config.local_cid,
                component_name: config.local_name.0.clone(),
                payload: AdvertisementPayload::Module(module_adv),
            }
            .encode(module_folio),
            AdvertisementMessage {
                cid: config.local_cid,
                component_name: config.local_name.0.clone(),
                payload: AdvertisementPayload::Name(crate::protocol::layers::NameAdvertisementLayer::request()),
            }
            .encode(name_folio),
            AdvertisementMessage {
                cid: config.local_cid,
                component_name: config.local_name.0.clone(),
                payload: AdvertisementPayload::System(crate::protocol::layers::SystemAdvertisementLayer::request()),
            }
            .encode(system_folio),
        ];

        let socket = socket.lock();
        for message in messages.into_iter().flatten() {
            let _ = socket.send_to(&message, destination);
        }
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.shutdown();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn understood_modules_lists_all_six_standard_modules() {
        assert_eq!(understood_modules().len(), 6);
    }

    #[test]
    fn consumer_state_starts_with_no_systems() {
        let state = ConsumerState::default();
        assert!(state.systems.is_empty());
    }
}
