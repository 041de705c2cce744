// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Producer role: periodic Transform emission plus on-demand Name/System
//! Advertisement responses (spec §4.H).
//!
//! Local point/module state lives behind its own mutex, separate from
//! [`crate::registry::Registry`] (which models *remote* contributors a
//! Consumer merges) — a Producer has exactly one source of truth for its own
//! points, so no priority merge applies here.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::Rng;

use crate::config::{AddressFamily, ProducerConfig};
use crate::core::ids::{Group, Point as PointId, Priority, System};
use crate::core::time::{Folio, Timestamp};
use crate::protocol::constants::{
    ADVERTISEMENT_MULTICAST_V4, ADVERTISEMENT_MULTICAST_V6, ADVERTISEMENT_STARTUP_WAIT,
    FULL_POINT_SET_TIMING_MAX, FULL_POINT_SET_TIMING_MIN, OTP_PORT,
};
use crate::protocol::layers::module::ModuleId;
use crate::protocol::layers::{ModuleLayer, NameAdvertisementLayer, PointDescriptor, SystemAdvertisementLayer};
use crate::protocol::message::{
    decode_advertisement, AdvertisementMessage, AdvertisementPayload, DecodedAdvertisement, PointBlock,
    TransformMessage,
};
use crate::transport::SocketAdapter;

fn now_micros() -> Timestamp {
    let micros = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_micros() as u64;
    Timestamp::from_micros(micros)
}

fn random_backoff(max: Duration) -> Duration {
    let millis = rand::thread_rng().gen_range(0..=max.as_millis() as u64);
    Duration::from_millis(millis)
}

struct LocalPoint {
    priority: Priority,
    modules: HashMap<ModuleId, Vec<u8>>,
    dirty: bool,
}

impl LocalPoint {
    fn new(priority: Priority) -> Self {
        Self { priority, modules: HashMap::new(), dirty: true }
    }
}

struct SystemState {
    points: HashMap<(u16, u32), LocalPoint>,
    folio: Folio,
    next_full_point_set: Instant,
}

impl SystemState {
    fn new(now: Instant) -> Self {
        Self { points: HashMap::new(), folio: Folio::new(0), next_full_point_set: now }
    }
}

#[derive(Default)]
struct ProducerState {
    systems: HashMap<u8, SystemState>,
    name_descriptors: HashMap<(u8, u16, u32), String>,
}

/// A single OTP Producer: owns its local point data and emits Transform
/// folios for it, and answers Name/System-Advertisement requests.
pub struct Producer {
    config: ProducerConfig,
    socket: Arc<Mutex<Box<dyn SocketAdapter>>>,
    state: Arc<Mutex<ProducerState>>,
    boot: Instant,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Producer {
    /// Bind `socket`, join the advertisement multicast group, and start the
    /// transmit and responder threads.
    pub fn new(config: ProducerConfig, mut socket: impl SocketAdapter + 'static) -> io::Result<Self> {
        socket.bind(config.interface.as_deref(), config.bind_address)?;
        let adv_group = match config.address_family {
            AddressFamily::V4 => IpAddr::V4(ADVERTISEMENT_MULTICAST_V4),
            AddressFamily::V6 => IpAddr::V6(ADVERTISEMENT_MULTICAST_V6),
        };
        socket.join_multicast(adv_group)?;

        let socket: Arc<Mutex<Box<dyn SocketAdapter>>> = Arc::new(Mutex::new(Box::new(socket)));
        let state = Arc::new(Mutex::new(ProducerState::default()));
        let running = Arc::new(AtomicBool::new(true));
        let boot = Instant::now();

        let mut threads = Vec::new();
        threads.push(Self::spawn_transmit_thread(
            config.clone(),
            Arc::clone(&socket),
            Arc::clone(&state),
            Arc::clone(&running),
            boot,
        ));
        threads.push(Self::spawn_responder_thread(
            config.clone(),
            Arc::clone(&socket),
            Arc::clone(&state),
            Arc::clone(&running),
        ));

        Ok(Self { config, socket, state, boot, running, threads })
    }

    pub fn local_cid(&self) -> crate::core::ids::Cid {
        self.config.local_cid
    }

    pub fn local_name(&self) -> &crate::core::ids::Name {
        &self.config.local_name
    }

    /// Elapsed time since this Producer was constructed.
    pub fn uptime(&self) -> Duration {
        self.boot.elapsed()
    }

    /// The local unicast address this Producer sends Request replies from.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.lock().local_addr()
    }

    /// Begin tracking `system` for periodic Transform emission.
    pub fn add_system(&self, system: System) {
        let now = Instant::now();
        self.state.lock().systems.entry(system.get()).or_insert_with(|| SystemState::new(now));
    }

    pub fn remove_system(&self, system: System) {
        self.state.lock().systems.remove(&system.get());
    }

    /// Create or update a local point's priority. Marks it dirty so the next
    /// Transform folio for its System includes it even outside a Full Point
    /// Set cycle.
    pub fn upsert_point(&self, system: System, group: Group, point: PointId, priority: Priority) {
        let now = Instant::now();
        let mut st = self.state.lock();
        let system_state = st.systems.entry(system.get()).or_insert_with(|| SystemState::new(now));
        let entry = system_state
            .points
            .entry((group.get(), point.get()))
            .or_insert_with(|| LocalPoint::new(priority));
        entry.priority = priority;
        entry.dirty = true;
    }

    pub fn remove_point(&self, system: System, group: Group, point: PointId) {
        if let Some(system_state) = self.state.lock().systems.get_mut(&system.get()) {
            system_state.points.remove(&(group.get(), point.get()));
        }
    }

    /// Set (or replace) one module's raw payload for a local point.
    pub fn set_module(&self, system: System, group: Group, point: PointId, module: ModuleId, payload: Vec<u8>) {
        let now = Instant::now();
        let mut st = self.state.lock();
        let system_state = st.systems.entry(system.get()).or_insert_with(|| SystemState::new(now));
        let entry = system_state
            .points
            .entry((group.get(), point.get()))
            .or_insert_with(|| LocalPoint::new(Priority::default()));
        entry.modules.insert(module, payload);
        entry.dirty = true;
    }

    pub fn remove_module(&self, system: System, group: Group, point: PointId, module: ModuleId) {
        if let Some(system_state) = self.state.lock().systems.get_mut(&system.get()) {
            if let Some(local_point) = system_state.points.get_mut(&(group.get(), point.get())) {
                local_point.modules.remove(&module);
            }
        }
    }

    /// Record a human-readable name for a point, surfaced in Name-Adv
    /// Responses.
    pub fn set_point_name(&self, system: System, group: Group, point: PointId, name: impl Into<String>) {
        self.state
            .lock()
            .name_descriptors
            .insert((system.get(), group.get(), point.get()), name.into());
    }

    fn spawn_transmit_thread(
        config: ProducerConfig,
        socket: Arc<Mutex<Box<dyn SocketAdapter>>>,
        state: Arc<Mutex<ProducerState>>,
        running: Arc<AtomicBool>,
        boot: Instant,
    ) -> JoinHandle<()> {
        thread::Builder::new()
            .name("otp-producer-transmit".to_string())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    thread::sleep(config.transform_interval);
                    if boot.elapsed() < ADVERTISEMENT_STARTUP_WAIT {
                        // Producers MUST NOT send Transform during the first
                        // 12 s after boot (spec §4.H).
                        continue;
                    }
                    Self::emit_due_transforms(&config, &socket, &state);
                }
            })
            .expect("failed to spawn producer transmit thread")
    }

    fn emit_due_transforms(
        config: &ProducerConfig,
        socket: &Arc<Mutex<Box<dyn SocketAdapter>>>,
        state: &Arc<Mutex<ProducerState>>,
    ) {
        let now = Instant::now();
        let timestamp = now_micros();
        let mut datagrams_by_system = Vec::new();

        {
            let mut st = state.lock();
            for (&raw_system, system_state) in st.systems.iter_mut() {
                let full_due = now >= system_state.next_full_point_set;
                let any_dirty = system_state.points.values().any(|p| p.dirty);
                if !full_due && !any_dirty {
                    continue;
                }

                let system = match System::new(raw_system) {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let points: Vec<PointBlock> = system_state
                    .points
                    .iter_mut()
                    .filter(|(_, p)| full_due || p.dirty)
                    .map(|(&(group, point), local)| {
                        local.dirty = false;
                        let modules = local
                            .modules
                            .iter()
                            .map(|(id, payload)| ModuleLayer::new(*id, payload.clone()))
                            .collect();
                        PointBlock::new(
                            local.priority,
                            Group::new(group).expect("stored Group was validated"),
                            PointId::new(point).expect("stored Point was validated"),
                            timestamp,
                            modules,
                        )
                    })
                    .collect();

                if points.is_empty() {
                    continue;
                }

                if full_due {
                    system_state.next_full_point_set =
                        now + random_backoff_range(FULL_POINT_SET_TIMING_MIN, FULL_POINT_SET_TIMING_MAX);
                }

                let folio = system_state.folio;
                system_state.folio = folio.next();
                let message = TransformMessage {
                    cid: config.local_cid,
                    component_name: config.local_name.0.clone(),
                    system,
                    timestamp,
                    full_point_set: full_due,
                    points,
                };
                datagrams_by_system.push((system, folio, message));
            }
        }

        for (system, folio, message) in datagrams_by_system {
            let pages = match message.encode_pages(folio) {
                Ok(pages) => pages,
                Err(_) => continue,
            };
            let group = match config.address_family {
                AddressFamily::V4 => IpAddr::V4(crate::protocol::constants::transform_multicast_v4(system.get())),
                AddressFamily::V6 => IpAddr::V6(crate::protocol::constants::transform_multicast_v6(system.get())),
            };
            let destination = SocketAddr::new(group, OTP_PORT);
            let socket = socket.lock();
            for page in pages {
                let _ = socket.send_to(&page, destination);
            }
        }
    }

    fn spawn_responder_thread(
        config: ProducerConfig,
        socket: Arc<Mutex<Box<dyn SocketAdapter>>>,
        state: Arc<Mutex<ProducerState>>,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        thread::Builder::new()
            .name("otp-producer-responder".to_string())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    let datagram = { socket.lock().recv() };
                    let datagram = match datagram {
                        Ok(d) => d,
                        Err(_) => continue,
                    };
                    let Ok(decoded) = decode_advertisement(&datagram.bytes) else { continue };
                    if decoded.cid == config.local_cid {
                        continue;
                    }
                    match decoded.payload {
                        DecodedAdvertisement::Name(layer) if !layer.response => {
                            Self::spawn_name_reply(&config, &socket, &state, datagram.sender, &running);
                        }
                        DecodedAdvertisement::System(layer) if !layer.response => {
                            Self::spawn_system_reply(&config, &socket, &state, datagram.sender, &running);
                        }
                        _ => {}
                    }
                }
            })
            .expect("failed to spawn producer responder thread")
    }

    fn spawn_name_reply(
        config: &ProducerConfig,
        socket: &Arc<Mutex<Box<dyn SocketAdapter>>>,
        state: &Arc<Mutex<ProducerState>>,
        sender: SocketAddr,
        running: &Arc<AtomicBool>,
    ) {
        let config = config.clone();
        let socket = Arc::clone(socket);
        let state = Arc::clone(state);
        let running = Arc::clone(running);
        thread::spawn(move || {
            thread::sleep(random_backoff(crate::protocol::constants::NAME_ADVERTISEMENT_MAX_BACKOFF));
            if !running.load(Ordering::Relaxed) {
                return;
            }
            let mut layer = NameAdvertisementLayer::response();
            for (&(system, group, point), name) in state.lock().name_descriptors.iter() {
                let Ok(system) = System::new(system) else { continue };
                let Ok(group) = Group::new(group) else { continue };
                let Ok(point) = PointId::new(point) else { continue };
                let _ = layer.push(PointDescriptor {
                    address: crate::core::ids::Address::new(system, group, point),
                    name: name.clone(),
                });
            }
            let message = AdvertisementMessage {
                cid: config.local_cid,
                component_name: config.local_name.0.clone(),
                payload: AdvertisementPayload::Name(layer),
            };
            if let Ok(bytes) = message.encode(Folio::new(0)) {
                let _ = socket.lock().send_to(&bytes, sender);
            }
        });
    }

    fn spawn_system_reply(
        config: &ProducerConfig,
        socket: &Arc<Mutex<Box<dyn SocketAdapter>>>,
        state: &Arc<Mutex<ProducerState>>,
        sender: SocketAddr,
        running: &Arc<AtomicBool>,
    ) {
        let config = config.clone();
        let socket = Arc::clone(socket);
        let state = Arc::clone(state);
        let running = Arc::clone(running);
        thread::spawn(move || {
            thread::sleep(random_backoff(crate::protocol::constants::SYSTEM_ADVERTISEMENT_MAX_BACKOFF));
            if !running.load(Ordering::Relaxed) {
                return;
            }
            let mut layer = SystemAdvertisementLayer::response();
            for &raw_system in state.lock().systems.keys() {
                if let Ok(system) = System::new(raw_system) {
                    let _ = layer.push(system);
                }
            }
            let message = AdvertisementMessage {
                cid: config.local_cid,
                component_name: config.local_name.0.clone(),
                payload: AdvertisementPayload::System(layer),
            };
            if let Ok(bytes) = message.encode(Folio::new(0)) {
                let _ = socket.lock().send_to(&bytes, sender);
            }
        });
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

fn random_backoff_range(min: Duration, max: Duration) -> Duration {
    let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}

impl Drop for Producer {
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
    use crate::core::ids::{Cid, Name};

    #[test]
    fn local_point_starts_dirty() {
        let point = LocalPoint::new(Priority::default());
        assert!(point.dirty);
        assert!(point.modules.is_empty());
    }

    #[test]
    fn config_carries_local_identity() {
        let cid = Cid::new_v4();
        let config = ProducerConfig::new(cid, "Fixture-Producer");
        assert_eq!(config.local_cid, cid);
        assert_eq!(config.local_name, Name::new("Fixture-Producer"));
    }
}
