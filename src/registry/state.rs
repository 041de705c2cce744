// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The data actually guarded by the registry's single lock (spec §4.E,
//! Design Notes "shared-ownership smart pointers -> arena + identifier": a
//! flat keyed map, components referencing children by `Address` rather than
//! by pointer).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::ids::{Address, Cid, Group, Name, Point as PointId, Priority, System};
use crate::core::time::Timestamp;
use crate::error::Error;
use crate::protocol::constants::ADVERTISEMENT_TIMEOUT;
use crate::protocol::layers::ModuleId;

use super::event::{ChangeEvent, ModuleAxis};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ComponentKind {
    Producer,
    Consumer,
    Unknown,
}

/// One Module's last-received payload for one Point.
#[derive(Clone, Debug)]
pub struct ModuleState {
    pub additional: Vec<u8>,
    /// The Point layer's own sample timestamp at the time this module was
    /// last received, preserved per-module even though several modules in
    /// one Point share the Point's nominal sample time (SPEC_FULL §10).
    pub sample_time: Timestamp,
}

#[derive(Clone, Debug)]
struct PointEntry {
    priority: Priority,
    name: Option<Name>,
    modules: HashMap<ModuleId, ModuleState>,
    last_seen: Instant,
    expired: bool,
}

impl PointEntry {
    fn new(priority: Priority, now: Instant) -> Self {
        Self { priority, name: None, modules: HashMap::new(), last_seen: now, expired: false }
    }
}

/// A read-only snapshot of one Point's merged module state, returned by the
/// public "get current position/rotation/scale" API (spec §6).
#[derive(Clone, Debug)]
pub struct PointSnapshot {
    pub cid: Cid,
    pub priority: Priority,
    pub name: Option<Name>,
    pub modules: HashMap<ModuleId, ModuleState>,
    pub expired: bool,
}

type GroupMap = HashMap<u16, HashMap<u32, PointEntry>>;
type SystemMap = HashMap<u8, GroupMap>;

#[derive(Clone, Debug)]
struct ComponentEntry {
    name: Name,
    ip: Option<std::net::IpAddr>,
    kind: ComponentKind,
    /// Module-Advertisement interest: module id -> last-seen.
    modules: HashMap<ModuleId, Instant>,
    last_seen: Instant,
    systems: SystemMap,
    /// First-observed order, used to break priority ties (spec §4.F).
    insertion_order: u64,
}

#[derive(Default)]
pub(super) struct RegistryState {
    pub(super) components: HashMap<Cid, ComponentEntry>,
    pub(super) winning: HashMap<Address, Cid>,
    next_insertion_order: u64,
}

impl RegistryState {
    pub(super) fn upsert_component(
        &mut self,
        cid: Cid,
        name: Name,
        ip: Option<std::net::IpAddr>,
        kind: ComponentKind,
        now: Instant,
    ) -> Vec<ChangeEvent> {
        if let Some(existing) = self.components.get_mut(&cid) {
            existing.last_seen = now;
            existing.name = name;
            existing.ip = ip;
            existing.kind = kind;
            Vec::new()
        } else {
            let order = self.next_insertion_order;
            self.next_insertion_order += 1;
            self.components.insert(
                cid,
                ComponentEntry {
                    name,
                    ip,
                    kind,
                    modules: HashMap::new(),
                    last_seen: now,
                    systems: HashMap::new(),
                    insertion_order: order,
                },
            );
            vec![ChangeEvent::NewComponent(cid)]
        }
    }

    pub(super) fn record_module_interest(&mut self, cid: Cid, module: ModuleId, now: Instant) {
        if let Some(component) = self.components.get_mut(&cid) {
            component.modules.insert(module, now);
            component.last_seen = now;
        }
    }

    fn ensure_component(&mut self, cid: Cid, now: Instant) -> &mut ComponentEntry {
        self.components.entry(cid).or_insert_with(|| {
            let order = self.next_insertion_order;
            self.next_insertion_order += 1;
            ComponentEntry {
                name: Name::new(""),
                ip: None,
                kind: ComponentKind::Unknown,
                modules: HashMap::new(),
                last_seen: now,
                systems: HashMap::new(),
                insertion_order: order,
            }
        })
    }

    pub(super) fn upsert_point(
        &mut self,
        cid: Cid,
        address: Address,
        priority: Priority,
        sample_time: Timestamp,
        modules: Vec<(ModuleId, Vec<u8>)>,
        now: Instant,
    ) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        let is_new_component = !self.components.contains_key(&cid);
        let component = self.ensure_component(cid, now);
        if is_new_component {
            events.push(ChangeEvent::NewComponent(cid));
        }
        component.last_seen = now;

        let groups = component.systems.entry(address.system.get()).or_insert_with(|| {
            events.push(ChangeEvent::NewSystem(cid, address.system));
            HashMap::new()
        });
        let points = groups.entry(address.group.get()).or_insert_with(|| {
            events.push(ChangeEvent::NewGroup(cid, address.system, address.group));
            HashMap::new()
        });

        let is_new_point = !points.contains_key(&address.point.get());
        let point = points.entry(address.point.get()).or_insert_with(|| PointEntry::new(priority, now));
        point.priority = priority;
        point.last_seen = now;
        point.expired = false;

        for (module_id, additional) in modules {
            let changed = match point.modules.get(&module_id) {
                Some(existing) => existing.additional != additional,
                None => true,
            };
            point.modules.insert(module_id, ModuleState { additional, sample_time });
            if changed {
                for axis in ModuleAxis::for_module(module_id) {
                    events.push(ChangeEvent::UpdatedModule(cid, address, *axis));
                }
            }
        }

        events.push(if is_new_point {
            ChangeEvent::NewPoint(cid, address)
        } else {
            ChangeEvent::UpdatedPoint(cid, address)
        });

        events
    }

    pub(super) fn upsert_point_name(
        &mut self,
        cid: Cid,
        address: Address,
        name: Name,
        now: Instant,
    ) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        let is_new_component = !self.components.contains_key(&cid);
        let component = self.ensure_component(cid, now);
        if is_new_component {
            events.push(ChangeEvent::NewComponent(cid));
        }
        let groups = component.systems.entry(address.system.get()).or_insert_with(|| {
            events.push(ChangeEvent::NewSystem(cid, address.system));
            HashMap::new()
        });
        let points = groups.entry(address.group.get()).or_insert_with(|| {
            events.push(ChangeEvent::NewGroup(cid, address.system, address.group));
            HashMap::new()
        });
        let is_new_point = !points.contains_key(&address.point.get());
        let point =
            points.entry(address.point.get()).or_insert_with(|| PointEntry::new(Priority::default(), now));
        point.name = Some(name);
        point.last_seen = now;
        events.push(if is_new_point {
            ChangeEvent::NewPoint(cid, address)
        } else {
            ChangeEvent::UpdatedPoint(cid, address)
        });
        events
    }

    pub(super) fn set_systems(&mut self, cid: Cid, systems: Vec<System>, now: Instant) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        let is_new_component = !self.components.contains_key(&cid);
        let component = self.ensure_component(cid, now);
        if is_new_component {
            events.push(ChangeEvent::NewComponent(cid));
        }
        component.last_seen = now;

        let wanted: std::collections::HashSet<u8> = systems.iter().map(|s| s.get()).collect();
        let stale: Vec<u8> =
            component.systems.keys().copied().filter(|k| !wanted.contains(k)).collect();
        for raw in stale {
            component.systems.remove(&raw);
            events.push(ChangeEvent::RemovedSystem(cid, System::new(raw).expect("was a valid System key")));
        }
        for system in systems {
            component.systems.entry(system.get()).or_insert_with(|| {
                events.push(ChangeEvent::NewSystem(cid, system));
                HashMap::new()
            });
        }
        events
    }

    pub(super) fn change_component_cid(&mut self, old: Cid, new: Cid) -> Result<Vec<ChangeEvent>, Error> {
        if self.components.contains_key(&new) {
            return Err(Error::CidInUse);
        }
        let entry = match self.components.remove(&old) {
            Some(e) => e,
            None => return Ok(Vec::new()),
        };
        self.components.insert(new, entry);
        for cid in self.winning.values_mut() {
            if *cid == old {
                *cid = new;
            }
        }
        Ok(vec![ChangeEvent::NewComponent(new), ChangeEvent::RemovedComponent(old)])
    }

    pub(super) fn expire(
        &mut self,
        now: Instant,
        component_timeout: Duration,
        point_timeout: Duration,
    ) -> Vec<ChangeEvent> {
        let mut events = Vec::new();

        let expired_components: Vec<Cid> = self
            .components
            .iter()
            .filter(|(_, c)| now.duration_since(c.last_seen) >= component_timeout)
            .map(|(cid, _)| *cid)
            .collect();
        for cid in expired_components {
            self.components.remove(&cid);
            self.winning.retain(|_, winner| *winner != cid);
            events.push(ChangeEvent::RemovedComponent(cid));
        }

        for (cid, component) in self.components.iter_mut() {
            component.modules.retain(|_, last_seen| {
                now.duration_since(*last_seen) < ADVERTISEMENT_TIMEOUT
            });
            for (system_num, groups) in component.systems.iter() {
                for (group_num, points) in groups.iter() {
                    for (point_num, point) in points.iter() {
                        if !point.expired && now.duration_since(point.last_seen) >= point_timeout {
                            let address = Address::new(
                                System::new(*system_num).expect("stored System was validated"),
                                Group::new(*group_num).expect("stored Group was validated"),
                                PointId::new(*point_num).expect("stored Point was validated"),
                            );
                            events.push(ChangeEvent::ExpiredPoint(*cid, address));
                        }
                    }
                }
            }
            for groups in component.systems.values_mut() {
                for points in groups.values_mut() {
                    for point in points.values_mut() {
                        if now.duration_since(point.last_seen) >= point_timeout {
                            point.expired = true;
                        }
                    }
                }
            }
        }

        events
    }

    pub(super) fn known_systems(&self) -> Vec<System> {
        let mut set = std::collections::HashSet::new();
        for component in self.components.values() {
            for raw in component.systems.keys() {
                set.insert(*raw);
            }
        }
        set.into_iter().filter_map(|raw| System::new(raw).ok()).collect()
    }

    pub(super) fn recompute_winning(&mut self, system: System) {
        let mut candidates: HashMap<Address, (Priority, u64, Cid)> = HashMap::new();
        for (cid, component) in self.components.iter() {
            let Some(groups) = component.systems.get(&system.get()) else { continue };
            for (group_num, points) in groups.iter() {
                for (point_num, point) in points.iter() {
                    if point.expired {
                        continue;
                    }
                    let address = Address::new(
                        system,
                        Group::new(*group_num).expect("stored Group was validated"),
                        PointId::new(*point_num).expect("stored Point was validated"),
                    );
                    let candidate = (point.priority, component.insertion_order, *cid);
                    candidates
                        .entry(address)
                        .and_modify(|best| {
                            // Highest priority wins; ties broken by earliest
                            // insertion order (spec §4.F).
                            if candidate.0 > best.0
                                || (candidate.0 == best.0 && candidate.1 < best.1)
                            {
                                *best = candidate;
                            }
                        })
                        .or_insert(candidate);
                }
            }
        }

        self.winning.retain(|address, _| address.system != system);
        for (address, (_, _, cid)) in candidates {
            self.winning.insert(address, cid);
        }
    }

    pub(super) fn read_point(&self, address: Address) -> Option<PointSnapshot> {
        let cid = *self.winning.get(&address)?;
        let component = self.components.get(&cid)?;
        let point = component
            .systems
            .get(&address.system.get())?
            .get(&address.group.get())?
            .get(&address.point.get())?;
        Some(PointSnapshot {
            cid,
            priority: point.priority,
            name: point.name.clone(),
            modules: point.modules.clone(),
            expired: point.expired,
        })
    }
}
