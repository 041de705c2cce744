// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority merger: a background task per registry that recomputes the
//! winning contributor for every dirtied System, waking on a dirty signal or
//! at most every [`MERGER_MAX_WAIT`] (spec §4.F).
//!
//! Modeled on the teacher's dedicated-thread-with-shutdown-flag idiom
//! (`discovery/cloud/poller_thread.rs`'s `CloudDiscoveryPoller`), minus its
//! async runtime: the merger only ever blocks on a channel receive, so a
//! plain OS thread is enough.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, RecvTimeoutError};

use crate::core::ids::System;
use crate::protocol::constants::MERGER_MAX_WAIT;
use crate::registry::Registry;

/// Owns the merger's background thread. Dropping it requests shutdown and
/// joins the thread.
pub struct Merger {
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Merger {
    /// Spawn the merger loop against `registry`, consuming `dirty` (the
    /// receiver half returned by [`Registry::new`]).
    pub fn spawn(registry: Registry, dirty: Receiver<System>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let thread_handle = thread::Builder::new()
            .name("otp-priority-merger".to_string())
            .spawn(move || Self::run(registry, dirty, running_clone))
            .expect("failed to spawn priority merger thread");

        Self { running, thread_handle: Some(thread_handle) }
    }

    fn run(registry: Registry, dirty: Receiver<System>, running: Arc<AtomicBool>) {
        #[cfg(feature = "logging")]
        log::debug!("priority merger started");

        while running.load(Ordering::Relaxed) {
            match dirty.recv_timeout(MERGER_MAX_WAIT) {
                Ok(system) => {
                    let mut systems = vec![system];
                    // Drain any further dirty signals queued up behind this
                    // one so one wake coalesces a burst of mutations.
                    while let Ok(more) = dirty.try_recv() {
                        if !systems.contains(&more) {
                            systems.push(more);
                        }
                    }
                    for system in systems {
                        registry.recompute_winning(system);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    for system in registry.known_systems() {
                        registry.recompute_winning(system);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
            registry.expire(std::time::Instant::now());
        }

        #[cfg(feature = "logging")]
        log::debug!("priority merger stopped");
    }

    /// Request shutdown without waiting for the thread to join.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for Merger {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::{Address, Cid, Group, Name, Point as PointId, Priority};
    use crate::core::time::Timestamp;
    use crate::registry::ComponentKind;
    use std::time::{Duration, Instant};

    #[test]
    fn merger_recomputes_winner_on_dirty_signal() {
        let (registry, _events, dirty) = Registry::new();
        let merger = Merger::spawn(registry.clone(), dirty);

        let cid = Cid::new_v4();
        let now = Instant::now();
        let address = Address::new(
            System::new(1).unwrap(),
            Group::new(1).unwrap(),
            PointId::new(1).unwrap(),
        );
        registry.upsert_component(cid, Name::new("P"), None, ComponentKind::Producer, now);
        registry.upsert_point(cid, address, Priority::new(100).unwrap(), Timestamp::from_micros(0), vec![], now);

        // Give the background thread a chance to observe the dirty signal.
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline && registry.winning_component(address).is_none() {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(registry.winning_component(address), Some(cid));

        drop(merger);
    }
}
