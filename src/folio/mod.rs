// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Folio reassembler: tracks, per `(sender CID, System|advertisement kind)`,
//! the most recently accepted folio and the pages received for it, and
//! signals completion once every page `0..=LastPage` has arrived (spec
//! §4.D).
//!
//! Reassembly state is keyed per the teacher's `Arc<DashMap<K, V>>`
//! concurrent-registry idiom (`core/reader/mod.rs`'s `ReaderProxyRegistry`),
//! since many sender threads may deliver pages for different folios
//! concurrently and only same-key access needs to serialize.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::core::ids::{Cid, System};
use crate::core::time::Folio;

/// What a folio sequence is scoped to: a System's Transform stream, or one
/// of the three advertisement kinds (spec §4.D: "(system|∅), vector").
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FolioScope {
    Transform(System),
    ModuleAdvertisement,
    NameAdvertisement,
    SystemAdvertisement,
}

type Key = (Cid, FolioScope);

struct FolioState {
    folio: Folio,
    last_page: u16,
    /// `None` until that page has arrived.
    datagrams: Vec<Option<Vec<u8>>>,
    received: usize,
    /// Set once this folio's completion has already been signalled, so a
    /// duplicate page (e.g. a retransmit-free network delivering the same
    /// datagram twice) does not re-fire completion.
    completed: bool,
    last_activity: Instant,
}

impl FolioState {
    fn new(folio: Folio, last_page: u16, now: Instant) -> Self {
        Self {
            folio,
            last_page,
            datagrams: vec![None; last_page as usize + 1],
            received: 0,
            completed: false,
            last_activity: now,
        }
    }

    fn reset(&mut self, folio: Folio, last_page: u16, now: Instant) {
        *self = Self::new(folio, last_page, now);
    }
}

/// How `accept` classifies an incoming datagram.
#[derive(Eq, PartialEq, Debug)]
pub enum Outcome {
    /// The datagram was stale or otherwise out of sequence; silently
    /// discarded (spec §4.D, §7 `StaleFolio`).
    Discarded,
    /// Accepted, but the folio is not yet complete.
    Pending,
    /// Accepted and this page completed the folio. Carries every page's
    /// raw datagram, in page order `0..=LastPage`.
    Complete(Vec<Vec<u8>>),
}

/// Reassembles paged folios for every `(sender CID, scope)` observed.
#[derive(Clone, Default)]
pub struct FolioReassembler {
    state: Arc<DashMap<Key, FolioStateCell>>,
}

// DashMap values must be `Send`; wrap in a small newtype so `FolioState`
// (not `Clone`) can live behind the map directly.
struct FolioStateCell(FolioState);

impl std::fmt::Debug for FolioReassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolioReassembler").field("tracked", &self.state.len()).finish()
    }
}

impl FolioReassembler {
    pub fn new() -> Self {
        Self { state: Arc::new(DashMap::new()) }
    }

    /// Feed one incoming datagram for `(sender, scope)` carrying folio
    /// coordinate `(folio, page, last_page)` plus its raw bytes.
    pub fn accept(
        &self,
        sender: Cid,
        scope: FolioScope,
        folio: Folio,
        page: u16,
        last_page: u16,
        datagram: Vec<u8>,
        now: Instant,
    ) -> Outcome {
        let key = (sender, scope);
        let mut entry = self.state.entry(key).or_insert_with(|| {
            FolioStateCell(FolioState::new(folio, last_page, now))
        });
        let st = &mut entry.0;

        if st.received > 0 || st.completed {
            if !folio.is_in_sequence_after(st.folio) {
                return Outcome::Discarded;
            }
            if folio != st.folio {
                st.reset(folio, last_page, now);
            }
        }

        st.last_activity = now;
        let index = page as usize;
        if index >= st.datagrams.len() {
            // LastPage grew for a folio already in progress: treat as a
            // structural anomaly and restart tracking at this datagram.
            st.reset(folio, last_page, now);
        }
        if st.datagrams[page as usize].is_none() {
            st.datagrams[page as usize] = Some(datagram);
            st.received += 1;
        }

        if st.received == st.datagrams.len() && !st.completed {
            st.completed = true;
            let pages = st.datagrams.iter().cloned().map(|d| d.unwrap()).collect();
            return Outcome::Complete(pages);
        }
        Outcome::Pending
    }

    /// Drop tracking state for any `(sender, scope)` idle longer than `ttl`
    /// (housekeeping; spec §4.D does not define a folio-state timeout, but
    /// an unbounded map would leak memory for senders that vanish
    /// mid-folio).
    pub fn expire(&self, now: Instant, ttl: std::time::Duration) {
        self.state.retain(|_, v| now.duration_since(v.0.last_activity) < ttl);
    }

    pub fn tracked_count(&self) -> usize {
        self.state.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid() -> Cid {
        Cid::from_bytes([9; 16])
    }

    fn system() -> System {
        System::new(1).unwrap()
    }

    #[test]
    fn single_page_folio_completes_immediately() {
        let r = FolioReassembler::new();
        let outcome = r.accept(
            cid(),
            FolioScope::Transform(system()),
            Folio::new(1),
            0,
            0,
            vec![1, 2, 3],
            Instant::now(),
        );
        assert_eq!(outcome, Outcome::Complete(vec![vec![1, 2, 3]]));
    }

    #[test]
    fn out_of_order_pages_complete_once_all_arrive() {
        let r = FolioReassembler::new();
        let scope = FolioScope::Transform(system());
        let now = Instant::now();

        let first = r.accept(cid(), scope, Folio::new(5), 1, 1, vec![b'B'], now);
        assert_eq!(first, Outcome::Pending);

        let second = r.accept(cid(), scope, Folio::new(5), 0, 1, vec![b'A'], now);
        assert_eq!(second, Outcome::Complete(vec![vec![b'A'], vec![b'B']]));
    }

    #[test]
    fn stale_folio_is_discarded() {
        let r = FolioReassembler::new();
        let scope = FolioScope::Transform(system());
        let now = Instant::now();

        r.accept(cid(), scope, Folio::new(100), 0, 1, vec![1], now);
        // A folio that regresses into the discard window relative to 100
        // (delta in (0, 63335]) must be discarded, not restart tracking.
        let stale = r.accept(cid(), scope, Folio::new(50), 0, 1, vec![2], now);
        assert_eq!(stale, Outcome::Discarded);
    }

    #[test]
    fn newer_folio_before_previous_completes_discards_the_old_one() {
        let r = FolioReassembler::new();
        let scope = FolioScope::Transform(system());
        let now = Instant::now();

        // Page 0 of folio N arrives, but N is two pages and page 1 never shows up.
        r.accept(cid(), scope, Folio::new(1), 0, 1, vec![1], now);
        // Page 0 of folio N+1 arrives: folio N is abandoned (spec §8 scenario 5).
        let outcome = r.accept(cid(), scope, Folio::new(2), 0, 0, vec![2], now);
        assert_eq!(outcome, Outcome::Complete(vec![vec![2]]));
    }

    #[test]
    fn duplicate_completion_page_does_not_resignal() {
        let r = FolioReassembler::new();
        let scope = FolioScope::Transform(system());
        let now = Instant::now();
        let first = r.accept(cid(), scope, Folio::new(1), 0, 0, vec![1], now);
        assert!(matches!(first, Outcome::Complete(_)));
        let dup = r.accept(cid(), scope, Folio::new(1), 0, 0, vec![1], now);
        assert_eq!(dup, Outcome::Pending);
    }

    #[test]
    fn expire_drops_idle_entries() {
        let r = FolioReassembler::new();
        let scope = FolioScope::Transform(system());
        let t0 = Instant::now();
        r.accept(cid(), scope, Folio::new(1), 0, 1, vec![1], t0);
        assert_eq!(r.tracked_count(), 1);
        r.expire(t0 + std::time::Duration::from_secs(60), std::time::Duration::from_secs(30));
        assert_eq!(r.tracked_count(), 0);
    }
}
