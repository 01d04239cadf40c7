//! The IPv4 neighbor cache (§4.2). Structurally the simpler sibling of
//! [`crate::ndp::cache::NdCache`] — one global index, one LRU-ish list, no
//! auxiliary per-state lists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use fxhash::FxHashMap;
use generational_arena::{Arena, Index};
use neigh_wire::mac::MacAddress;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex, RwLock};

use crate::config::ArpConfig;
use crate::key::Key4;
use crate::list::IntrusiveList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpState {
    Phantom,
    Incomplete,
    Complete,
}

pub struct ArpEntryState {
    pub hw: MacAddress,
    pub state: ArpState,
    pub stamp: Instant,
    pub pending: Vec<Vec<u8>>,
    /// Set by the ARP-cache sweep when a COMPLETE entry is old enough that
    /// the next resolution should re-solicit instead of trusting `hw`
    /// silently (§4.6's "analogous, simpler sweep").
    pub stale_flag: bool,
}

impl ArpEntryState {
    fn phantom() -> Self {
        Self {
            hw: MacAddress::NULL,
            state: ArpState::Phantom,
            stamp: Instant::now(),
            pending: Vec::new(),
            stale_flag: false,
        }
    }
}

pub type ArpEntryGuard = ArcMutexGuard<RawMutex, ArpEntryState>;

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub phantom: usize,
    pub incomplete: usize,
    pub complete: usize,
    pub evictions: u64,
}

struct Inner {
    index: FxHashMap<Key4, Index>,
    arena: Arena<(Key4, Arc<Mutex<ArpEntryState>>)>,
}

pub struct ArpCache {
    config: ArpConfig,
    inner: RwLock<Inner>,
    entries: IntrusiveList,
    evictions: AtomicU64,
}

impl ArpCache {
    #[must_use]
    pub fn new(config: ArpConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner {
                index: FxHashMap::default(),
                arena: Arena::new(),
            }),
            entries: IntrusiveList::new(),
            evictions: AtomicU64::new(0),
        }
    }

    /// Finds or creates the entry for `ip`, returning it already locked.
    /// The cache's index lock is released before this function returns —
    /// only the entry's own lock is held by the caller afterward.
    pub fn lookup_or_create(&self, ip: Key4) -> (Index, ArpEntryGuard) {
        let mut inner = self.inner.write();
        self.evict_sweep(&mut inner);

        let idx = match inner.index.get(&ip) {
            Some(&idx) => idx,
            None => {
                let state = Arc::new(Mutex::new(ArpEntryState::phantom()));
                let idx = inner.arena.insert((ip, state));
                inner.index.insert(ip, idx);
                idx
            }
        };
        let arc = inner.arena.get(idx).unwrap().1.clone();
        drop(inner);

        let guard = arc.lock_arc();
        self.entries.push_back(idx);
        (idx, guard)
    }

    /// Returns the entry for `ip` if present, without creating one.
    pub fn lookup(&self, ip: Key4) -> Option<(Index, ArpEntryGuard)> {
        let inner = self.inner.read();
        let idx = *inner.index.get(&ip)?;
        let arc = inner.arena.get(idx)?.1.clone();
        drop(inner);
        Some((idx, arc.lock_arc()))
    }

    /// As [`Self::lookup`], but returns `None` for entries still PHANTOM.
    pub fn lookup_valid_only(&self, ip: Key4) -> Option<(Index, ArpEntryGuard)> {
        let (idx, guard) = self.lookup(ip)?;
        if guard.state == ArpState::Phantom {
            None
        } else {
            Some((idx, guard))
        }
    }

    /// Moves `idx` to the back of the LRU-ish global list.
    pub fn touch(&self, idx: Index) {
        self.entries.move_to_back(idx);
    }

    /// A point-in-time copy of the global list's order, for the sweep that
    /// sets [`ArpEntryState::stale_flag`] (§4.6's "analogous, simpler sweep").
    pub fn entries_snapshot(&self) -> Vec<Index> {
        self.entries.snapshot()
    }

    /// Looks an index snapshotted from [`Self::entries_snapshot`] back up to
    /// its key and a locked guard. `None` if evicted since the snapshot.
    pub fn get_by_index(&self, idx: Index) -> Option<(Key4, ArpEntryGuard)> {
        let inner = self.inner.read();
        let (ip, arc) = inner.arena.get(idx)?;
        let ip = *ip;
        let arc = arc.clone();
        drop(inner);
        Some((ip, arc.lock_arc()))
    }

    /// True if `idx` is still the live, indexed entry for its key — the
    /// restart-loop check a caller runs after re-acquiring a lock on an
    /// index captured outside the index lock (§4.2, §5 "restart race").
    pub fn is_live(&self, idx: Index) -> bool {
        self.entries.contains(idx) && self.inner.read().arena.contains(idx)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        let mut stats = CacheStats {
            evictions: self.evictions.load(Ordering::Relaxed),
            ..Default::default()
        };
        for (_, (_, arc)) in inner.arena.iter() {
            match arc.lock().state {
                ArpState::Phantom => stats.phantom += 1,
                ArpState::Incomplete => stats.incomplete += 1,
                ArpState::Complete => stats.complete += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &ArpConfig {
        &self.config
    }

    fn evict_sweep(&self, inner: &mut Inner) {
        loop {
            let Some(front) = self.entries.front() else {
                break;
            };
            let over_cap = self.entries.len() > self.config.max_size;
            let Some((ip, arc)) = inner.arena.get(front).cloned() else {
                self.entries.remove(front);
                continue;
            };
            let should_evict = {
                let guard = arc.lock();
                over_cap
                    || guard.state == ArpState::Phantom
                    || guard.stamp.elapsed() > self.config.timeout
            };
            if !should_evict {
                break;
            }
            self.entries.remove(front);
            inner.arena.remove(front);
            inner.index.remove(&ip);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn cache() -> ArpCache {
        ArpCache::new(ArpConfig {
            max_size: 2,
            ..ArpConfig::default()
        })
    }

    #[test]
    fn lookup_or_create_returns_same_entry() {
        let cache = cache();
        let ip = Key4::from(Ipv4Addr::new(10, 0, 0, 1));
        let (idx_a, _guard_a) = cache.lookup_or_create(ip);
        drop(_guard_a);
        let (idx_b, _guard_b) = cache.lookup_or_create(ip);
        assert_eq!(idx_a, idx_b);
    }

    #[test]
    fn new_entry_is_phantom() {
        let cache = cache();
        let ip = Key4::from(Ipv4Addr::new(10, 0, 0, 1));
        let (_idx, guard) = cache.lookup_or_create(ip);
        assert_eq!(guard.state, ArpState::Phantom);
    }

    #[test]
    fn eviction_caps_size() {
        let cache = cache();
        for i in 0..5u8 {
            let ip = Key4::from(Ipv4Addr::new(10, 0, 0, i));
            cache.lookup_or_create(ip);
        }
        assert!(cache.len() <= 2);
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn complete_entry_not_evicted_under_cap() {
        let cache = cache();
        let ip = Key4::from(Ipv4Addr::new(10, 0, 0, 1));
        let (_idx, mut guard) = cache.lookup_or_create(ip);
        guard.state = ArpState::Complete;
        guard.hw = MacAddress::from([1, 2, 3, 4, 5, 6]);
        drop(guard);

        let (_idx2, _g2) = cache.lookup_or_create(ip);
        assert_eq!(cache.len(), 1);
    }
}
