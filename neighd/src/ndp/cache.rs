//! The IPv6 neighbor cache (§4.4). Structurally parallel to
//! [`crate::arp::cache::ArpCache`], with three additions: a `routers` list
//! tracking entries that are currently advertising as a default router, the
//! `delay`/`retrans`/`reachable` auxiliary lists the timer sweep drives
//! per-state, and a capped redirect table.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fxhash::FxHashMap;
use generational_arena::{Arena, Index};
use neigh_wire::mac::MacAddress;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex, RwLock};

use crate::config::NdConfig;
use crate::key::Key6;
use crate::list::IntrusiveList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdState {
    Phantom,
    Incomplete,
    Reachable,
    Stale,
    Delay,
    Probe,
}

pub struct NdEntryState {
    pub hw: MacAddress,
    pub state: NdState,
    pub stamp: Instant,
    pub is_router: bool,
    pub router_lifetime: Duration,
    pub probe_count: u8,
    pub pending: Vec<Vec<u8>>,
}

impl NdEntryState {
    fn phantom() -> Self {
        Self {
            hw: MacAddress::NULL,
            state: NdState::Phantom,
            stamp: Instant::now(),
            is_router: false,
            router_lifetime: Duration::ZERO,
            probe_count: 0,
            pending: Vec::new(),
        }
    }
}

pub type NdEntryGuard = ArcMutexGuard<RawMutex, NdEntryState>;

#[derive(Debug, Default, Clone, Copy)]
pub struct NdCacheStats {
    pub phantom: usize,
    pub incomplete: usize,
    pub reachable: usize,
    pub stale: usize,
    pub delay: usize,
    pub probe: usize,
    pub routers: usize,
    pub evictions: u64,
}

struct Inner {
    index: FxHashMap<Key6, Index>,
    arena: Arena<(Key6, Arc<Mutex<NdEntryState>>)>,
    redirects: FxHashMap<Key6, Key6>,
}

pub struct NdCache {
    config: NdConfig,
    inner: RwLock<Inner>,
    entries: IntrusiveList,
    routers: IntrusiveList,
    delay: IntrusiveList,
    retrans: IntrusiveList,
    reachable: IntrusiveList,
    evictions: AtomicU64,
}

impl NdCache {
    #[must_use]
    pub fn new(config: NdConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner {
                index: FxHashMap::default(),
                arena: Arena::new(),
                redirects: FxHashMap::default(),
            }),
            entries: IntrusiveList::new(),
            routers: IntrusiveList::new(),
            delay: IntrusiveList::new(),
            retrans: IntrusiveList::new(),
            reachable: IntrusiveList::new(),
            evictions: AtomicU64::new(0),
        }
    }

    /// Finds or creates the entry for `ip`, returning it already locked. The
    /// cache's index lock is released before this returns.
    pub fn lookup_or_create(&self, ip: Key6) -> (Index, NdEntryGuard) {
        let mut inner = self.inner.write();
        self.evict_sweep(&mut inner);

        let idx = match inner.index.get(&ip) {
            Some(&idx) => idx,
            None => {
                let state = Arc::new(Mutex::new(NdEntryState::phantom()));
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

    pub fn lookup(&self, ip: Key6) -> Option<(Index, NdEntryGuard)> {
        let inner = self.inner.read();
        let idx = *inner.index.get(&ip)?;
        let arc = inner.arena.get(idx)?.1.clone();
        drop(inner);
        Some((idx, arc.lock_arc()))
    }

    pub fn lookup_valid_only(&self, ip: Key6) -> Option<(Index, NdEntryGuard)> {
        let (idx, guard) = self.lookup(ip)?;
        if guard.state == NdState::Phantom {
            None
        } else {
            Some((idx, guard))
        }
    }

    /// Looks an index snapshotted from one of the timer-sweep lists back up
    /// to its key and a locked guard. Returns `None` if the index was
    /// evicted between the snapshot and this call.
    pub fn get_by_index(&self, idx: Index) -> Option<(Key6, NdEntryGuard)> {
        let inner = self.inner.read();
        let (key, arc) = inner.arena.get(idx)?;
        let key = *key;
        let arc = arc.clone();
        drop(inner);
        Some((key, arc.lock_arc()))
    }

    pub fn touch(&self, idx: Index) {
        self.entries.move_to_back(idx);
    }

    /// See [`crate::arp::cache::ArpCache::is_live`].
    pub fn is_live(&self, idx: Index) -> bool {
        self.entries.contains(idx) && self.inner.read().arena.contains(idx)
    }

    /// Keeps `routers` membership in sync with a newly observed router flag
    /// and lifetime (§4.5's "routers = entries with is_router && lifetime>0").
    pub fn sync_router(&self, idx: Index, is_router: bool, lifetime: Duration) {
        if is_router && !lifetime.is_zero() {
            self.routers.push_back(idx);
        } else {
            self.routers.remove(idx);
        }
    }

    /// Keeps the per-state timer lists (`delay`/`retrans`/`reachable`) in
    /// sync with a state transition. STALE and PHANTOM carry no timer.
    pub fn sync_timers(&self, idx: Index, state: NdState) {
        self.delay.remove(idx);
        self.retrans.remove(idx);
        self.reachable.remove(idx);
        match state {
            NdState::Incomplete | NdState::Probe => {
                self.retrans.push_back(idx);
            }
            NdState::Delay => {
                self.delay.push_back(idx);
            }
            NdState::Reachable => {
                self.reachable.push_back(idx);
            }
            NdState::Stale | NdState::Phantom => {}
        }
    }

    pub fn routers_snapshot(&self) -> Vec<Index> {
        self.routers.snapshot()
    }

    pub fn delay_snapshot(&self) -> Vec<Index> {
        self.delay.snapshot()
    }

    pub fn retrans_snapshot(&self) -> Vec<Index> {
        self.retrans.snapshot()
    }

    pub fn reachable_snapshot(&self) -> Vec<Index> {
        self.reachable.snapshot()
    }

    /// Records a redirect from `from` to `to`, evicting a random entry first
    /// if the table is at `redirect_cap`.
    pub fn insert_redirect(&self, from: Key6, to: Key6) {
        let mut inner = self.inner.write();
        if !inner.redirects.contains_key(&from) && inner.redirects.len() >= self.config.redirect_cap
        {
            if let Some(victim) = inner
                .redirects
                .keys()
                .nth(rand::random::<usize>() % inner.redirects.len().max(1))
                .copied()
            {
                inner.redirects.remove(&victim);
            }
        }
        inner.redirects.insert(from, to);
    }

    /// Follows the redirect chain for `key` in place. Stops after at most
    /// 128 hops, on a missing entry, or on a self-loop.
    pub fn redirect(&self, key: &mut Key6) {
        let inner = self.inner.read();
        for _ in 0..128 {
            let Some(&next) = inner.redirects.get(key) else {
                break;
            };
            if next == *key {
                break;
            }
            *key = next;
        }
    }

    pub fn stats(&self) -> NdCacheStats {
        let inner = self.inner.read();
        let mut stats = NdCacheStats {
            evictions: self.evictions.load(Ordering::Relaxed),
            routers: self.routers.len(),
            ..Default::default()
        };
        for (_, (_, arc)) in inner.arena.iter() {
            match arc.lock().state {
                NdState::Phantom => stats.phantom += 1,
                NdState::Incomplete => stats.incomplete += 1,
                NdState::Reachable => stats.reachable += 1,
                NdState::Stale => stats.stale += 1,
                NdState::Delay => stats.delay += 1,
                NdState::Probe => stats.probe += 1,
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

    pub fn config(&self) -> &NdConfig {
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
                over_cap || guard.state == NdState::Phantom
            };
            if !should_evict {
                break;
            }
            self.entries.remove(front);
            self.routers.remove(front);
            self.delay.remove(front);
            self.retrans.remove(front);
            self.reachable.remove(front);
            inner.arena.remove(front);
            inner.index.remove(&ip);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    fn addr(s: &str) -> Key6 {
        Key6::from(s.parse::<Ipv6Addr>().unwrap())
    }

    fn cache() -> NdCache {
        NdCache::new(NdConfig {
            max_size: 2,
            ..NdConfig::default()
        })
    }

    #[test]
    fn new_entry_is_phantom() {
        let cache = cache();
        let (_idx, guard) = cache.lookup_or_create(addr("2001:db8::1"));
        assert_eq!(guard.state, NdState::Phantom);
    }

    #[test]
    fn router_sync_tracks_membership() {
        let cache = cache();
        let (idx, _guard) = cache.lookup_or_create(addr("fe80::1"));
        cache.sync_router(idx, true, Duration::from_secs(1800));
        assert_eq!(cache.routers_snapshot(), vec![idx]);
        cache.sync_router(idx, true, Duration::ZERO);
        assert!(cache.routers_snapshot().is_empty());
    }

    #[test]
    fn timer_sync_moves_between_lists() {
        let cache = cache();
        let (idx, _guard) = cache.lookup_or_create(addr("2001:db8::2"));
        cache.sync_timers(idx, NdState::Delay);
        assert_eq!(cache.delay_snapshot(), vec![idx]);
        cache.sync_timers(idx, NdState::Probe);
        assert!(cache.delay_snapshot().is_empty());
        assert_eq!(cache.retrans_snapshot(), vec![idx]);
    }

    #[test]
    fn redirect_chain_follows_to_end() {
        let cache = cache();
        let a = addr("2001:db8::a");
        let b = addr("2001:db8::b");
        let c = addr("2001:db8::c");
        cache.insert_redirect(a, b);
        cache.insert_redirect(b, c);
        let mut key = a;
        cache.redirect(&mut key);
        assert_eq!(key, c);
    }

    #[test]
    fn redirect_self_loop_stops() {
        let cache = cache();
        let a = addr("2001:db8::a");
        cache.insert_redirect(a, a);
        let mut key = a;
        cache.redirect(&mut key);
        assert_eq!(key, a);
    }

    #[test]
    fn eviction_caps_size() {
        let cache = cache();
        for i in 0..5u8 {
            let addr = Key6 {
                hi: 0x2001_0db8_0000_0000,
                lo: u64::from(i),
            };
            cache.lookup_or_create(addr);
        }
        assert!(cache.len() <= 2);
        assert!(cache.stats().evictions > 0);
    }
}
