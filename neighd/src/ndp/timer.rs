//! The IPv6 timer sweep (§4.6): periodic aging of the `delay`/`retrans`/
//! `reachable` lists, run from a real OS thread (§5's "no event loop").

use std::time::{Duration, Instant};

use tracing::trace;

use super::cache::{NdCache, NdState};
use super::NdStateMachine;
use crate::host::Host;
use crate::output::PacketOutput;

/// Cadence at which the sweep walks the timer lists. Chosen at the low end
/// of the spec's suggested 250-1000ms range to keep PROBE's 1s retransmit
/// spacing resolvable with low jitter.
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(250);

/// One pass over the timer lists. Exposed standalone (not just via
/// [`crate::engine`]) so a caller driving its own thread/executor can
/// invoke it on whatever schedule it likes.
pub fn sweep_once(cache: &NdCache, host: &Host, output: &dyn PacketOutput) {
    let sm = NdStateMachine::new(cache, host);
    sweep_reachable(cache);
    sweep_delay(cache, &sm, output);
    sweep_retrans(cache, &sm, output);
}

/// REACHABLE entries older than the host's current reachable-time budget
/// age into STALE without sending anything.
fn sweep_reachable(cache: &NdCache) {
    for idx in cache.reachable_snapshot() {
        let Some((_, mut guard)) = cache.get_by_index(idx) else {
            continue;
        };
        if guard.state != NdState::Reachable {
            continue;
        }
        if guard.stamp.elapsed() > cache.config().reachable_time {
            guard.state = NdState::Stale;
            drop(guard);
            cache.sync_timers(idx, NdState::Stale);
        }
    }
}

/// DELAY entries that have waited `delay_first_probe_time` move to PROBE
/// and send their first unicast probe.
fn sweep_delay(cache: &NdCache, sm: &NdStateMachine<'_>, output: &dyn PacketOutput) {
    for idx in cache.delay_snapshot() {
        let Some((key, mut guard)) = cache.get_by_index(idx) else {
            continue;
        };
        if guard.state != NdState::Delay {
            continue;
        }
        if guard.stamp.elapsed() < cache.config().delay_first_probe_time {
            continue;
        }
        guard.state = NdState::Probe;
        guard.stamp = Instant::now();
        guard.probe_count = 1;
        let hw = guard.hw;
        drop(guard);
        cache.sync_timers(idx, NdState::Probe);
        trace!(ip = %std::net::Ipv6Addr::from(key), "delay elapsed, probing");
        sm.unicast_solicit(key, hw, output);
    }
}

/// INCOMPLETE/PROBE entries retransmit on `retrans_timer` up to
/// `max_unicast_solicit` times, then drop to PHANTOM and discard whatever
/// was still queued.
fn sweep_retrans(cache: &NdCache, sm: &NdStateMachine<'_>, output: &dyn PacketOutput) {
    for idx in cache.retrans_snapshot() {
        let Some((key, mut guard)) = cache.get_by_index(idx) else {
            continue;
        };
        if !matches!(guard.state, NdState::Incomplete | NdState::Probe) {
            continue;
        }
        if guard.stamp.elapsed() < cache.config().retrans_timer {
            continue;
        }
        if guard.probe_count >= cache.config().max_unicast_solicit {
            guard.state = NdState::Phantom;
            let pending = std::mem::take(&mut guard.pending);
            drop(guard);
            cache.sync_timers(idx, NdState::Phantom);
            cache.sync_router(idx, false, Duration::ZERO);
            if !pending.is_empty() {
                trace!(
                    ip = %std::net::Ipv6Addr::from(key),
                    n = pending.len(),
                    "unicast solicit exhausted, dropping pending frames"
                );
            }
            continue;
        }
        guard.probe_count += 1;
        guard.stamp = Instant::now();
        let hw = guard.hw;
        let probing = guard.state == NdState::Probe;
        drop(guard);
        if probing {
            sm.unicast_solicit(key, hw, output);
        } else {
            sm.multicast_solicit(key, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostConfig, LocalV6, NdConfig};
    use crate::key::Key6;
    use std::net::Ipv6Addr;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<Vec<u8>>>);
    impl PacketOutput for Recorder {
        fn write(&self, bytes: &[u8]) -> crate::error::CoreResult<()> {
            self.0.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }
    }

    fn host() -> Host {
        let mut config = HostConfig::default();
        config.v6_addrs.push(LocalV6 {
            addr: Key6::from("2001:db8::1".parse::<Ipv6Addr>().unwrap()),
            prefix_len: 64,
        });
        Host::new(&config)
    }

    #[test]
    fn reachable_ages_to_stale() {
        let host = host();
        let cache = NdCache::new(NdConfig {
            reachable_time: Duration::ZERO,
            ..NdConfig::default()
        });
        let out = Recorder(Mutex::new(Vec::new()));
        let target = Key6::from("fe80::5".parse::<Ipv6Addr>().unwrap());
        let (idx, mut guard) = cache.lookup_or_create(target);
        guard.state = NdState::Reachable;
        drop(guard);
        cache.sync_timers(idx, NdState::Reachable);

        sweep_once(&cache, &host, &out);

        let (_idx, guard) = cache.lookup_or_create(target);
        assert_eq!(guard.state, NdState::Stale);
    }

    #[test]
    fn delay_moves_to_probe_after_timeout() {
        let host = host();
        let cache = NdCache::new(NdConfig {
            delay_first_probe_time: Duration::ZERO,
            ..NdConfig::default()
        });
        let out = Recorder(Mutex::new(Vec::new()));
        let target = Key6::from("fe80::6".parse::<Ipv6Addr>().unwrap());
        let (idx, mut guard) = cache.lookup_or_create(target);
        guard.state = NdState::Delay;
        drop(guard);
        cache.sync_timers(idx, NdState::Delay);

        sweep_once(&cache, &host, &out);

        let (_idx, guard) = cache.lookup_or_create(target);
        assert_eq!(guard.state, NdState::Probe);
        assert_eq!(out.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn retrans_exhausts_to_phantom() {
        let host = host();
        let cache = NdCache::new(NdConfig {
            retrans_timer: Duration::ZERO,
            max_unicast_solicit: 1,
            ..NdConfig::default()
        });
        let out = Recorder(Mutex::new(Vec::new()));
        let target = Key6::from("fe80::7".parse::<Ipv6Addr>().unwrap());
        let (idx, mut guard) = cache.lookup_or_create(target);
        guard.state = NdState::Incomplete;
        guard.probe_count = 1;
        drop(guard);
        cache.sync_timers(idx, NdState::Incomplete);

        sweep_once(&cache, &host, &out);

        let (_idx, guard) = cache.lookup_or_create(target);
        assert_eq!(guard.state, NdState::Phantom);
    }
}
