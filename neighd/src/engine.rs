//! The real-thread driver: the IPv6 timer sweep, the ARP cache's analogous
//! staleness sweep (§4.6), and a bounded worker pool that unifies the
//! v4-inline/v6-concurrent send asymmetry flagged in Design Note 9(c) into a
//! single dispatch path for both families.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::trace;

use crate::arp::cache::ArpCache;
use crate::error::CoreResult;
use crate::host::Host;
use crate::ndp::cache::NdCache;
use crate::ndp::timer::{self, SWEEP_INTERVAL};
use crate::output::PacketOutput;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A [`PacketOutput`] that hands each write off to [`Engine`]'s worker pool
/// instead of blocking the caller. Grounded on Design Note 9(c): the
/// original dispatched drained pending queues concurrently for IPv6 but
/// inline for IPv4; wrapping the single `OutputPort` seam in this decorator
/// gives both families the same bounded-pool behavior without the state
/// machines needing to know about threading at all.
pub struct PooledOutput {
    inner: Arc<dyn PacketOutput>,
    sender: Sender<Job>,
}

impl PacketOutput for PooledOutput {
    fn write(&self, bytes: &[u8]) -> CoreResult<()> {
        let inner = self.inner.clone();
        let bytes = bytes.to_vec();
        // Fire-and-forget: a worker thread performs the blocking write.
        // Per-frame errors are already logged at the call sites that drain
        // pending queues (§7 "interior errors ... are per-frame"); here we
        // only have a channel send to fail, which can't happen while the
        // pool's receiver thread is alive.
        let _ = self.sender.send(Box::new(move || {
            if let Err(err) = inner.write(&bytes) {
                tracing::warn!(%err, "pooled write failed");
            }
        }));
        Ok(())
    }
}

struct SweepHandle {
    stop: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

/// Owns the worker pool and any periodic sweep threads spawned against it.
/// Dropping or calling [`Engine::shutdown`] stops the sweeps; per §5
/// "Cancellation", in-flight writes are not cancelled, only the periodic
/// drivers are told to stop scheduling new work.
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Engine {
    sender: Sender<Job>,
    worker_stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    sweeps: Vec<SweepHandle>,
}

impl Engine {
    /// Spawns `worker_count` threads servicing the shared job queue.
    ///
    /// Workers poll with a timeout and check `worker_stop` rather than
    /// relying on every `Sender` clone being dropped — a [`PooledOutput`]
    /// handed out to a caller can outlive the `Engine` it came from, so
    /// channel disconnection alone would never fire and `shutdown` would
    /// block forever.
    #[must_use]
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(parking_lot::Mutex::new(receiver));
        let worker_stop = Arc::new(AtomicBool::new(false));
        let workers = (0..worker_count)
            .map(|id| {
                let receiver = receiver.clone();
                let stop = worker_stop.clone();
                thread::Builder::new()
                    .name(format!("neighd-worker-{id}"))
                    .spawn(move || loop {
                        let job = receiver.lock().recv_timeout(WORKER_POLL_INTERVAL);
                        match job {
                            Ok(job) => job(),
                            Err(mpsc::RecvTimeoutError::Timeout) => {
                                if stop.load(Ordering::Relaxed) {
                                    break;
                                }
                            }
                            Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        }
                    })
                    .expect("failed to spawn neighd worker thread")
            })
            .collect();
        Self { sender, worker_stop, workers, sweeps: Vec::new() }
    }

    /// Wraps `output` so writes through it are dispatched to the pool.
    #[must_use]
    pub fn pooled_output(&self, output: Arc<dyn PacketOutput>) -> PooledOutput {
        PooledOutput { inner: output, sender: self.sender.clone() }
    }

    /// Starts the IPv6 timer sweep (§4.6) on [`SWEEP_INTERVAL`] cadence.
    pub fn spawn_nd_sweep(&mut self, cache: Arc<NdCache>, host: Arc<Host>, output: Arc<dyn PacketOutput>) {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let join = thread::Builder::new()
            .name("neighd-nd-sweep".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    timer::sweep_once(&cache, &host, output.as_ref());
                    thread::sleep(SWEEP_INTERVAL);
                }
            })
            .expect("failed to spawn nd sweep thread");
        self.sweeps.push(SweepHandle { stop, join });
    }

    /// Starts the ARP cache's "analogous, simpler sweep" (§4.6): entries
    /// past `timeout + soft_timeout_diff` are flagged stale rather than
    /// evicted, so the next `ResolutionV4` call re-solicits instead of
    /// trusting the cached hardware address silently.
    pub fn spawn_arp_sweep(&mut self, cache: Arc<ArpCache>) {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let join = thread::Builder::new()
            .name("neighd-arp-sweep".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    arp_stale_sweep(&cache);
                    thread::sleep(SWEEP_INTERVAL);
                }
            })
            .expect("failed to spawn arp sweep thread");
        self.sweeps.push(SweepHandle { stop, join });
    }

    /// Signals every spawned sweep thread to stop and waits for them to
    /// exit, then signals the worker pool and waits for it too. Workers
    /// drain whatever is already queued before checking the stop flag, so
    /// in-flight writes are not dropped — only no new work is scheduled
    /// after this returns.
    pub fn shutdown(self) {
        for sweep in self.sweeps {
            sweep.stop.store(true, Ordering::Relaxed);
            let _ = sweep.join.join();
        }
        self.worker_stop.store(true, Ordering::Relaxed);
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

fn arp_stale_sweep(cache: &ArpCache) {
    let deadline = cache.config().timeout + cache.config().soft_timeout_diff;
    for idx in cache.entries_snapshot() {
        let Some((ip, mut guard)) = cache.get_by_index(idx) else {
            continue;
        };
        if guard.state == crate::arp::cache::ArpState::Complete
            && !guard.stale_flag
            && guard.stamp.elapsed() > deadline
        {
            trace!(ip = %std::net::Ipv4Addr::from(ip), "flagging arp entry stale");
            guard.stale_flag = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arp::cache::ArpState;
    use crate::config::ArpConfig;
    use crate::key::Key4;
    use std::net::Ipv4Addr;
    use std::sync::mpsc::sync_channel;
    use std::time::Duration as StdDuration;

    struct Recorder(std::sync::mpsc::SyncSender<Vec<u8>>);
    impl PacketOutput for Recorder {
        fn write(&self, bytes: &[u8]) -> CoreResult<()> {
            let _ = self.0.send(bytes.to_vec());
            Ok(())
        }
    }

    #[test]
    fn pooled_output_dispatches_write_off_thread() {
        let engine = Engine::new(1);
        let (tx, rx) = sync_channel(1);
        let pooled = engine.pooled_output(Arc::new(Recorder(tx)));
        pooled.write(&[1, 2, 3]).unwrap();
        let received = rx.recv_timeout(StdDuration::from_secs(1)).unwrap();
        assert_eq!(received, vec![1, 2, 3]);
        engine.shutdown();
    }

    #[test]
    fn arp_stale_sweep_flags_old_complete_entries() {
        let cache = ArpCache::new(ArpConfig {
            timeout: Duration::from_millis(1),
            soft_timeout_diff: Duration::from_millis(1),
            ..ArpConfig::default()
        });
        let ip = Key4::from(Ipv4Addr::new(10, 0, 0, 9));
        let (_idx, mut guard) = cache.lookup_or_create(ip);
        guard.state = ArpState::Complete;
        guard.stamp = std::time::Instant::now() - Duration::from_millis(10);
        drop(guard);

        arp_stale_sweep(&cache);

        // `lookup`, unlike `lookup_or_create`, never runs the eviction
        // sweep, so it can't race the staleness flag being checked here.
        let (_idx, guard) = cache.lookup(ip).unwrap();
        assert!(guard.stale_flag);
    }
}
