//! IPv4 neighbor resolution (§4.3): ARP reception and outbound resolution.

pub mod cache;

use std::net::Ipv4Addr;
use std::time::Instant;

use bytepack::ToBytestream;
use neigh_wire::arp::{ArpPacket, ARPOperation, ETHERTYPE_ARP};
use neigh_wire::ip::ETHERTYPE_IPV4;
use neigh_wire::mac::MacAddress;
use tracing::{trace, warn};

use crate::host::Host;
use crate::key::Key4;
use crate::output::{drain_pending, send_one, PacketOutput};

pub use cache::{ArpCache, ArpEntryGuard, ArpState, CacheStats};

/// IPv4 multicast (224.0.0.0/4) to Ethernet mapping per RFC 1112: the low
/// 23 bits of the address go straight into `01:00:5e:xx:xx:xx`.
fn ipv4_multicast_mac(addr: Ipv4Addr) -> MacAddress {
    let o = addr.octets();
    MacAddress::from([0x01, 0x00, 0x5e, o[1] & 0x7f, o[2], o[3]])
}

pub struct ArpStateMachine<'a> {
    pub cache: &'a ArpCache,
    pub host: &'a Host,
}

impl<'a> ArpStateMachine<'a> {
    pub fn new(cache: &'a ArpCache, host: &'a Host) -> Self {
        Self { cache, host }
    }

    /// Handles an inbound ARP Request or Reply (§4.3).
    pub fn on_inbound(&self, pkt: &ArpPacket, output: &dyn PacketOutput) {
        if !pkt.is_ipv4_ethernet() {
            warn!("dropping non-ipv4-ethernet arp packet");
            return;
        }

        let sh = pkt.src_mac_addr();
        let sp = Key4::from(pkt.src_ipv4_addr());
        let tp = Key4::from(pkt.dest_ipv4_addr());

        if self.host.addresses.is_local_v4(sp) {
            warn!(ip = %Ipv4Addr::from(sp), "duplicate address indication, dropping");
            return;
        }

        let (idx, mut guard) = self.cache.lookup_or_create(sp);
        let was_phantom = guard.state == ArpState::Phantom;
        let tp_is_ours = self.host.addresses.is_local_v4(tp);

        if tp_is_ours || !was_phantom {
            guard.stamp = Instant::now();
            guard.hw = sh;
            guard.state = ArpState::Complete;
            guard.stale_flag = false;
            let pending = std::mem::take(&mut guard.pending);
            drop(guard);
            self.cache.touch(idx);
            if !pending.is_empty() {
                trace!(ip = %Ipv4Addr::from(sp), n = pending.len(), "draining pending arp queue");
                drain_pending(output, sh, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV4, pending);
            }
        } else {
            drop(guard);
        }

        if tp_is_ours && pkt.operation == ARPOperation::Request {
            let reply = pkt.into_response(self.host.local_mac);
            match reply.to_vec() {
                Ok(bytes) => {
                    let _ = send_one(output, sh, self.host.local_mac, self.host.vlan, ETHERTYPE_ARP, &bytes);
                }
                Err(err) => warn!(%err, "failed to encode arp reply"),
            }
        }
    }

    /// Outbound resolution for an IPv4 destination (§4.3 ResolutionV4).
    /// `payload` is an already-serialized IPv4 datagram.
    pub fn resolve(&self, dest: Key4, payload: Vec<u8>, output: &dyn PacketOutput) {
        if dest.is_broadcast() || self.host.addresses.is_broadcast_v4(dest) {
            let _ = send_one(output, MacAddress::BROADCAST, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV4, &payload);
            return;
        }
        if dest.is_multicast() {
            let mac = ipv4_multicast_mac(Ipv4Addr::from(dest));
            let _ = send_one(output, mac, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV4, &payload);
            return;
        }

        let (idx, mut guard) = self.cache.lookup_or_create(dest);
        match guard.state {
            ArpState::Phantom => {
                guard.state = ArpState::Incomplete;
                guard.stamp = Instant::now();
                guard.pending.push(payload);
                drop(guard);
                self.cache.touch(idx);
                self.emit_solicitation(dest, output);
            }
            ArpState::Incomplete => {
                guard.pending.push(payload);
            }
            ArpState::Complete => {
                let hw = guard.hw;
                let stamp = guard.stamp;
                let stale = guard.stale_flag;
                drop(guard);
                let cfg = self.cache.config();
                if stale || stamp.elapsed() > cfg.timeout + cfg.soft_timeout_diff {
                    self.emit_solicitation(dest, output);
                }
                let _ = send_one(output, hw, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV4, &payload);
            }
        }
    }

    fn emit_solicitation(&self, dest: Key4, output: &dyn PacketOutput) {
        let Some(src_addr) = self.any_local_v4() else {
            warn!("no local ipv4 address configured, cannot solicit");
            return;
        };
        let request = ArpPacket::new_v4_request(self.host.local_mac, src_addr, Ipv4Addr::from(dest));
        match request.to_vec() {
            Ok(bytes) => {
                let _ = send_one(output, MacAddress::BROADCAST, self.host.local_mac, self.host.vlan, ETHERTYPE_ARP, &bytes);
            }
            Err(err) => warn!(%err, "failed to encode arp request"),
        }
    }

    fn any_local_v4(&self) -> Option<Ipv4Addr> {
        self.host.addresses.any_v4().map(Ipv4Addr::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArpConfig, HostConfig, LocalV4};
    use std::net::Ipv4Addr;
    use std::sync::Mutex as StdMutex;

    struct Recorder(StdMutex<Vec<Vec<u8>>>);
    impl PacketOutput for Recorder {
        fn write(&self, bytes: &[u8]) -> crate::error::CoreResult<()> {
            self.0.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }
    }

    fn host() -> Host {
        let mut config = HostConfig::default();
        config.v4_addrs.push(LocalV4 {
            addr: Key4::from(Ipv4Addr::new(10, 0, 0, 1)),
            mask: Key4::from(Ipv4Addr::new(255, 255, 255, 0)),
            gateway: None,
        });
        Host::new(&config)
    }

    #[test]
    fn resolve_phantom_queues_and_solicits() {
        let host = host();
        let cache = ArpCache::new(ArpConfig::default());
        let sm = ArpStateMachine::new(&cache, &host);
        let out = Recorder(StdMutex::new(Vec::new()));
        let dest = Key4::from(Ipv4Addr::new(10, 0, 0, 5));

        sm.resolve(dest, vec![1, 2, 3], &out);

        let (_idx, guard) = cache.lookup_or_create(dest);
        assert_eq!(guard.state, ArpState::Incomplete);
        assert_eq!(guard.pending.len(), 1);
        drop(guard);
        assert_eq!(out.0.lock().unwrap().len(), 1); // only the solicitation
    }

    #[test]
    fn reply_completes_entry_and_drains_queue() {
        let host = host();
        let cache = ArpCache::new(ArpConfig::default());
        let sm = ArpStateMachine::new(&cache, &host);
        let out = Recorder(StdMutex::new(Vec::new()));
        let dest = Key4::from(Ipv4Addr::new(10, 0, 0, 5));

        sm.resolve(dest, vec![9, 9], &out);

        let reply = ArpPacket::new_v4_request(
            MacAddress::from([0xbb; 6]),
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(10, 0, 0, 1),
        )
        .into_response(host.local_mac);
        sm.on_inbound(&reply, &out);

        let (_idx, guard) = cache.lookup_or_create(dest);
        assert_eq!(guard.state, ArpState::Complete);
        assert_eq!(guard.hw, MacAddress::from([0xbb; 6]));
        drop(guard);
        assert_eq!(out.0.lock().unwrap().len(), 2); // solicitation + drained payload
    }
}
