//! IPv6 neighbor discovery (§4.5): NS/NA/RA/Redirect reception and outbound
//! resolution, per RFC 4861.

pub mod cache;
pub mod timer;

use std::net::Ipv6Addr;
use std::time::{Duration, Instant};

use bytepack::ToBytestream;
use neigh_wire::icmpv6::{
    IcmpV6NDPOption, IcmpV6NeighborAdvertisment, IcmpV6NeighborSolicitation, IcmpV6Packet,
    IcmpV6Redirect, IcmpV6RouterAdvertisement, PROTO_ICMPV6,
};
use neigh_wire::ip::{Ipv6Packet, ETHERTYPE_IPV6};
use neigh_wire::mac::MacAddress;
use tracing::warn;

use crate::host::Host;
use crate::key::Key6;
use crate::output::{drain_pending, send_one, PacketOutput};

pub use cache::{NdCache, NdCacheStats, NdEntryGuard, NdState};

fn source_link_layer(options: &[IcmpV6NDPOption]) -> Option<MacAddress> {
    options.iter().find_map(|o| match o {
        IcmpV6NDPOption::SourceLinkLayerAddress(mac) => Some(*mac),
        _ => None,
    })
}

fn target_link_layer(options: &[IcmpV6NDPOption]) -> Option<MacAddress> {
    options.iter().find_map(|o| match o {
        IcmpV6NDPOption::TargetLinkLayerAddress(mac) => Some(*mac),
        _ => None,
    })
}

/// RFC 4861 §7.1's per-message-type validation beyond the generic hop-limit
/// check: target-address-not-multicast for NS/NA, the NS "unspecified source
/// implies solicited-node multicast destination" rule, the NA "multicast
/// destination implies Solicited clear" rule, and the RA "source must be
/// link-local" rule. ICMP Code is always 0 on the wire types this crate
/// decodes, so that check has nothing to validate.
fn reception_violation(src_ip: Ipv6Addr, dst_ip: Ipv6Addr, pkt: &IcmpV6Packet) -> Option<&'static str> {
    let src = Key6::from(src_ip);
    let dst = Key6::from(dst_ip);
    match pkt {
        IcmpV6Packet::NeighborSolicitation(ns) => {
            let target = Key6::from(ns.target);
            if target.is_multicast() {
                return Some("multicast target in neighbor solicitation");
            }
            if src.is_unspecified() && dst != target.solicited_node() {
                return Some("unspecified source without solicited-node multicast destination");
            }
            None
        }
        IcmpV6Packet::NeighborAdvertisment(na) => {
            let target = Key6::from(na.target);
            if target.is_multicast() {
                return Some("multicast target in neighbor advertisement");
            }
            if dst.is_multicast() && na.solicited {
                return Some("solicited flag set with multicast destination");
            }
            None
        }
        IcmpV6Packet::RouterAdvertisment(_) => {
            if !src.is_link_local() {
                return Some("router advertisement from non-link-local source");
            }
            None
        }
        _ => None,
    }
}

pub struct NdStateMachine<'a> {
    pub cache: &'a NdCache,
    pub host: &'a Host,
}

impl<'a> NdStateMachine<'a> {
    pub fn new(cache: &'a NdCache, host: &'a Host) -> Self {
        Self { cache, host }
    }

    /// Dispatches an inbound ICMPv6 message relevant to neighbor discovery.
    /// `sh` is the Ethernet source the frame arrived with; `hop_limit` and
    /// `dst_ip` come off the carrying IPv6 header. RFC 4861 §7.1's reception
    /// checks run first — a message failing them is dropped with a warning,
    /// never handed to a handler (§7's "parsing errors are swallowed").
    pub fn on_inbound(
        &self,
        sh: MacAddress,
        src_ip: Ipv6Addr,
        dst_ip: Ipv6Addr,
        hop_limit: u8,
        pkt: &IcmpV6Packet,
        output: &dyn PacketOutput,
    ) {
        if hop_limit != 255 {
            warn!(hop_limit, "dropping ndp message with non-255 hop limit");
            return;
        }
        if let Some(reason) = reception_violation(src_ip, dst_ip, pkt) {
            warn!(reason, %src_ip, %dst_ip, "dropping ndp message failing reception checks");
            return;
        }
        match pkt {
            IcmpV6Packet::NeighborSolicitation(ns) => self.on_ns(sh, src_ip, ns, output),
            IcmpV6Packet::NeighborAdvertisment(na) => self.on_na(na, output),
            IcmpV6Packet::RouterAdvertisment(ra) => self.on_ra(sh, src_ip, ra),
            IcmpV6Packet::Redirect(rd) => self.on_redirect(src_ip, rd),
            _ => {}
        }
    }

    fn on_ns(
        &self,
        sh: MacAddress,
        src_ip: Ipv6Addr,
        ns: &IcmpV6NeighborSolicitation,
        output: &dyn PacketOutput,
    ) {
        let src = Key6::from(src_ip);

        if !src.is_unspecified() {
            let hw = source_link_layer(&ns.options).unwrap_or(sh);
            self.learn(src, hw, output);
        }

        let target = Key6::from(ns.target);
        if src.is_unspecified() || !self.host.addresses.is_local_v6(target) {
            return;
        }

        let na = IcmpV6Packet::NeighborAdvertisment(IcmpV6NeighborAdvertisment {
            target: ns.target,
            router: false,
            solicited: true,
            overide: true,
            options: vec![IcmpV6NDPOption::TargetLinkLayerAddress(self.host.local_mac)],
        });
        self.send_icmpv6(ns.target, src_ip, sh, na, output);
    }

    /// Records link-layer info learned passively (NS source, redirect
    /// target), transitioning a fresh entry straight to STALE and draining
    /// anything queued while it was INCOMPLETE.
    fn learn(&self, ip: Key6, hw: MacAddress, output: &dyn PacketOutput) {
        let (idx, mut guard) = self.cache.lookup_or_create(ip);
        let was_incomplete = guard.state == NdState::Incomplete;
        guard.hw = hw;
        guard.stamp = Instant::now();
        guard.state = NdState::Stale;
        let pending = std::mem::take(&mut guard.pending);
        drop(guard);
        self.cache.touch(idx);
        self.cache.sync_timers(idx, NdState::Stale);
        if was_incomplete && !pending.is_empty() {
            drain_pending(output, hw, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV6, pending);
        }
    }

    /// RFC 4861 §7.2.5: an NA with no existing cache entry is ignored.
    fn on_na(&self, na: &IcmpV6NeighborAdvertisment, output: &dyn PacketOutput) {
        let target = Key6::from(na.target);
        let Some((idx, mut guard)) = self.cache.lookup_valid_only(target) else {
            return;
        };
        let new_hw = target_link_layer(&na.options);

        if guard.state == NdState::Incomplete {
            if let Some(hw) = new_hw {
                guard.hw = hw;
            }
            guard.state = if na.solicited { NdState::Reachable } else { NdState::Stale };
            guard.stamp = Instant::now();
            guard.probe_count = 0;
            let hw = guard.hw;
            let new_state = guard.state;
            let pending = std::mem::take(&mut guard.pending);
            drop(guard);
            self.cache.touch(idx);
            self.cache.sync_timers(idx, new_state);
            if !pending.is_empty() {
                drain_pending(output, hw, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV6, pending);
            }
            return;
        }

        let hw_differs = new_hw.is_some_and(|hw| hw != guard.hw);
        if !na.overide && hw_differs {
            if guard.state == NdState::Reachable {
                guard.state = NdState::Stale;
                let new_state = guard.state;
                drop(guard);
                self.cache.sync_timers(idx, new_state);
            }
            return;
        }

        if let Some(hw) = new_hw {
            guard.hw = hw;
        }
        if na.solicited {
            guard.state = NdState::Reachable;
            guard.stamp = Instant::now();
            guard.probe_count = 0;
        } else if hw_differs {
            guard.state = NdState::Stale;
        }
        guard.is_router = na.router;
        let lifetime = guard.router_lifetime;
        let new_state = guard.state;
        drop(guard);
        self.cache.sync_timers(idx, new_state);
        self.cache.sync_router(idx, na.router, lifetime);
    }

    fn on_ra(&self, sh: MacAddress, src_ip: Ipv6Addr, ra: &IcmpV6RouterAdvertisement) {
        let src = Key6::from(src_ip);
        let (idx, mut guard) = self.cache.lookup_or_create(src);
        if guard.state == NdState::Phantom {
            guard.state = NdState::Stale;
        }
        guard.hw = source_link_layer(&ra.options).unwrap_or(sh);
        guard.is_router = true;
        guard.router_lifetime = Duration::from_secs(u64::from(ra.router_lifetime));
        guard.stamp = Instant::now();
        let new_state = guard.state;
        let lifetime = guard.router_lifetime;
        drop(guard);
        self.cache.touch(idx);
        self.cache.sync_timers(idx, new_state);
        self.cache.sync_router(idx, true, lifetime);

        if ra.current_hop_limit != 0 {
            self.host.set_cur_hop_limit(ra.current_hop_limit);
        }
        if ra.retransmit_time != 0 {
            self.host.set_retrans_timer(Duration::from_millis(u64::from(ra.retransmit_time)));
        }
        if ra.reachable_time != 0 {
            self.host.set_base_reachable_time(Duration::from_millis(u64::from(ra.reachable_time)));
        }
        for option in &ra.options {
            match option {
                IcmpV6NDPOption::Mtu(mtu) => self.host.set_mtu(mtu.mtu),
                IcmpV6NDPOption::PrefixInformation(info) => {
                    self.host.addresses.update_prefix(
                        info.prefix(),
                        Duration::from_secs(u64::from(info.valid_lifetime)),
                        info.on_link,
                        info.autonomous_address_configuration,
                    );
                }
                _ => {}
            }
        }
    }

    /// Accepts a redirect only from a sender already known as a router
    /// (§8.1's "redirects only trusted from the current default router").
    fn on_redirect(&self, src_ip: Ipv6Addr, rd: &IcmpV6Redirect) {
        let src = Key6::from(src_ip);
        if self.cache.lookup_valid_only(src).map_or(true, |(_, g)| !g.is_router) {
            return;
        }
        let target = Key6::from(rd.target);
        let destination = Key6::from(rd.destination);
        self.cache.insert_redirect(destination, target);

        if target != destination {
            if let Some(hw) = target_link_layer(&rd.options) {
                let (idx, mut guard) = self.cache.lookup_or_create(target);
                if guard.state == NdState::Phantom {
                    guard.hw = hw;
                    guard.state = NdState::Stale;
                    drop(guard);
                    self.cache.sync_timers(idx, NdState::Stale);
                }
            }
        }
    }

    /// Outbound resolution for an IPv6 destination (§4.5 ResolutionV6).
    /// `payload` is an already-serialized IPv6 datagram. Fails with
    /// [`crate::error::CoreError::NoGateway`] when `dest` is off-link and no
    /// default router is known.
    pub fn resolve(
        &self,
        dest: Key6,
        payload: Vec<u8>,
        output: &dyn PacketOutput,
    ) -> Result<(), crate::error::CoreError> {
        if dest.is_multicast() {
            let mac = MacAddress::ipv6_multicast(Ipv6Addr::from(dest));
            let _ = send_one(output, mac, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV6, &payload);
            return Ok(());
        }

        let mut next_hop = if self.host.addresses.is_on_link(dest) {
            dest
        } else {
            let router = self
                .cache
                .routers_snapshot()
                .first()
                .and_then(|&idx| self.cache.get_by_index(idx).map(|(k, _)| k));
            let Some(router) = router else {
                warn!(ip = %Ipv6Addr::from(dest), "no default router for off-link destination");
                return Err(crate::error::CoreError::NoGateway);
            };
            router
        };
        self.cache.redirect(&mut next_hop);

        let (idx, mut guard) = self.cache.lookup_or_create(next_hop);
        match guard.state {
            NdState::Phantom => {
                guard.state = NdState::Incomplete;
                guard.stamp = Instant::now();
                guard.probe_count = 0;
                guard.pending.push(payload);
                drop(guard);
                self.cache.touch(idx);
                self.cache.sync_timers(idx, NdState::Incomplete);
                self.emit_ns(next_hop, output);
            }
            NdState::Incomplete | NdState::Probe => {
                guard.pending.push(payload);
            }
            NdState::Stale => {
                let hw = guard.hw;
                guard.state = NdState::Delay;
                guard.stamp = Instant::now();
                drop(guard);
                self.cache.sync_timers(idx, NdState::Delay);
                let _ = send_one(output, hw, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV6, &payload);
            }
            NdState::Delay | NdState::Reachable => {
                let hw = guard.hw;
                drop(guard);
                let _ = send_one(output, hw, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV6, &payload);
            }
        }
        Ok(())
    }

    fn emit_ns(&self, target: Key6, output: &dyn PacketOutput) {
        self.multicast_solicit(target, output);
    }

    /// Sends a multicast NS to `target`'s solicited-node address. Used both
    /// for the initial PHANTOM->INCOMPLETE solicitation and INCOMPLETE's
    /// retransmits (§4.6).
    pub(crate) fn multicast_solicit(&self, target: Key6, output: &dyn PacketOutput) {
        let Some(src) = self.host.addresses.any_v6() else {
            warn!("no local ipv6 address configured, cannot solicit");
            return;
        };
        let dest_ip = Ipv6Addr::from(target.solicited_node());
        let dest_mac = MacAddress::ipv6_multicast(dest_ip);
        self.send_ns(target, src, dest_ip, dest_mac, output);
    }

    /// Sends a unicast NS directly to `hw`. Used for PROBE's retransmits
    /// once a link-layer address is already known (§4.6).
    pub(crate) fn unicast_solicit(&self, target: Key6, hw: MacAddress, output: &dyn PacketOutput) {
        let Some(src) = self.host.addresses.any_v6() else {
            warn!("no local ipv6 address configured, cannot solicit");
            return;
        };
        self.send_ns(target, src, Ipv6Addr::from(target), hw, output);
    }

    fn send_ns(&self, target: Key6, src: Key6, dest_ip: Ipv6Addr, dest_mac: MacAddress, output: &dyn PacketOutput) {
        let ns = IcmpV6Packet::NeighborSolicitation(IcmpV6NeighborSolicitation {
            target: Ipv6Addr::from(target),
            options: vec![IcmpV6NDPOption::SourceLinkLayerAddress(self.host.local_mac)],
        });
        self.send_icmpv6(Ipv6Addr::from(src), dest_ip, dest_mac, ns, output);
    }

    /// Wraps an ICMPv6 message in an IPv6 header (hop limit 255, per RFC
    /// 4861 §3's single-hop requirement) and frames it to Ethernet.
    fn send_icmpv6(
        &self,
        src: Ipv6Addr,
        dst: Ipv6Addr,
        dst_mac: MacAddress,
        msg: IcmpV6Packet,
        output: &dyn PacketOutput,
    ) {
        let body = match msg.to_vec() {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, "failed to encode icmpv6 message");
                return;
            }
        };
        let packet = Ipv6Packet {
            traffic_class: 0,
            flow_label: 0,
            next_header: PROTO_ICMPV6,
            hop_limit: 255,
            src,
            dest: dst,
            content: body,
        };
        match packet.to_vec() {
            Ok(bytes) => {
                let _ = send_one(output, dst_mac, self.host.local_mac, self.host.vlan, ETHERTYPE_IPV6, &bytes);
            }
            Err(err) => warn!(%err, "failed to encode ipv6 packet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostConfig, LocalV6};
    use neigh_wire::icmpv6::IcmpV6PrefixInformation;
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
        config.v6_addrs.push(LocalV6 {
            addr: Key6::from("2001:db8::1".parse::<Ipv6Addr>().unwrap()),
            prefix_len: 64,
        });
        Host::new(&config)
    }

    #[test]
    fn resolve_phantom_queues_and_solicits() {
        let host = host();
        let cache = NdCache::new(crate::config::NdConfig::default());
        let sm = NdStateMachine::new(&cache, &host);
        let out = Recorder(StdMutex::new(Vec::new()));
        let dest = Key6::from("2001:db8::5".parse::<Ipv6Addr>().unwrap());
        host.addresses.update_prefix(
            "2001:db8::/64".parse().unwrap(),
            Duration::from_secs(3600),
            true,
            false,
        );

        sm.resolve(dest, vec![1, 2, 3], &out).unwrap();

        let (_idx, guard) = cache.lookup_or_create(dest);
        assert_eq!(guard.state, NdState::Incomplete);
        assert_eq!(guard.pending.len(), 1);
        drop(guard);
        assert_eq!(out.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn na_completes_incomplete_entry_and_drains_queue() {
        let host = host();
        let cache = NdCache::new(crate::config::NdConfig::default());
        let sm = NdStateMachine::new(&cache, &host);
        let out = Recorder(StdMutex::new(Vec::new()));
        let target = Key6::from("fe80::5".parse::<Ipv6Addr>().unwrap());

        let (idx, mut guard) = cache.lookup_or_create(target);
        guard.state = NdState::Incomplete;
        guard.pending.push(vec![9, 9]);
        drop(guard);
        cache.sync_timers(idx, NdState::Incomplete);

        let na = IcmpV6NeighborAdvertisment {
            target: Ipv6Addr::from(target),
            router: false,
            solicited: true,
            overide: true,
            options: vec![IcmpV6NDPOption::TargetLinkLayerAddress(MacAddress::from([0xaa; 6]))],
        };
        sm.on_na(&na, &out);

        let (_idx, guard) = cache.lookup_or_create(target);
        assert_eq!(guard.state, NdState::Reachable);
        assert_eq!(guard.hw, MacAddress::from([0xaa; 6]));
        drop(guard);
        assert_eq!(out.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn ra_installs_prefix_and_router() {
        let host = host();
        let cache = NdCache::new(crate::config::NdConfig::default());
        let sm = NdStateMachine::new(&cache, &host);
        let router_ip = "fe80::1".parse::<Ipv6Addr>().unwrap();

        let ra = IcmpV6RouterAdvertisement {
            current_hop_limit: 64,
            managed: false,
            other_configuration: false,
            router_lifetime: 1800,
            reachable_time: 30_000,
            retransmit_time: 1_000,
            options: vec![IcmpV6NDPOption::PrefixInformation(
                neigh_wire::icmpv6::IcmpV6PrefixInformation {
                    prefix_len: 64,
                    on_link: true,
                    autonomous_address_configuration: false,
                    valid_lifetime: 3600,
                    preferred_lifetime: 1800,
                    prefix: "2001:db8::".parse().unwrap(),
                },
            )],
        };
        sm.on_ra(MacAddress::from([1; 6]), router_ip, &ra);

        assert!(host.addresses.is_on_link(Key6::from("2001:db8::42".parse::<Ipv6Addr>().unwrap())));
        assert_eq!(cache.routers_snapshot().len(), 1);
    }

    #[test]
    fn resolve_off_link_without_router_fails_with_no_gateway() {
        let host = host();
        let cache = NdCache::new(crate::config::NdConfig::default());
        let sm = NdStateMachine::new(&cache, &host);
        let out = Recorder(StdMutex::new(Vec::new()));
        let dest = Key6::from("2001:db9::1".parse::<Ipv6Addr>().unwrap());

        let err = sm.resolve(dest, vec![1, 2, 3], &out).unwrap_err();

        assert!(matches!(err, crate::error::CoreError::NoGateway));
        assert!(out.0.lock().unwrap().is_empty());
    }

    #[test]
    fn on_inbound_drops_non_255_hop_limit() {
        let host = host();
        let cache = NdCache::new(crate::config::NdConfig::default());
        let sm = NdStateMachine::new(&cache, &host);
        let out = Recorder(StdMutex::new(Vec::new()));
        let target = Key6::from("2001:db8::1".parse::<Ipv6Addr>().unwrap());
        let ns = IcmpV6Packet::NeighborSolicitation(IcmpV6NeighborSolicitation {
            target: Ipv6Addr::from(target),
            options: Vec::new(),
        });

        sm.on_inbound(
            MacAddress::from([1; 6]),
            "2001:db8::5".parse().unwrap(),
            target.solicited_node().into(),
            64,
            &ns,
            &out,
        );

        assert!(cache.lookup(Key6::from("2001:db8::5".parse::<Ipv6Addr>().unwrap())).is_none());
    }

    #[test]
    fn on_inbound_accepts_valid_solicitation() {
        let host = host();
        let cache = NdCache::new(crate::config::NdConfig::default());
        let sm = NdStateMachine::new(&cache, &host);
        let out = Recorder(StdMutex::new(Vec::new()));
        let target = Key6::from("2001:db8::1".parse::<Ipv6Addr>().unwrap());
        let src: Ipv6Addr = "2001:db8::5".parse().unwrap();
        let ns = IcmpV6Packet::NeighborSolicitation(IcmpV6NeighborSolicitation {
            target: Ipv6Addr::from(target),
            options: vec![IcmpV6NDPOption::SourceLinkLayerAddress(MacAddress::from([2; 6]))],
        });

        sm.on_inbound(MacAddress::from([1; 6]), src, target.solicited_node().into(), 255, &ns, &out);

        assert!(cache.lookup(Key6::from(src)).is_some());
        assert_eq!(out.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn reception_violation_rejects_multicast_target() {
        let multicast_target: Ipv6Addr = "ff02::1".parse().unwrap();
        let ns = IcmpV6Packet::NeighborSolicitation(IcmpV6NeighborSolicitation {
            target: multicast_target,
            options: Vec::new(),
        });
        let violation = reception_violation("2001:db8::5".parse().unwrap(), "ff02::1:ff00:1".parse().unwrap(), &ns);
        assert!(violation.is_some());
    }

    #[test]
    fn reception_violation_rejects_unspecified_source_without_solicited_node_dst() {
        let target = Key6::from("2001:db8::1".parse::<Ipv6Addr>().unwrap());
        let ns = IcmpV6Packet::NeighborSolicitation(IcmpV6NeighborSolicitation {
            target: Ipv6Addr::from(target),
            options: Vec::new(),
        });
        let violation = reception_violation(
            Ipv6Addr::UNSPECIFIED,
            "2001:db8::1".parse().unwrap(),
            &ns,
        );
        assert!(violation.is_some());
    }

    #[test]
    fn reception_violation_rejects_solicited_na_to_multicast() {
        let target = Key6::from("2001:db8::1".parse::<Ipv6Addr>().unwrap());
        let na = IcmpV6Packet::NeighborAdvertisment(IcmpV6NeighborAdvertisment {
            target: Ipv6Addr::from(target),
            router: false,
            solicited: true,
            overide: false,
            options: Vec::new(),
        });
        let violation = reception_violation("2001:db8::1".parse().unwrap(), "ff02::1".parse().unwrap(), &na);
        assert!(violation.is_some());
    }

    #[test]
    fn reception_violation_rejects_non_link_local_ra_source() {
        let ra = IcmpV6Packet::RouterAdvertisment(IcmpV6RouterAdvertisement {
            current_hop_limit: 64,
            managed: false,
            other_configuration: false,
            router_lifetime: 1800,
            reachable_time: 0,
            retransmit_time: 0,
            options: Vec::new(),
        });
        let violation = reception_violation("2001:db8::1".parse().unwrap(), "ff02::1".parse().unwrap(), &ra);
        assert!(violation.is_some());
    }

    #[test]
    fn on_inbound_drops_ra_from_non_link_local_source() {
        let host = host();
        let cache = NdCache::new(crate::config::NdConfig::default());
        let sm = NdStateMachine::new(&cache, &host);
        let out = Recorder(StdMutex::new(Vec::new()));
        let ra = IcmpV6Packet::RouterAdvertisment(IcmpV6RouterAdvertisement {
            current_hop_limit: 64,
            managed: false,
            other_configuration: false,
            router_lifetime: 1800,
            reachable_time: 0,
            retransmit_time: 0,
            options: vec![IcmpV6NDPOption::PrefixInformation(IcmpV6PrefixInformation {
                prefix_len: 64,
                on_link: true,
                autonomous_address_configuration: false,
                valid_lifetime: 3600,
                preferred_lifetime: 1800,
                prefix: "2001:db8:1::".parse().unwrap(),
            })],
        });

        sm.on_inbound(
            MacAddress::from([1; 6]),
            "2001:db8::1".parse().unwrap(),
            "ff02::1".parse().unwrap(),
            255,
            &ra,
            &out,
        );

        assert!(!host.addresses.has_prefix("2001:db8:1::/64".parse().unwrap()));
        assert!(cache.routers_snapshot().is_empty());
    }
}
