//! Link-layer neighbor reachability for IPv4 (ARP, RFC 826) and IPv6
//! (Neighbor Discovery, RFC 4861) over an Ethernet/VLAN transport.
//!
//! This crate is the resolution core only: TAP I/O, wire (de)serialization,
//! and upper-layer socket notification are collaborator responsibilities
//! (see [`output::PacketOutput`] and [`icmp::Notifyable`]). An embedder
//! constructs a [`Resolver`], feeds it inbound frames, and hands it
//! outbound L3 payloads to resolve.

pub mod arp;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod icmp;
pub mod key;
pub mod list;
pub mod ndp;
pub mod output;

use std::net::{Ipv4Addr, Ipv6Addr};

use bytepack::FromBytestream;
use neigh_wire::arp::ArpPacket;
use neigh_wire::icmpv4::{IcmpPacket, PROTO_ICMP};
use neigh_wire::icmpv6::{IcmpV6Packet, PROTO_ICMPV6};
use neigh_wire::ip::{Ipv4Packet, Ipv6Packet};
use neigh_wire::mac::MacAddress;
use tracing::warn;

use arp::{ArpCache, ArpStateMachine};
use config::HostConfig;
use error::CoreError;
use host::Host;
use icmp::Notifyable;
use key::{Key4, Key6};
use ndp::{NdCache, NdStateMachine};
use output::PacketOutput;

/// Owns the caches and host state for one interface, and dispatches both
/// inbound reception and outbound resolution across the IPv4/IPv6 state
/// machines (§2's component overview).
pub struct Resolver {
    host: Host,
    arp_cache: ArpCache,
    nd_cache: NdCache,
}

impl Resolver {
    #[must_use]
    pub fn new(config: HostConfig) -> Self {
        let arp_cache = ArpCache::new(config.arp.clone());
        let nd_cache = NdCache::new(config.nd.clone());
        Self { host: Host::new(&config), arp_cache, nd_cache }
    }

    #[must_use]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[must_use]
    pub fn arp_cache(&self) -> &ArpCache {
        &self.arp_cache
    }

    #[must_use]
    pub fn nd_cache(&self) -> &NdCache {
        &self.nd_cache
    }

    /// Dispatches an inbound ARP packet (already parsed off the wire).
    pub fn on_arp(&self, pkt: &ArpPacket, output: &dyn PacketOutput) {
        ArpStateMachine::new(&self.arp_cache, &self.host).on_inbound(pkt, output);
    }

    /// Dispatches an inbound IPv4 datagram: ICMP is forwarded to `notify`,
    /// anything else is `ProtocolUnsupported` (§7) since upper-layer
    /// transport handling lives outside this crate.
    pub fn on_ipv4(&self, pkt: &Ipv4Packet, notify: &dyn Notifyable) -> Result<(), CoreError> {
        if pkt.proto != PROTO_ICMP {
            return Err(CoreError::ProtocolUnsupported(u16::from(pkt.proto)));
        }
        match IcmpPacket::from_slice(&pkt.content) {
            Ok(icmp) => icmp::on_inbound_v4(&icmp, pkt.src, notify),
            Err(err) => warn!(%err, "dropping malformed icmpv4 packet"),
        }
        Ok(())
    }

    /// Dispatches an inbound IPv6 datagram: ICMPv6 NDP messages go to the
    /// neighbor discovery state machine, echo/error messages to `notify`,
    /// anything else is `ProtocolUnsupported`.
    pub fn on_ipv6(
        &self,
        src_mac: MacAddress,
        pkt: &Ipv6Packet,
        notify: &dyn Notifyable,
        output: &dyn PacketOutput,
    ) -> Result<(), CoreError> {
        if pkt.next_header != PROTO_ICMPV6 {
            return Err(CoreError::ProtocolUnsupported(u16::from(pkt.next_header)));
        }
        match IcmpV6Packet::from_slice(&pkt.content) {
            Ok(icmpv6) => {
                if is_ndp_message(&icmpv6) {
                    NdStateMachine::new(&self.nd_cache, &self.host).on_inbound(
                        src_mac,
                        pkt.src,
                        pkt.dest,
                        pkt.hop_limit,
                        &icmpv6,
                        output,
                    );
                } else {
                    icmp::on_inbound_v6(&icmpv6, pkt.src, notify);
                }
            }
            Err(err) => warn!(%err, "dropping malformed icmpv6 packet"),
        }
        Ok(())
    }

    /// Resolves and sends an already-serialized IPv4 datagram.
    pub fn resolve_v4(&self, dest: Ipv4Addr, payload: Vec<u8>, output: &dyn PacketOutput) {
        ArpStateMachine::new(&self.arp_cache, &self.host).resolve(Key4::from(dest), payload, output);
    }

    /// Resolves and sends an already-serialized IPv6 datagram. Fails with
    /// [`CoreError::NoGateway`] when `dest` is off-link and no default
    /// router is known.
    pub fn resolve_v6(&self, dest: Ipv6Addr, payload: Vec<u8>, output: &dyn PacketOutput) -> Result<(), CoreError> {
        NdStateMachine::new(&self.nd_cache, &self.host).resolve(Key6::from(dest), payload, output)
    }
}

fn is_ndp_message(pkt: &IcmpV6Packet) -> bool {
    matches!(
        pkt,
        IcmpV6Packet::NeighborSolicitation(_)
            | IcmpV6Packet::NeighborAdvertisment(_)
            | IcmpV6Packet::RouterAdvertisment(_)
            | IcmpV6Packet::Redirect(_)
    )
}
