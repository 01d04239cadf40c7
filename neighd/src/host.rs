//! Local-address bookkeeping (§3 `HostAddressTable`) and the read-mostly
//! host parameters RA processing tunes (§5 "Shared state").

use std::net::Ipv6Addr;
use std::time::{Duration, Instant};

use fxhash::FxHashMap;
use parking_lot::RwLock;

use neigh_wire::ip::{Ipv6Prefix, Ipv6AddrExt};
use neigh_wire::mac::MacAddress;

use crate::config::HostConfig;
use crate::key::{Key4, Key6};

#[derive(Debug, Clone, Copy)]
pub struct V4Entry {
    pub addr: Key4,
    pub mask: Key4,
    pub gateway: Option<Key4>,
}

#[derive(Debug, Clone, Copy)]
pub struct V6Entry {
    pub addr: Key6,
}

#[derive(Debug, Clone, Copy)]
pub struct PrefixEntry {
    pub lifetime: Duration,
    pub stamp: Instant,
    pub onlink: bool,
    pub slaac: bool,
}

/// Local unicast addresses, their derived broadcast/solicited-node
/// multicast shadows, and the on-link prefix table RAs populate.
#[derive(Default)]
pub struct HostAddressTable {
    v4: RwLock<FxHashMap<Key4, V4Entry>>,
    v6: RwLock<FxHashMap<Key6, V6Entry>>,
    solicited6: RwLock<FxHashMap<Key6, V6Entry>>,
    prefixes: RwLock<FxHashMap<Ipv6Prefix, PrefixEntry>>,
}

impl HostAddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a configured IPv4 address, also inserting the subnet
    /// broadcast address pointing at the same record.
    pub fn add_v4(&self, addr: Key4, mask: Key4, gateway: Option<Key4>) {
        let entry = V4Entry { addr, mask, gateway };
        let broadcast = addr.broadcast(mask);
        let mut v4 = self.v4.write();
        v4.insert(addr, entry);
        v4.insert(broadcast, entry);
    }

    pub fn is_local_v4(&self, addr: Key4) -> bool {
        self.v4.read().contains_key(&addr)
    }

    pub fn v4_entry(&self, addr: Key4) -> Option<V4Entry> {
        self.v4.read().get(&addr).copied()
    }

    /// Any one configured unicast IPv4 address, to use as an ARP solicitation source.
    pub fn any_v4(&self) -> Option<Key4> {
        self.v4
            .read()
            .iter()
            .find(|(&key, entry)| entry.addr == key)
            .map(|(&key, _)| key)
    }

    /// True if `addr` is a subnet-broadcast shadow of a configured address
    /// (i.e. `addr | ~mask`, not the configured address itself).
    pub fn is_broadcast_v4(&self, addr: Key4) -> bool {
        self.v4
            .read()
            .get(&addr)
            .is_some_and(|entry| entry.addr != addr)
    }

    /// Registers a configured IPv6 address, also inserting its
    /// solicited-node multicast shadow.
    pub fn add_v6(&self, addr: Key6) {
        let entry = V6Entry { addr };
        self.v6.write().insert(addr, entry);
        self.solicited6
            .write()
            .insert(addr.solicited_node(), entry);
    }

    pub fn is_local_v6(&self, addr: Key6) -> bool {
        self.v6.read().contains_key(&addr)
    }

    /// Any one configured unicast IPv6 address, to use as a solicitation source.
    pub fn any_v6(&self) -> Option<Key6> {
        self.v6.read().keys().next().copied()
    }

    pub fn is_solicited_node(&self, addr: Key6) -> bool {
        self.solicited6.read().contains_key(&addr)
    }

    /// Installs or refreshes a prefix learned from a Router Advertisement.
    /// `fe80::/10` link-locals are silently ignored, per §3.
    pub fn update_prefix(&self, prefix: Ipv6Prefix, valid_lifetime: Duration, onlink: bool, slaac: bool) {
        if prefix.addr().is_link_local() {
            return;
        }
        let mut prefixes = self.prefixes.write();
        if valid_lifetime.is_zero() {
            prefixes.remove(&prefix);
            return;
        }
        prefixes
            .entry(prefix)
            .and_modify(|e| {
                e.lifetime = valid_lifetime;
                e.stamp = Instant::now();
            })
            .or_insert(PrefixEntry {
                lifetime: valid_lifetime,
                stamp: Instant::now(),
                onlink,
                slaac,
            });
    }

    /// True if `addr` falls under a known on-link prefix.
    pub fn is_on_link(&self, addr: Key6) -> bool {
        let addr = Ipv6Addr::from(addr);
        self.prefixes
            .read()
            .iter()
            .any(|(prefix, entry)| entry.onlink && prefix.contains(addr))
    }

    pub fn prefix_count(&self) -> usize {
        self.prefixes.read().len()
    }

    pub fn has_prefix(&self, prefix: Ipv6Prefix) -> bool {
        self.prefixes.read().contains_key(&prefix)
    }
}

/// Read-mostly host parameters tuned by Router Advertisements (§4.5, §5).
pub struct Host {
    pub local_mac: MacAddress,
    pub vlan: Option<u16>,
    pub addresses: HostAddressTable,
    params: RwLock<HostParams>,
}

#[derive(Debug, Clone, Copy)]
struct HostParams {
    cur_hop_limit: u8,
    base_reachable_time: Duration,
    reachable_time: Duration,
    retrans_timer: Duration,
    mtu: u32,
}

impl Default for HostParams {
    fn default() -> Self {
        Self {
            cur_hop_limit: 64,
            base_reachable_time: Duration::from_secs(30),
            reachable_time: Duration::from_secs(30),
            retrans_timer: Duration::from_secs(1),
            mtu: 1500,
        }
    }
}

impl Host {
    pub fn new(config: &HostConfig) -> Self {
        let addresses = HostAddressTable::new();
        for v4 in &config.v4_addrs {
            addresses.add_v4(v4.addr, v4.mask, v4.gateway);
        }
        for v6 in &config.v6_addrs {
            addresses.add_v6(v6.addr);
        }
        Self {
            local_mac: config.local_mac,
            vlan: config.vlan,
            addresses,
            params: RwLock::new(HostParams::default()),
        }
    }

    pub fn cur_hop_limit(&self) -> u8 {
        self.params.read().cur_hop_limit
    }

    pub fn retrans_timer(&self) -> Duration {
        self.params.read().retrans_timer
    }

    pub fn reachable_time(&self) -> Duration {
        self.params.read().reachable_time
    }

    pub fn mtu(&self) -> u32 {
        self.params.read().mtu
    }

    pub fn set_cur_hop_limit(&self, value: u8) {
        if value != 0 {
            self.params.write().cur_hop_limit = value;
        }
    }

    pub fn set_retrans_timer(&self, value: Duration) {
        if !value.is_zero() {
            self.params.write().retrans_timer = value;
        }
    }

    /// RFC 4861's `MIN_RANDOM_FACTOR`=0.5 / `MAX_RANDOM_FACTOR`=1.5 jitter,
    /// applied as `value/2 + 1 + uniform[0, value)` (ms).
    pub fn set_base_reachable_time(&self, value: Duration) {
        if value.is_zero() {
            return;
        }
        let value_ms = value.as_millis() as u64;
        let jitter = rand::random::<u64>() % value_ms.max(1);
        let reachable_ms = value_ms / 2 + 1 + jitter;
        let mut params = self.params.write();
        params.base_reachable_time = value;
        params.reachable_time = Duration::from_millis(reachable_ms);
    }

    pub fn set_mtu(&self, value: u32) {
        let mut params = self.params.write();
        params.mtu = params.mtu.max(value).max(1280);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn add_v4_inserts_broadcast() {
        let table = HostAddressTable::new();
        let addr = Key4::from(Ipv4Addr::new(10, 0, 0, 1));
        let mask = Key4::from(Ipv4Addr::new(255, 255, 255, 0));
        table.add_v4(addr, mask, None);
        assert!(table.is_local_v4(addr));
        assert!(table.is_local_v4(addr.broadcast(mask)));
    }

    #[test]
    fn add_v6_inserts_solicited_node() {
        let table = HostAddressTable::new();
        let addr: Key6 = "2001:db8::1234:5678".parse::<Ipv6Addr>().unwrap().into();
        table.add_v6(addr);
        assert!(table.is_local_v6(addr));
        assert!(table.is_solicited_node(addr.solicited_node()));
    }

    #[test]
    fn prefix_zero_lifetime_removes() {
        let table = HostAddressTable::new();
        let prefix = "2001:db8::/64".parse().unwrap();
        table.update_prefix(prefix, Duration::from_secs(3600), true, false);
        assert!(table.has_prefix(prefix));
        table.update_prefix(prefix, Duration::ZERO, true, false);
        assert!(!table.has_prefix(prefix));
    }

    #[test]
    fn link_local_prefix_ignored() {
        let table = HostAddressTable::new();
        let prefix = "fe80::/10".parse().unwrap();
        table.update_prefix(prefix, Duration::from_secs(3600), true, false);
        assert_eq!(table.prefix_count(), 0);
    }

    #[test]
    fn mtu_clamped_to_minimum() {
        let host = Host::new(&HostConfig::default());
        host.set_mtu(500);
        assert_eq!(host.mtu(), 1500);
    }
}
