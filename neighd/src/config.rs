//! Host and cache configuration. Plain, `Default`-implementing, field-public
//! structs — no file/env parsing is owned by this crate, an embedder's own
//! config layer populates these directly.

use std::time::Duration;

use neigh_wire::mac::MacAddress;

use crate::key::{Key4, Key6};

/// A locally-configured IPv4 address.
#[derive(Debug, Clone, Copy)]
pub struct LocalV4 {
    pub addr: Key4,
    pub mask: Key4,
    pub gateway: Option<Key4>,
}

/// A locally-configured IPv6 address.
#[derive(Debug, Clone, Copy)]
pub struct LocalV6 {
    pub addr: Key6,
    pub prefix_len: u8,
}

#[derive(Debug, Clone)]
pub struct ArpConfig {
    /// How long a COMPLETE entry is trusted before a refresh solicitation is issued.
    pub timeout: Duration,
    /// Added on top of `timeout` before a refresh is considered overdue enough
    /// to re-solicit rather than merely schedule one for next use.
    pub soft_timeout_diff: Duration,
    pub max_size: usize,
}

impl Default for ArpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            soft_timeout_diff: Duration::from_secs(5),
            max_size: 4096,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NdConfig {
    pub max_size: usize,
    pub redirect_cap: usize,
    pub delay_first_probe_time: Duration,
    pub retrans_timer: Duration,
    pub reachable_time: Duration,
    pub max_unicast_solicit: u8,
}

impl Default for NdConfig {
    fn default() -> Self {
        Self {
            max_size: 128_000,
            redirect_cap: 16_000,
            delay_first_probe_time: Duration::from_secs(5),
            retrans_timer: Duration::from_secs(1),
            reachable_time: Duration::from_secs(30),
            max_unicast_solicit: 3,
        }
    }
}

/// Top-level configuration surface: local identity, configured addresses, and
/// the two cache sub-configs.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub local_mac: MacAddress,
    pub vlan: Option<u16>,
    pub v4_addrs: Vec<LocalV4>,
    pub v6_addrs: Vec<LocalV6>,
    pub arp: ArpConfig,
    pub nd: NdConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            local_mac: MacAddress::gen(),
            vlan: None,
            v4_addrs: Vec::new(),
            v6_addrs: Vec::new(),
            arp: ArpConfig::default(),
            nd: NdConfig::default(),
        }
    }
}
