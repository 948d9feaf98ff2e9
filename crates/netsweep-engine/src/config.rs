//! Configuration for the netsweep scanning engine.

use std::time::Duration;

use netsweep_core::DiscoveryMethod;
use serde::Deserialize;

/// Top-level scan configuration.
///
/// Loaded from `netsweep.toml` `[scan]` section or
/// `NETSWEEP__SCAN__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Liveness strategy used for every target.
    #[serde(default)]
    pub strategy: DiscoveryStrategy,

    /// Configured liveness timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// The TCP liveness probe waits `probe_timeout_ms / probe_timeout_divisor`
    /// per port (2 standard, 3 for the faster sweep).
    #[serde(default = "default_probe_timeout_divisor")]
    pub probe_timeout_divisor: u32,

    /// Ordered ports tried by the TCP liveness probe.
    #[serde(default = "default_probe_ports")]
    pub probe_ports: Vec<u16>,

    /// Port-scan connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Banner read deadline in milliseconds.
    #[serde(default = "default_banner_timeout_ms")]
    pub banner_timeout_ms: u64,

    /// Attempt a banner read on every open port.
    #[serde(default = "default_true")]
    pub grab_banners: bool,

    /// Maximum in-flight liveness probes.
    #[serde(default = "default_concurrency")]
    pub discovery_concurrency: usize,

    /// Maximum in-flight port connects per host.
    #[serde(default = "default_concurrency")]
    pub port_concurrency: usize,

    /// Port range used when the caller does not supply one.
    #[serde(default = "default_port_range")]
    pub default_port_range: String,

    /// Reverse-resolve active hosts.
    #[serde(default = "default_true")]
    pub resolve_hostnames: bool,

    /// Path to the ping binary.
    #[serde(default = "default_ping_path")]
    pub ping_path: String,

    /// Path to the arp binary.
    #[serde(default = "default_arp_path")]
    pub arp_path: String,
}

/// Liveness strategies, each an ordered chain of detection methods.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    /// ICMP echo, then TCP probe, then ARP table.
    #[default]
    Combined,
    /// TCP connect probe only.
    TcpConnect,
    /// ICMP echo only.
    IcmpPing,
}

impl DiscoveryStrategy {
    /// Detection methods tried in order, stopping at the first success.
    pub fn methods(&self) -> &'static [DiscoveryMethod] {
        match self {
            Self::Combined => &[
                DiscoveryMethod::Icmp,
                DiscoveryMethod::TcpProbe,
                DiscoveryMethod::Arp,
            ],
            Self::TcpConnect => &[DiscoveryMethod::TcpProbe],
            Self::IcmpPing => &[DiscoveryMethod::Icmp],
        }
    }
}

impl ScanConfig {
    /// Per-port timeout of the TCP liveness probe.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms) / self.probe_timeout_divisor.max(1)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_probe_timeout_divisor() -> u32 {
    2
}

fn default_probe_ports() -> Vec<u16> {
    vec![
        80, 443, 22, 3389, 21, 23, 25, 53, 8080, 8443, 445, 139, 135, 5900, 5901, 548, 1883,
        8123, 62078, 7000,
    ]
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_banner_timeout_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    100
}

fn default_port_range() -> String {
    "20-1024".to_string()
}

fn default_ping_path() -> String {
    "ping".to_string()
}

fn default_arp_path() -> String {
    "arp".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            strategy: DiscoveryStrategy::default(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_timeout_divisor: default_probe_timeout_divisor(),
            probe_ports: default_probe_ports(),
            connect_timeout_ms: default_connect_timeout_ms(),
            banner_timeout_ms: default_banner_timeout_ms(),
            grab_banners: true,
            discovery_concurrency: default_concurrency(),
            port_concurrency: default_concurrency(),
            default_port_range: default_port_range(),
            resolve_hostnames: true,
            ping_path: default_ping_path(),
            arp_path: default_arp_path(),
        }
    }
}
