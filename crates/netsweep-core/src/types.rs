//! Core data model for a scan run.
//!
//! Everything here is created once and never mutated afterwards: the
//! enumerator produces [`Target`]s, the liveness prober turns each into a
//! [`LivenessResult`], the port scanner produces [`PortProbeResult`]s, and
//! the aggregator assembles [`HostScanRecord`]s into a [`ScanReport`].

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NetsweepError, Result};

// ── Targets ───────────────────────────────────────────────────────

/// A candidate address and its position in the enumerated range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Target {
    pub addr: Ipv4Addr,
    pub index: usize,
}

impl Target {
    pub fn new(addr: Ipv4Addr, index: usize) -> Self {
        Self { addr, index }
    }
}

// ── Liveness ──────────────────────────────────────────────────────

/// Which detection method confirmed a host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    Icmp,
    TcpProbe,
    Arp,
    None,
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Icmp => "ICMP",
            Self::TcpProbe => "TCP-Probe",
            Self::Arp => "ARP",
            Self::None => "None",
        };
        f.write_str(label)
    }
}

/// Verdict of the liveness prober for a single target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LivenessResult {
    pub addr: Ipv4Addr,
    pub is_active: bool,
    pub hostname: Option<String>,
    pub method: DiscoveryMethod,
    /// Ports found open while probing for liveness (not a full port scan).
    pub open_ports: u32,
    pub mac: Option<String>,
    pub vendor: Option<String>,
}

impl LivenessResult {
    pub fn inactive(addr: Ipv4Addr) -> Self {
        Self {
            addr,
            is_active: false,
            hostname: None,
            method: DiscoveryMethod::None,
            open_ports: 0,
            mac: None,
            vendor: None,
        }
    }

    pub fn active(addr: Ipv4Addr, method: DiscoveryMethod) -> Self {
        Self {
            is_active: true,
            method,
            ..Self::inactive(addr)
        }
    }

    pub fn with_open_ports(mut self, open_ports: u32) -> Self {
        self.open_ports = open_ports;
        self
    }

    pub fn with_hostname(mut self, hostname: String) -> Self {
        self.hostname = Some(hostname);
        self
    }

    pub fn with_mac(mut self, mac: String, vendor: Option<String>) -> Self {
        self.mac = Some(mac);
        self.vendor = vendor;
        self
    }

    /// Status label used by host listings.
    pub fn status(&self) -> &'static str {
        if self.is_active {
            "Active"
        } else {
            "Inactive"
        }
    }
}

// ── Ports ─────────────────────────────────────────────────────────

/// Inclusive TCP port range, always within `1..=65535` with `start <= end`.
///
/// Serialized as its `"start-end"` string; deserialization goes through
/// [`FromStr`] so invalid ranges are rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start == 0 || start > end {
            return Err(NetsweepError::InvalidPortRange {
                input: format!("{start}-{end}"),
                reason: "ports must be within 1-65535 and start must be <= end".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

impl FromStr for PortRange {
    type Err = NetsweepError;

    /// Parses `"<start>-<end>"`, e.g. `"20-1024"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| NetsweepError::InvalidPortRange {
            input: s.to_string(),
            reason,
        };

        let (start_str, end_str) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| invalid("expected format <start>-<end>".to_string()))?;

        let start = parse_port(start_str).map_err(|e| invalid(format!("invalid start port: {e}")))?;
        let end = parse_port(end_str).map_err(|e| invalid(format!("invalid end port: {e}")))?;

        if start > end {
            return Err(invalid("start port must be <= end port".to_string()));
        }

        Ok(Self { start, end })
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl TryFrom<String> for PortRange {
    type Error = NetsweepError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<PortRange> for String {
    fn from(range: PortRange) -> Self {
        range.to_string()
    }
}

fn parse_port(s: &str) -> std::result::Result<u16, String> {
    let value: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s.trim()))?;
    match u16::try_from(value) {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(format!("{value} is outside 1-65535")),
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// Outcome of probing one (host, port) pair.
///
/// Only successful connections produce a result, so `is_open` is always true
/// for results attached to a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortProbeResult {
    pub port: u16,
    pub protocol: Protocol,
    #[serde(skip_serializing, default = "default_open")]
    pub is_open: bool,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// Connect round-trip time; exported to CSV only.
    #[serde(skip)]
    pub response_time: Option<Duration>,
}

fn default_open() -> bool {
    true
}

impl PortProbeResult {
    pub fn open(port: u16, service: &str) -> Self {
        Self {
            port,
            protocol: Protocol::Tcp,
            is_open: true,
            service: service.to_string(),
            banner: None,
            response_time: None,
        }
    }

    pub fn with_banner(mut self, banner: Option<String>) -> Self {
        self.banner = banner;
        self
    }

    pub fn with_response_time(mut self, response_time: Duration) -> Self {
        self.response_time = Some(response_time);
        self
    }
}

// ── Aggregated output ─────────────────────────────────────────────

/// An active host together with the ports found open on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostScanRecord {
    #[serde(rename = "ip_address")]
    pub address: Ipv4Addr,
    pub hostname: String,
    pub open_ports: Vec<PortProbeResult>,
}

impl HostScanRecord {
    /// Builds a record, sorting ports ascending and dropping duplicates.
    pub fn new(address: Ipv4Addr, hostname: String, mut open_ports: Vec<PortProbeResult>) -> Self {
        open_ports.retain(|p| p.is_open);
        open_ports.sort_by_key(|p| p.port);
        open_ports.dedup_by_key(|p| p.port);
        Self {
            address,
            hostname,
            open_ports,
        }
    }

    pub fn open_port_count(&self) -> usize {
        self.open_ports.len()
    }
}

/// Terminal artifact of a scan run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanReport {
    pub subnet: String,
    pub scan_time: DateTime<Utc>,
    pub hosts_found: Vec<HostScanRecord>,
}

impl ScanReport {
    /// Builds a report, keeping the first record per address in the given order.
    pub fn new(subnet: String, scan_time: DateTime<Utc>, hosts: Vec<HostScanRecord>) -> Self {
        let mut seen = HashSet::new();
        let hosts_found = hosts
            .into_iter()
            .filter(|h| seen.insert(h.address))
            .collect();
        Self {
            subnet,
            scan_time,
            hosts_found,
        }
    }

    pub fn open_port_count(&self) -> usize {
        self.hosts_found.iter().map(HostScanRecord::open_port_count).sum()
    }
}
