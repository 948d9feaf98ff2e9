//! Host-level lookups that go through the operating system: ICMP echo via
//! the `ping` binary, neighbour-table reads via `arp`, and reverse DNS.

use std::net::{IpAddr, Ipv4Addr};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ScanConfig;
use crate::vendor::lookup_vendor;

const DNS_TIMEOUT: Duration = Duration::from_secs(2);
const ARP_TIMEOUT: Duration = Duration::from_secs(2);

/// A neighbour-table entry for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpEntry {
    /// Uppercase, colon-separated.
    pub mac: String,
    pub vendor: Option<String>,
}

impl ArpEntry {
    pub fn new(mac: String) -> Self {
        let vendor = lookup_vendor(&mac).map(str::to_string);
        Self { mac, vendor }
    }
}

#[async_trait]
pub trait SystemProbe: Send + Sync {
    /// True when the host answers one ICMP echo.
    async fn icmp_echo(&self, addr: Ipv4Addr) -> bool;

    /// The host's neighbour-table entry, if one with a MAC exists.
    async fn arp_lookup(&self, addr: Ipv4Addr) -> Option<ArpEntry>;

    /// PTR name without the trailing dot.
    async fn reverse_dns(&self, addr: Ipv4Addr) -> Option<String>;
}

/// Shells out to the platform's `ping` and `arp` binaries.
#[derive(Debug, Clone)]
pub struct OsSystemProbe {
    ping_path: String,
    arp_path: String,
    ping_timeout: Duration,
}

impl OsSystemProbe {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            ping_path: config.ping_path.clone(),
            arp_path: config.arp_path.clone(),
            ping_timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }
}

#[async_trait]
impl SystemProbe for OsSystemProbe {
    async fn icmp_echo(&self, addr: Ipv4Addr) -> bool {
        let mut cmd = Command::new(&self.ping_path);
        cmd.args(ping_args())
            .arg(addr.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // One extra second covers process start-up on top of the echo wait.
        let limit = self.ping_timeout + Duration::from_secs(1);
        match timeout(limit, cmd.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::warn!(path = %self.ping_path, error = %e, "Failed to run ping");
                false
            }
            Err(_) => false,
        }
    }

    async fn arp_lookup(&self, addr: Ipv4Addr) -> Option<ArpEntry> {
        let mut cmd = Command::new(&self.arp_path);
        cmd.arg("-n")
            .arg(addr.to_string())
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(ARP_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(path = %self.arp_path, error = %e, "Failed to run arp");
                return None;
            }
            Err(_) => return None,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_arp_output(&stdout).map(ArpEntry::new)
    }

    async fn reverse_dns(&self, addr: Ipv4Addr) -> Option<String> {
        let ip = IpAddr::V4(addr);
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip));

        match timeout(DNS_TIMEOUT, lookup).await {
            Ok(Ok(Ok(name))) => clean_ptr_name(&name, addr),
            Ok(Ok(Err(e))) => {
                tracing::trace!(ip = %addr, error = %e, "Reverse lookup failed");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(ip = %addr, error = %e, "Reverse lookup task failed");
                None
            }
            Err(_) => None,
        }
    }
}

#[cfg(target_os = "windows")]
fn ping_args() -> &'static [&'static str] {
    &["-n", "1", "-w", "1000"]
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn ping_args() -> &'static [&'static str] {
    &["-c", "1", "-t", "1"]
}

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
fn ping_args() -> &'static [&'static str] {
    &["-c", "1", "-W", "1"]
}

/// Extracts the MAC address from `arp -n` output.
///
/// Handles the BSD/macOS form (`? (10.0.0.1) at aa:bb:cc:dd:ee:ff on en0`),
/// the Linux net-tools table, and Windows dashed MACs. Octets are zero-padded
/// and uppercased. Incomplete entries yield `None`.
pub fn parse_arp_output(output: &str) -> Option<String> {
    let lower = output.to_ascii_lowercase();
    if lower.contains("no entry") || lower.contains("incomplete") {
        return None;
    }

    output
        .split_whitespace()
        .find_map(normalize_mac)
}

fn normalize_mac(token: &str) -> Option<String> {
    let sep = if token.contains(':') { ':' } else { '-' };
    let octets: Vec<&str> = token.split(sep).collect();
    if octets.len() != 6 {
        return None;
    }

    let mut parsed = Vec::with_capacity(6);
    for octet in octets {
        if octet.is_empty() || octet.len() > 2 {
            return None;
        }
        parsed.push(u8::from_str_radix(octet, 16).ok()?);
    }

    if parsed.iter().all(|&b| b == 0) || parsed.iter().all(|&b| b == 0xff) {
        return None;
    }

    Some(
        parsed
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":"),
    )
}

fn clean_ptr_name(name: &str, addr: Ipv4Addr) -> Option<String> {
    let trimmed = name.trim().trim_end_matches('.');
    // Some resolvers echo the address back instead of failing.
    if trimmed.is_empty() || trimmed == addr.to_string() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
