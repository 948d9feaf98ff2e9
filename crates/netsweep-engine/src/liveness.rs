//! Liveness probing.
//!
//! Each target runs through an ordered chain of [`LivenessCheck`]s chosen by
//! the configured [`DiscoveryStrategy`](crate::config::DiscoveryStrategy).
//! The first check that succeeds decides the verdict; active hosts are then
//! given a hostname that is never blank.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netsweep_core::{DiscoveryMethod, LivenessResult, Target};

use crate::config::ScanConfig;
use crate::runner::{CancelToken, TaskRunner};
use crate::system::SystemProbe;
use crate::transport::Dialer;
use crate::vendor::mac_hostname;

/// One detection method.
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    fn method(&self) -> DiscoveryMethod;

    /// `Some` with an active result when the method confirms the host.
    async fn check(&self, addr: Ipv4Addr, cancel: &CancelToken) -> Option<LivenessResult>;
}

// ── Checks ────────────────────────────────────────────────────────

pub struct IcmpCheck {
    system: Arc<dyn SystemProbe>,
}

#[async_trait]
impl LivenessCheck for IcmpCheck {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Icmp
    }

    async fn check(&self, addr: Ipv4Addr, _cancel: &CancelToken) -> Option<LivenessResult> {
        self.system
            .icmp_echo(addr)
            .await
            .then(|| LivenessResult::active(addr, DiscoveryMethod::Icmp))
    }
}

/// Connects to common service ports in order until one accepts.
pub struct TcpProbeCheck {
    dialer: Arc<dyn Dialer>,
    ports: Vec<u16>,
    timeout: Duration,
}

#[async_trait]
impl LivenessCheck for TcpProbeCheck {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::TcpProbe
    }

    async fn check(&self, addr: Ipv4Addr, cancel: &CancelToken) -> Option<LivenessResult> {
        for &port in &self.ports {
            if cancel.is_cancelled() {
                return None;
            }

            let socket = SocketAddr::from((addr, port));
            match self.dialer.connect(socket, self.timeout).await {
                Ok(stream) => {
                    drop(stream);
                    tracing::trace!(ip = %addr, port, "Liveness probe connected");
                    return Some(
                        LivenessResult::active(addr, DiscoveryMethod::TcpProbe).with_open_ports(1),
                    );
                }
                Err(e) => tracing::trace!(ip = %addr, port, error = %e, "Liveness probe failed"),
            }
        }
        None
    }
}

pub struct ArpCheck {
    system: Arc<dyn SystemProbe>,
}

#[async_trait]
impl LivenessCheck for ArpCheck {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Arp
    }

    async fn check(&self, addr: Ipv4Addr, _cancel: &CancelToken) -> Option<LivenessResult> {
        let entry = self.system.arp_lookup(addr).await?;
        Some(LivenessResult::active(addr, DiscoveryMethod::Arp).with_mac(entry.mac, entry.vendor))
    }
}

// ── Prober ────────────────────────────────────────────────────────

pub struct LivenessProber {
    checks: Vec<Box<dyn LivenessCheck>>,
    system: Arc<dyn SystemProbe>,
    resolve_hostnames: bool,
}

impl LivenessProber {
    pub fn new(config: &ScanConfig, dialer: Arc<dyn Dialer>, system: Arc<dyn SystemProbe>) -> Self {
        let checks = config
            .strategy
            .methods()
            .iter()
            .filter_map(|method| -> Option<Box<dyn LivenessCheck>> {
                match method {
                    DiscoveryMethod::Icmp => Some(Box::new(IcmpCheck {
                        system: system.clone(),
                    })),
                    DiscoveryMethod::TcpProbe => Some(Box::new(TcpProbeCheck {
                        dialer: dialer.clone(),
                        ports: config.probe_ports.clone(),
                        timeout: config.probe_timeout(),
                    })),
                    DiscoveryMethod::Arp => Some(Box::new(ArpCheck {
                        system: system.clone(),
                    })),
                    DiscoveryMethod::None => None,
                }
            })
            .collect();

        Self {
            checks,
            system,
            resolve_hostnames: config.resolve_hostnames,
        }
    }

    /// Methods this prober will try, in order.
    pub fn methods(&self) -> Vec<DiscoveryMethod> {
        self.checks.iter().map(|c| c.method()).collect()
    }

    /// Classifies one target. Active results always carry a hostname;
    /// inactive ones never do.
    pub async fn probe(&self, target: Target, cancel: &CancelToken) -> LivenessResult {
        let addr = target.addr;

        for check in &self.checks {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(result) = check.check(addr, cancel).await {
                let result = self.name_host(result).await;
                tracing::debug!(
                    ip = %addr,
                    method = %result.method,
                    hostname = result.hostname.as_deref().unwrap_or_default(),
                    "Host active"
                );
                return result;
            }
        }

        LivenessResult::inactive(addr)
    }

    /// Checks `targets` under `runner`'s cap and returns only the active
    /// hosts, in confirmation order. `on_active` runs as soon as each host is
    /// confirmed, before the rest of the sweep finishes.
    pub async fn find_active<I, F>(
        self: &Arc<Self>,
        targets: I,
        runner: &TaskRunner,
        on_active: F,
    ) -> Vec<LivenessResult>
    where
        I: IntoIterator<Item = Target>,
        F: Fn(&LivenessResult) + Send + Sync + 'static,
    {
        let on_active = Arc::new(on_active);
        runner
            .run(targets, |target, cancel| {
                let prober = Arc::clone(self);
                let on_active = Arc::clone(&on_active);
                async move {
                    let result = prober.probe(target, &cancel).await;
                    if !result.is_active {
                        return None;
                    }
                    on_active(&result);
                    Some(result)
                }
            })
            .await
    }

    /// Reverse DNS, then the MAC-derived name, then the address placeholder.
    async fn name_host(&self, mut result: LivenessResult) -> LivenessResult {
        let addr = result.addr;

        if self.resolve_hostnames {
            if let Some(name) = self.system.reverse_dns(addr).await {
                return result.with_hostname(name);
            }
        }

        if result.mac.is_none() {
            if let Some(entry) = self.system.arp_lookup(addr).await {
                result = result.with_mac(entry.mac, entry.vendor);
            }
        }

        let hostname = match result.mac.as_deref() {
            Some(mac) => mac_hostname(mac, result.vendor.as_deref()),
            None => placeholder_hostname(addr),
        };
        result.with_hostname(hostname)
    }
}

/// `Unknown-192-168-1-10` for `192.168.1.10`.
pub fn placeholder_hostname(addr: Ipv4Addr) -> String {
    format!("Unknown-{}", addr.to_string().replace('.', "-"))
}
