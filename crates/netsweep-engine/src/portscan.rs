//! TCP connect port scanning.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use netsweep_core::{PortProbeResult, PortRange};

use crate::banner::read_banner;
use crate::config::ScanConfig;
use crate::runner::{CancelToken, TaskRunner};
use crate::services::service_name;
use crate::transport::Dialer;

/// Probes the ports of one host at a time.
pub struct PortScanner {
    dialer: Arc<dyn Dialer>,
    connect_timeout: Duration,
    banner_timeout: Duration,
    grab_banners: bool,
}

impl PortScanner {
    pub fn new(config: &ScanConfig, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            dialer,
            connect_timeout: config.connect_timeout(),
            banner_timeout: config.banner_timeout(),
            grab_banners: config.grab_banners,
        }
    }

    /// Connects to one port. Refused and timed-out connects are both
    /// reported as `None`.
    pub async fn probe_port(
        &self,
        addr: Ipv4Addr,
        port: u16,
        cancel: &CancelToken,
    ) -> Option<PortProbeResult> {
        let socket = SocketAddr::from((addr, port));
        let started = Instant::now();

        let mut stream = match self.dialer.connect(socket, self.connect_timeout).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::trace!(ip = %addr, port, error = %e, "Port closed");
                return None;
            }
        };
        let rtt = started.elapsed();

        let banner = if self.grab_banners && !cancel.is_cancelled() {
            read_banner(&mut stream, self.banner_timeout).await
        } else {
            None
        };
        drop(stream);

        Some(
            PortProbeResult::open(port, service_name(port))
                .with_banner(banner)
                .with_response_time(rtt),
        )
    }

    /// Scans `ports` on `addr` under `runner`'s cap and returns the open ports
    /// sorted ascending.
    pub async fn scan_host(
        self: &Arc<Self>,
        addr: Ipv4Addr,
        ports: PortRange,
        runner: &TaskRunner,
    ) -> Vec<PortProbeResult> {
        let mut open: Vec<PortProbeResult> = runner
            .run(ports.iter(), |port, cancel| {
                let scanner = Arc::clone(self);
                async move { scanner.probe_port(addr, port, &cancel).await }
            })
            .await;

        open.sort_by_key(|p| p.port);
        open.dedup_by_key(|p| p.port);

        tracing::debug!(ip = %addr, range = %ports, open = open.len(), "Host port scan complete");
        open
    }
}
