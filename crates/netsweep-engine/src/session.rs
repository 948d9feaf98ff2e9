//! Scan sessions.
//!
//! A [`ScanSession`] owns everything one run needs (configuration, the
//! network seams, the cancel token, and an optional progress channel) and
//! drives the linear pipeline: enumerate, probe liveness, scan ports of
//! active hosts, assemble the report.

use std::sync::Arc;
use std::time::Instant;

use chrono::{SubsecRound, Utc};
use netsweep_core::events::{EventPayload, ScanEvent};
use netsweep_core::{HostScanRecord, NetsweepError, PortRange, ScanReport};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::interfaces::{select_default_subnet, InterfaceSource, OsInterfaces};
use crate::liveness::{placeholder_hostname, LivenessProber};
use crate::portscan::PortScanner;
use crate::runner::{CancelToken, TaskRunner};
use crate::system::{OsSystemProbe, SystemProbe};
use crate::targets::ScanTarget;
use crate::transport::{Dialer, TcpDialer};

pub struct ScanSession {
    id: Uuid,
    config: ScanConfig,
    dialer: Arc<dyn Dialer>,
    system: Arc<dyn SystemProbe>,
    interfaces: Arc<dyn InterfaceSource>,
    cancel: CancelToken,
    events: EventSink,
}

/// Tags payloads with the scan id and forwards them, if anyone is listening.
#[derive(Clone)]
struct EventSink {
    scan_id: Uuid,
    tx: Option<UnboundedSender<ScanEvent>>,
}

impl EventSink {
    fn emit(&self, payload: EventPayload) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ScanEvent::new(self.scan_id, payload));
        }
    }
}

impl ScanSession {
    /// A session backed by real sockets and OS tools.
    pub fn new(config: ScanConfig) -> Self {
        let system = Arc::new(OsSystemProbe::new(&config));
        Self::with_transport(config, Arc::new(TcpDialer), system)
    }

    pub fn with_transport(
        config: ScanConfig,
        dialer: Arc<dyn Dialer>,
        system: Arc<dyn SystemProbe>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            config,
            dialer,
            system,
            interfaces: Arc::new(OsInterfaces),
            cancel: CancelToken::new(),
            events: EventSink {
                scan_id: id,
                tx: None,
            },
        }
    }

    pub fn with_interfaces(mut self, interfaces: Arc<dyn InterfaceSource>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Publishes progress events on `tx`. A closed receiver is ignored.
    pub fn with_events(mut self, tx: UnboundedSender<ScanEvent>) -> Self {
        self.events.tx = Some(tx);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Token that stops the run from admitting further work when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Resolves `target` (or the local subnet when `None`), validates `ports`,
    /// and runs the full pipeline.
    ///
    /// Target and port-range errors abort before any probing. Unreachable
    /// hosts and closed ports only shrink the report. A cancelled run returns
    /// [`ScanError::Cancelled`] and its partial results are dropped.
    pub async fn run(&self, target: Option<&str>, ports: &str) -> Result<ScanReport> {
        let started = Instant::now();
        let scan_time = Utc::now().trunc_subsecs(0);
        let target = self.resolve_target(target)?;
        let ports: PortRange = ports.parse()?;

        tracing::info!(
            scan_id = %self.id,
            target = %target,
            candidates = target.len(),
            ports = %ports,
            strategy = ?self.config.strategy,
            "Starting scan"
        );
        self.emit(EventPayload::ScanStarted {
            target: target.to_string(),
            candidates: target.len(),
        });

        // Liveness over every candidate; hosts are announced as they are confirmed.
        let prober = Arc::new(LivenessProber::new(
            &self.config,
            self.dialer.clone(),
            self.system.clone(),
        ));
        let discovery = TaskRunner::new(self.config.discovery_concurrency, self.cancel.clone());
        let events = self.events.clone();
        let active = prober
            .find_active(target.iter(), &discovery, move |host| {
                events.emit(EventPayload::HostDiscovered {
                    address: host.addr,
                    method: host.method,
                    hostname: host.hostname.clone(),
                });
            })
            .await;
        self.check_cancelled("discovery")?;

        tracing::info!(scan_id = %self.id, active = active.len(), "Liveness probing complete");

        // Port scan, one host at a time in confirmation order.
        let scanner = Arc::new(PortScanner::new(&self.config, self.dialer.clone()));
        let port_runner = TaskRunner::new(self.config.port_concurrency, self.cancel.clone());
        let mut records = Vec::with_capacity(active.len());

        for host in active {
            self.check_cancelled("port scan")?;
            let open = scanner.scan_host(host.addr, ports, &port_runner).await;
            for port in &open {
                self.emit(EventPayload::PortOpened {
                    address: host.addr,
                    port: port.port,
                    service: port.service.clone(),
                });
            }

            let hostname = host
                .hostname
                .unwrap_or_else(|| placeholder_hostname(host.addr));
            records.push(HostScanRecord::new(host.addr, hostname, open));
        }
        self.check_cancelled("port scan")?;

        let report = ScanReport::new(target.to_string(), scan_time, records);
        let duration_ms = started.elapsed().as_millis() as u64;

        self.emit(EventPayload::ScanCompleted {
            hosts_found: report.hosts_found.len() as u32,
            open_ports: report.open_port_count() as u32,
            duration_ms,
        });
        tracing::info!(
            scan_id = %self.id,
            target = %report.subnet,
            hosts = report.hosts_found.len(),
            open_ports = report.open_port_count(),
            duration_ms,
            "Scan complete"
        );

        Ok(report)
    }

    fn resolve_target(&self, target: Option<&str>) -> Result<ScanTarget> {
        if let Some(raw) = target {
            return Ok(raw.parse::<ScanTarget>()?);
        }

        let subnets = self.interfaces.subnets()?;
        let chosen = select_default_subnet(&subnets).ok_or(NetsweepError::NoUsableInterface)?;
        tracing::info!(
            interface = %chosen.interface_name,
            address = %chosen.address,
            cidr = %chosen.cidr,
            "Auto-detected subnet"
        );
        Ok(ScanTarget::Cidr(chosen.cidr))
    }

    fn check_cancelled(&self, stage: &str) -> Result<()> {
        if !self.cancel.is_cancelled() {
            return Ok(());
        }
        tracing::warn!(scan_id = %self.id, stage, "Scan cancelled, discarding partial results");
        self.emit(EventPayload::ScanCancelled {
            stage: stage.to_string(),
        });
        Err(ScanError::Cancelled {
            stage: stage.to_string(),
        })
    }

    fn emit(&self, payload: EventPayload) {
        self.events.emit(payload);
    }
}

/// One-shot scan with default configuration, real sockets, and OS tools.
pub async fn run_scan(target: &str, ports: &str) -> Result<ScanReport> {
    ScanSession::new(ScanConfig::default())
        .run(Some(target), ports)
        .await
}
