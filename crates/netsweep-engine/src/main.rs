//! CLI entry point for the netsweep scanner.

use std::fs::{self, File};
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use netsweep_core::events::EventPayload;
use netsweep_core::ScanReport;

use netsweep_engine::config::{DiscoveryStrategy, ScanConfig};
use netsweep_engine::export;
use netsweep_engine::{ScanError, ScanSession};

#[derive(Parser)]
#[command(name = "netsweep")]
#[command(about = "Discover live hosts and open TCP ports on a subnet or address range")]
struct Cli {
    /// Target: CIDR (192.168.1.0/24), range (10.0.0.1-10.0.0.50), or single
    /// address. Defaults to the local subnet.
    #[arg(short, long)]
    target: Option<String>,

    /// Port range to scan, e.g. 20-1024 (default from config).
    #[arg(short, long)]
    ports: Option<String>,

    /// Liveness strategy: combined, tcp, icmp.
    #[arg(short, long)]
    strategy: Option<String>,

    /// Maximum concurrent liveness probes.
    #[arg(long)]
    discovery_concurrency: Option<usize>,

    /// Maximum concurrent port connects per host.
    #[arg(long)]
    port_concurrency: Option<usize>,

    /// Write the JSON report to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the host list as CSV to this file.
    #[arg(long)]
    csv_hosts: Option<PathBuf>,

    /// Write one port-list CSV per host into this directory.
    #[arg(long)]
    csv_ports: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Config file prefix (default: netsweep).
    #[arg(short, long, default_value = "netsweep")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let mut scan_config = load_scan_config(&cli.config)?;
    if let Some(s) = &cli.strategy {
        scan_config.strategy = parse_strategy(s)?;
    }
    if let Some(n) = cli.discovery_concurrency {
        scan_config.discovery_concurrency = n;
    }
    if let Some(n) = cli.port_concurrency {
        scan_config.port_concurrency = n;
    }
    let ports = cli
        .ports
        .clone()
        .unwrap_or_else(|| scan_config.default_port_range.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = ScanSession::new(scan_config).with_events(tx);

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping scan");
            cancel.cancel();
        }
    });

    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.payload {
                EventPayload::HostDiscovered {
                    address,
                    method,
                    hostname,
                } => {
                    eprintln!(
                        "  up  {address:<15}  {:<24}  via {method}",
                        hostname.unwrap_or_default()
                    );
                }
                EventPayload::PortOpened {
                    address,
                    port,
                    service,
                } => {
                    tracing::debug!(ip = %address, port, service = %service, "Open port");
                }
                _ => {}
            }
        }
    });

    let result = session.run(cli.target.as_deref(), &ports).await;
    drop(session);
    let _ = progress.await;

    let report = match result {
        Ok(report) => report,
        Err(ScanError::Cancelled { stage }) => {
            anyhow::bail!("Scan cancelled during {stage}; no results written")
        }
        Err(e) => return Err(e.into()),
    };

    print_summary(&report);
    write_outputs(&cli, &report)?;

    Ok(())
}

fn parse_strategy(s: &str) -> anyhow::Result<DiscoveryStrategy> {
    match s.to_lowercase().as_str() {
        "combined" => Ok(DiscoveryStrategy::Combined),
        "tcp" | "tcp_connect" | "tcp-connect" => Ok(DiscoveryStrategy::TcpConnect),
        "icmp" | "icmp_ping" | "icmp-ping" | "ping" => Ok(DiscoveryStrategy::IcmpPing),
        _ => anyhow::bail!("Invalid strategy: {s}. Choose: combined, tcp, icmp"),
    }
}

fn load_scan_config(file_prefix: &str) -> anyhow::Result<ScanConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("NETSWEEP")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(scan_config_from(&cfg))
}

/// Reads the `[scan]` section. A missing section means defaults; a malformed
/// one is logged and also falls back to defaults.
fn scan_config_from(cfg: &config::Config) -> ScanConfig {
    match cfg.get::<ScanConfig>("scan") {
        Ok(c) => c,
        Err(config::ConfigError::NotFound(_)) => ScanConfig::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid [scan] config, using defaults");
            ScanConfig::default()
        }
    }
}

fn print_summary(report: &ScanReport) {
    println!();
    println!(
        "Scan of {} at {}: {} host(s), {} open port(s)",
        report.subnet,
        report.scan_time.to_rfc3339(),
        report.hosts_found.len(),
        report.open_port_count()
    );
    for host in &report.hosts_found {
        println!();
        println!("{}  {}", host.address, host.hostname);
        if host.open_ports.is_empty() {
            println!("  (no open ports in range)");
        }
        for port in &host.open_ports {
            match &port.banner {
                Some(banner) => println!(
                    "  {:>5}/{}  {:<12} {banner}",
                    port.port, port.protocol, port.service
                ),
                None => println!("  {:>5}/{}  {}", port.port, port.protocol, port.service),
            }
        }
    }
}

fn write_outputs(cli: &Cli, report: &ScanReport) -> anyhow::Result<()> {
    if let Some(path) = &cli.output {
        export::write_json(report, path)?;
        tracing::info!(path = %path.display(), "Wrote JSON report");
    }

    if let Some(path) = &cli.csv_hosts {
        export::write_hosts_csv(report, File::create(path)?)?;
        tracing::info!(path = %path.display(), "Wrote host CSV");
    }

    if let Some(dir) = &cli.csv_ports {
        fs::create_dir_all(dir)?;
        for host in &report.hosts_found {
            let path = dir.join(export::ports_csv_file_name(host));
            export::write_ports_csv(host, File::create(&path)?)?;
        }
        tracing::info!(
            dir = %dir.display(),
            files = report.hosts_found.len(),
            "Wrote port CSVs"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> config::Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
    }

    #[test]
    fn scan_section_is_read() {
        let cfg = from_toml("[scan]\nport_concurrency = 500\n");
        assert_eq!(scan_config_from(&cfg).port_concurrency, 500);
    }

    #[test]
    fn malformed_scan_section_falls_back_to_defaults() {
        let cfg = from_toml("[scan]\nport_concurrency = \"lots\"\n");
        assert!(!matches!(
            cfg.get::<ScanConfig>("scan"),
            Err(config::ConfigError::NotFound(_))
        ));
        assert_eq!(scan_config_from(&cfg).port_concurrency, 100);
    }

    #[test]
    fn missing_scan_section_uses_defaults() {
        let cfg = from_toml("[other]\nkey = 1\n");
        assert_eq!(scan_config_from(&cfg).port_concurrency, 100);
    }
}
