//! JSON and CSV projections of a [`ScanReport`].

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use netsweep_core::{HostScanRecord, ScanReport};

use crate::error::{Result, ScanError};

/// Pretty-printed JSON document.
pub fn to_json(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn write_json(report: &ScanReport, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    serde_json::to_writer_pretty(&mut file, report)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// One row per host: `IP,Hostname,Status,OpenPorts`.
pub fn write_hosts_csv<W: Write>(report: &ScanReport, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["IP", "Hostname", "Status", "OpenPorts"])?;
    for host in &report.hosts_found {
        let open = host.open_port_count().to_string();
        csv.write_record([
            host.address.to_string().as_str(),
            host.hostname.as_str(),
            "Active",
            open.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// One row per open port of `host`: `Port,Status,Service,Protocol,ResponseTime`.
pub fn write_ports_csv<W: Write>(host: &HostScanRecord, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Port", "Status", "Service", "Protocol", "ResponseTime"])?;
    for port in &host.open_ports {
        let status = if port.is_open { "Open" } else { "Closed" };
        let rtt = port
            .response_time
            .map(|d| format!("{d:?}"))
            .unwrap_or_else(|| "N/A".to_string());
        csv.write_record([
            port.port.to_string().as_str(),
            status,
            port.service.as_str(),
            port.protocol.to_string().as_str(),
            rtt.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn hosts_csv(report: &ScanReport) -> Result<String> {
    let mut buf = Vec::new();
    write_hosts_csv(report, &mut buf)?;
    into_string(buf)
}

pub fn ports_csv(host: &HostScanRecord) -> Result<String> {
    let mut buf = Vec::new();
    write_ports_csv(host, &mut buf)?;
    into_string(buf)
}

/// File name for a host's port listing, e.g. `ports-192-168-1-10.csv`.
pub fn ports_csv_file_name(host: &HostScanRecord) -> String {
    format!("ports-{}.csv", host.address.to_string().replace('.', "-"))
}

fn into_string(buf: Vec<u8>) -> Result<String> {
    String::from_utf8(buf).map_err(|e| ScanError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use netsweep_core::PortProbeResult;

    use super::*;

    fn sample() -> ScanReport {
        let ports = vec![
            PortProbeResult::open(443, "HTTPS"),
            PortProbeResult::open(22, "SSH")
                .with_banner(Some("SSH-2.0-Test".to_string()))
                .with_response_time(Duration::from_millis(4)),
        ];
        let host = HostScanRecord::new(
            Ipv4Addr::new(192, 168, 1, 10),
            "nas, upstairs".to_string(),
            ports,
        );
        let scan_time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        ScanReport::new("192.168.1.0/24".to_string(), scan_time, vec![host])
    }

    #[test]
    fn hosts_csv_layout() {
        let csv = hosts_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "IP,Hostname,Status,OpenPorts");
        assert_eq!(lines[1], "192.168.1.10,\"nas, upstairs\",Active,2");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn ports_csv_layout() {
        let report = sample();
        let csv = ports_csv(&report.hosts_found[0]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Port,Status,Service,Protocol,ResponseTime");
        assert_eq!(lines[1], "22,Open,SSH,tcp,4ms");
        assert_eq!(lines[2], "443,Open,HTTPS,tcp,N/A");
    }

    #[test]
    fn json_shape() {
        let json = to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["scan_time"], "2024-05-01T12:30:00Z");
        assert_eq!(value["hosts_found"][0]["open_ports"][0]["port"], 22);
        assert_eq!(value["hosts_found"][0]["open_ports"][0]["banner"], "SSH-2.0-Test");
    }

    #[test]
    fn json_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = sample();

        write_json(&report, &path).unwrap();
        let restored: ScanReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(restored.subnet, report.subnet);
        assert_eq!(restored.hosts_found[0].open_ports.len(), 2);
        assert!(restored.hosts_found[0].open_ports.iter().all(|p| p.is_open));
    }

    #[test]
    fn port_file_name() {
        let report = sample();
        assert_eq!(
            ports_csv_file_name(&report.hosts_found[0]),
            "ports-192-168-1-10.csv"
        );
    }
}
