//! Scan lifecycle events.
//!
//! A running scan session can publish these on a channel so that a CLI
//! spinner or GUI can show progress without sharing the session's state.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::DiscoveryMethod;

/// An event emitted by a scan session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub scan_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl ScanEvent {
    pub fn new(scan_id: Uuid, payload: EventPayload) -> Self {
        Self {
            scan_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// The event payload, tagged by type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    /// Enumeration finished and liveness probing is about to start.
    ScanStarted { target: String, candidates: u64 },
    /// A host was confirmed active.
    HostDiscovered {
        address: Ipv4Addr,
        method: DiscoveryMethod,
        hostname: Option<String>,
    },
    /// A port accepted a connection.
    PortOpened {
        address: Ipv4Addr,
        port: u16,
        service: String,
    },
    /// The report was assembled.
    ScanCompleted {
        hosts_found: u32,
        open_ports: u32,
        duration_ms: u64,
    },
    /// A stop was requested; results gathered so far are discarded.
    ScanCancelled { stage: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_roundtrip() {
        let event = ScanEvent::new(
            Uuid::new_v4(),
            EventPayload::HostDiscovered {
                address: Ipv4Addr::new(192, 168, 1, 10),
                method: DiscoveryMethod::TcpProbe,
                hostname: Some("nas.local".to_string()),
            },
        );

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: ScanEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.scan_id, deserialized.scan_id);
        assert_eq!(event.payload, deserialized.payload);
    }

    #[test]
    fn event_payload_tags() {
        let payload = EventPayload::PortOpened {
            address: Ipv4Addr::new(10, 0, 0, 1),
            port: 22,
            service: "SSH".to_string(),
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"event_type\":\"PortOpened\""));
    }
}
