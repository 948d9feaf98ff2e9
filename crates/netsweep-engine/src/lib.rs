//! netsweep-engine: Concurrent host discovery and TCP port scanning.
//!
//! Expands a CIDR block or address range into targets, classifies each as
//! active or inactive through a chain of liveness checks (ICMP echo, TCP
//! probe, ARP table), connect-scans the active hosts, and assembles a
//! [`ScanReport`](netsweep_core::ScanReport). All concurrency goes through a
//! semaphore-bounded [`runner::TaskRunner`].

pub mod banner;
pub mod config;
pub mod error;
pub mod export;
pub mod interfaces;
pub mod liveness;
pub mod portscan;
pub mod runner;
pub mod services;
pub mod session;
pub mod system;
pub mod targets;
pub mod transport;
pub mod vendor;

pub use config::{DiscoveryStrategy, ScanConfig};
pub use error::{Result, ScanError};
pub use runner::{CancelToken, TaskRunner};
pub use session::{run_scan, ScanSession};
pub use targets::ScanTarget;
