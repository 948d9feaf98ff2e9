//! netsweep-core: Shared data model, events, and error types for netsweep.
//!
//! This crate provides the foundational types used by the scanning engine
//! and by anything that consumes its output (CLI, GUI, exporters):
//! - Scan targets and per-host liveness verdicts
//! - Port probe results, per-host records, and the final scan report
//! - Scan lifecycle events for progress reporting
//! - The fatal error taxonomy surfaced to callers

pub mod error;
pub mod events;
pub mod types;

pub use error::NetsweepError;
pub use types::{
    DiscoveryMethod, HostScanRecord, LivenessResult, PortProbeResult, PortRange, Protocol,
    ScanReport, Target,
};
