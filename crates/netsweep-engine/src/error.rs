//! Error types for the netsweep-engine crate.

use netsweep_core::NetsweepError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{0}")]
    Target(#[from] NetsweepError),

    #[error("Interface enumeration failed: {0}")]
    Interface(String),

    #[error("Scan cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
