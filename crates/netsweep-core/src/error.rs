use thiserror::Error;

/// Errors that abort a whole scan run.
///
/// Per-host and per-port failures never surface here; they only shrink the
/// report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetsweepError {
    #[error("Invalid CIDR '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },

    #[error("Invalid IP range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },

    #[error("Invalid port range '{input}': {reason}")]
    InvalidPortRange { input: String, reason: String },

    #[error("No usable network interface found for subnet auto-detection")]
    NoUsableInterface,
}

pub type Result<T> = std::result::Result<T, NetsweepError>;
