//! Error types
//!
//! `ConfigError` is fatal at construction time, `InputError` is local to one
//! sample and leaves the machine untouched. Neither is retryable: nothing in
//! the core performs I/O.

use thiserror::Error;

use crate::types::Timestamp;

/// Invalid construction parameters or settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("posture threshold must be finite and > 0, got {0}")]
    NonPositiveThreshold(f64),

    #[error("persistence duration must be > 0")]
    ZeroPersistence,

    #[error("{field} must not be negative, got {value}")]
    NegativeDuration { field: &'static str, value: f64 },

    #[error("{field} is too large, got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("smoothing window must hold at least one frame")]
    InvalidSmoothing,

    #[error("min confidence must be within [0, 1], got {0}")]
    InvalidConfidence(f64),

    #[error("alert command must name a program")]
    EmptyCommand,

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Malformed sample; the sample is rejected and state is unchanged
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("timestamp went backwards: {got} after {previous}")]
    NonMonotonicTimestamp { previous: Timestamp, got: Timestamp },

    #[error("signal value is not finite: {0}")]
    NonFiniteSignal(f64),

    #[error("landmark coordinates are not finite")]
    NonFiniteLandmarks,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Alert delivery failure
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("alert command exited with {status}")]
    Command { status: String },

    #[error("alert delivery failed: {0}")]
    Io(#[from] std::io::Error),
}
