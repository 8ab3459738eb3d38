//! Sitwatch: debounced lying-to-sitting posture monitor
//!
//! Signal source → PostureStateMachine → events → alert sinks / log / UI.
//! The state machine in [`core::machine`] is a pure transducer: it reads no
//! clock and performs no I/O, so every behaviour can be driven with
//! synthetic timestamps.

pub mod core;
pub mod types;

// =============================================================================
// DETECTION DEFAULTS
// =============================================================================

/// Minimum vertical diff (hip y - shoulder y, normalized) classified as sitting
pub const DEFAULT_POSTURE_THRESHOLD: f64 = 0.2;

/// How long the sitting signal must hold before it is confirmed (milliseconds)
pub const DEFAULT_PERSISTENCE_MS: u64 = 5_000;

/// Minimum gap between two alerts (milliseconds)
pub const DEFAULT_ALERT_COOLDOWN_MS: u64 = 30_000;

// =============================================================================
// SIGNAL DERIVATION DEFAULTS
// =============================================================================

/// Landmarks with mean visibility below this are treated as "no detection"
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Frames averaged by the metrics smoother
pub const DEFAULT_SMOOTHING_FRAMES: usize = 3;

// =============================================================================
// SERVER
// =============================================================================

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:3000";

/// Capacity of each subject's live-update broadcast channel
pub const UPDATE_CHANNEL_CAPACITY: usize = 100;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
