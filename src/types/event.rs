//! Events emitted by the posture state machine

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// One observable outcome of a sample. A single sample yields an ordered,
/// possibly empty list of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// Sitting signal first seen; persistence timer started
    PendingStarted { at: Timestamp },
    /// Sitting held long enough; `alerted` is false when cooldown suppressed the alert
    Confirmed { at: Timestamp, held_ms: u64, alerted: bool },
    /// User-visible alert; always directly follows a `Confirmed { alerted: true }`
    Alert { at: Timestamp },
    /// Sitting signal dropped before confirmation
    Reverted { at: Timestamp, held_ms: u64 },
    /// Confirmed subject lay back down
    ReturnedToLyingDown { at: Timestamp },
}

impl Event {
    pub fn at(&self) -> Timestamp {
        match self {
            Event::PendingStarted { at }
            | Event::Confirmed { at, .. }
            | Event::Alert { at }
            | Event::Reverted { at, .. }
            | Event::ReturnedToLyingDown { at } => *at,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Event::Alert { .. })
    }

    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Event::PendingStarted { .. } => "PENDING_STARTED",
            Event::Confirmed { .. } => "CONFIRMED",
            Event::Alert { .. } => "ALERT",
            Event::Reverted { .. } => "REVERTED",
            Event::ReturnedToLyingDown { .. } => "RETURNED_TO_LYING_DOWN",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Event::PendingStarted { .. } => "Posture change started",
            Event::Confirmed { alerted: true, .. } => "Sitting up confirmed",
            Event::Confirmed { alerted: false, .. } => "Sitting up confirmed (alert in cooldown)",
            Event::Alert { .. } => "Person sat up!",
            Event::Reverted { .. } => "Posture reverted before confirmation",
            Event::ReturnedToLyingDown { .. } => "Person returned to lying down",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
