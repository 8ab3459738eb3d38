//! Per-sample output for terminal, JSON and live updates

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::types::{Event, PostureKind, PostureState, Timestamp};

/// Output structure for each processed sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateOutput {
    /// Wall-clock time the output was produced
    pub recorded_at: DateTime<Utc>,
    /// Sample timestamp (session clock)
    pub at: Timestamp,
    /// Signal fed to the machine; `None` when the subject was not detected
    pub signal: Option<f64>,
    /// State after the sample
    pub state: PostureState,
    /// How long the sitting signal has held while pending (milliseconds)
    pub pending_ms: u64,
    /// Remaining alert cooldown (milliseconds)
    pub cooldown_remaining_ms: u64,
    /// Events produced by this sample, in order
    pub events: Vec<Event>,
}

impl StateOutput {
    pub fn new(
        at: Timestamp,
        signal: Option<f64>,
        state: PostureState,
        pending_ms: u64,
        cooldown_remaining_ms: u64,
        events: Vec<Event>,
    ) -> Self {
        Self {
            recorded_at: Utc::now(),
            at,
            signal,
            state,
            pending_ms,
            cooldown_remaining_ms,
            events,
        }
    }

    pub fn has_alert(&self) -> bool {
        self.events.iter().any(Event::is_alert)
    }

    fn signal_string(&self) -> String {
        match self.signal {
            Some(v) => format!("{:.3}", v),
            None => "none".to_string(),
        }
    }

    fn events_string(&self) -> String {
        if self.events.is_empty() {
            return "-".to_string();
        }
        self.events.iter().map(Event::code).collect::<Vec<_>>().join(",")
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let kind = self.state.kind();

        format!(
            "{}{} t={} | vdiff={} | state={} | pending={:.1}s | {}{}",
            kind.color_code(),
            kind.emoji(),
            self.at,
            self.signal_string(),
            kind,
            self.pending_ms as f64 / 1000.0,
            self.events_string(),
            PostureKind::color_reset()
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "t={} | vdiff={} | state={} | pending={:.1}s | events={}",
            self.at,
            self.signal_string(),
            self.state,
            self.pending_ms as f64 / 1000.0,
            self.events_string()
        )
    }
}
