//! Posture state machine: debounced lying → sitting detection
//!
//! State transitions:
//! - LYING_DOWN → PENDING_SIT_UP: signal > threshold
//! - PENDING_SIT_UP → CONFIRMED_SIT_UP: signal held > threshold for the persistence duration
//! - PENDING_SIT_UP → LYING_DOWN: signal ≤ threshold or missing (reverted)
//! - CONFIRMED_SIT_UP → LYING_DOWN: signal ≤ threshold or missing
//!
//! The alert cooldown is only consulted at the moment of confirmation, so one
//! continuous sitting episode alerts at most once. A missing signal counts as
//! "not sitting". Timestamps come from the caller; the machine reads no clock.

use std::time::Duration;
use tracing::debug;

use crate::types::{Event, InputError, MachineConfig, PostureState, StateOutput, Timestamp};

/// Single-subject posture state machine
#[derive(Debug, Clone)]
pub struct PostureStateMachine {
    config: MachineConfig,
    /// Current state (the pending timer lives inside `PendingSitUp`)
    state: PostureState,
    /// When the last alert fired; never decreases
    last_alert_at: Option<Timestamp>,
    /// Timestamp of the last accepted sample, for monotonicity checks
    last_sample_at: Option<Timestamp>,
    /// When the current state was entered
    state_entered_at: Option<Timestamp>,
    /// Number of accepted samples
    sample_count: u64,
}

impl Default for PostureStateMachine {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl PostureStateMachine {
    /// Create a machine in `LyingDown` with no pending timer and no alert history
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            state: PostureState::LyingDown,
            last_alert_at: None,
            last_sample_at: None,
            state_entered_at: None,
            sample_count: 0,
        }
    }

    /// Feed one sample and return the events it produced.
    ///
    /// Rejects timestamps earlier than the previous accepted sample and
    /// non-finite signals; a rejected sample leaves the machine unchanged.
    pub fn on_sample(&mut self, at: Timestamp, signal: Option<f64>) -> Result<Vec<Event>, InputError> {
        if let Some(previous) = self.last_sample_at {
            if at < previous {
                return Err(InputError::NonMonotonicTimestamp { previous, got: at });
            }
        }
        if let Some(value) = signal {
            if !value.is_finite() {
                return Err(InputError::NonFiniteSignal(value));
            }
        }

        self.last_sample_at = Some(at);
        self.sample_count += 1;
        if self.state_entered_at.is_none() {
            self.state_entered_at = Some(at);
        }

        let is_sitting = signal.is_some_and(|v| v > self.config.posture_threshold());
        let mut events = Vec::new();

        match (self.state, is_sitting) {
            (PostureState::LyingDown, true) => {
                self.enter(PostureState::PendingSitUp { since: at }, at);
                events.push(Event::PendingStarted { at });
            }
            (PostureState::LyingDown, false) => {}

            (PostureState::PendingSitUp { since }, true) => {
                let held = at.saturating_since(since);
                if held >= self.config.persistence() {
                    let alerted = self.cooldown_elapsed(at);
                    self.enter(PostureState::ConfirmedSitUp, at);
                    events.push(Event::Confirmed { at, held_ms: millis(held), alerted });
                    if alerted {
                        self.last_alert_at = Some(at);
                        events.push(Event::Alert { at });
                    }
                }
            }
            (PostureState::PendingSitUp { since }, false) => {
                let held = at.saturating_since(since);
                self.enter(PostureState::LyingDown, at);
                events.push(Event::Reverted { at, held_ms: millis(held) });
            }

            (PostureState::ConfirmedSitUp, true) => {}
            (PostureState::ConfirmedSitUp, false) => {
                self.enter(PostureState::LyingDown, at);
                events.push(Event::ReturnedToLyingDown { at });
            }
        }

        for event in &events {
            debug!(at = %at, signal = ?signal, event = event.code(), state = %self.state, "posture event");
        }

        Ok(events)
    }

    /// True if an alert may fire at `at`: no previous alert, or strictly more
    /// than the cooldown has passed since it.
    fn cooldown_elapsed(&self, at: Timestamp) -> bool {
        match self.last_alert_at {
            None => true,
            Some(last) => at.saturating_since(last) > self.config.alert_cooldown(),
        }
    }

    fn enter(&mut self, state: PostureState, at: Timestamp) {
        self.state = state;
        self.state_entered_at = Some(at);
    }

    /// Get current state
    pub fn state(&self) -> PostureState {
        self.state
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Start of the pending window; `Some` iff the state is `PendingSitUp`
    pub fn pending_since(&self) -> Option<Timestamp> {
        self.state.pending_since()
    }

    pub fn last_alert_at(&self) -> Option<Timestamp> {
        self.last_alert_at
    }

    pub fn last_sample_at(&self) -> Option<Timestamp> {
        self.last_sample_at
    }

    /// When the current state was entered (first sample for the initial state)
    pub fn state_entered_at(&self) -> Option<Timestamp> {
        self.state_entered_at
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// How long the sitting signal has held, if pending
    pub fn pending_elapsed(&self, now: Timestamp) -> Option<Duration> {
        self.pending_since().map(|since| now.saturating_since(since))
    }

    /// Time until another alert may fire; zero when none is blocking
    pub fn cooldown_remaining(&self, now: Timestamp) -> Duration {
        match self.last_alert_at {
            None => Duration::ZERO,
            Some(last) => self.config.alert_cooldown().saturating_sub(now.saturating_since(last)),
        }
    }

    /// Current state as an output record without feeding a sample
    pub fn snapshot(&self, now: Timestamp, signal: Option<f64>, events: Vec<Event>) -> StateOutput {
        StateOutput::new(
            now,
            signal,
            self.state,
            self.pending_elapsed(now).map(millis).unwrap_or(0),
            millis(self.cooldown_remaining(now)),
            events,
        )
    }

    /// Reset to the initial state, keeping the configuration
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// TESTS
// =============================================================================
