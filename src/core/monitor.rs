//! Monitor: wires a signal source, one state machine and the alert sinks
//!
//! Invalid samples are counted, logged and dropped here; the state machine
//! only reports them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::machine::PostureStateMachine;
use crate::core::metrics::MetricsCalculator;
use crate::core::sink::AlertSink;
use crate::core::source::{Sample, SampleInput, SignalSource};
use crate::types::{Event, InputError, MachineConfig, PostureState, StateOutput, Timestamp};

/// Counters for one monitoring session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    /// Accepted samples
    pub samples: u64,
    /// Accepted samples without a usable detection
    pub missing: u64,
    /// Rejected samples
    pub rejected: u64,
    pub alerts: u64,
    /// Confirmations whose alert was held back by the cooldown
    pub suppressed: u64,
    pub first_at: Option<Timestamp>,
    pub last_at: Option<Timestamp>,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            samples: 0,
            missing: 0,
            rejected: 0,
            alerts: 0,
            suppressed: 0,
            first_at: None,
            last_at: None,
        }
    }

    /// Session-clock span between the first and last accepted samples
    pub fn runtime_secs(&self) -> f64 {
        match (self.first_at, self.last_at) {
            (Some(first), Some(last)) => last.saturating_since(first).as_secs_f64(),
            _ => 0.0,
        }
    }

    /// Runtime as HH:MM:SS
    pub fn runtime_string(&self) -> String {
        let total = self.runtime_secs() as u64;
        format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    }
}

/// One monitored subject
pub struct Monitor {
    machine: PostureStateMachine,
    metrics: MetricsCalculator,
    sinks: Vec<Box<dyn AlertSink>>,
    stats: SessionStats,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("machine", &self.machine)
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(MachineConfig::default(), MetricsCalculator::default())
    }
}

impl Monitor {
    pub fn new(config: MachineConfig, metrics: MetricsCalculator) -> Self {
        Self {
            machine: PostureStateMachine::new(config),
            metrics,
            sinks: Vec::new(),
            stats: SessionStats::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.add_sink(sink);
        self
    }

    /// Process one sample: derive the signal, step the machine, dispatch alerts.
    pub fn process(&mut self, sample: Sample) -> Result<StateOutput, InputError> {
        // checked before the smoother sees the frame, so a rejected sample leaves no trace
        if let Some(previous) = self.machine.last_sample_at() {
            if sample.at < previous {
                return Err(self.reject(InputError::NonMonotonicTimestamp { previous, got: sample.at }));
            }
        }

        // invalid landmark frames are rejected before they reach the smoothing window
        let signal = match sample.input {
            SampleInput::Signal(value) => value,
            SampleInput::Landmarks(landmarks) => match self.metrics.signal(landmarks.as_ref()) {
                Ok(signal) => signal,
                Err(e) => return Err(self.reject(e)),
            },
        };

        let events = match self.machine.on_sample(sample.at, signal) {
            Ok(events) => events,
            Err(e) => return Err(self.reject(e)),
        };

        self.stats.samples += 1;
        if signal.is_none() {
            self.stats.missing += 1;
        }
        self.stats.first_at.get_or_insert(sample.at);
        self.stats.last_at = Some(sample.at);

        for event in &events {
            match event {
                Event::Alert { .. } => {
                    self.stats.alerts += 1;
                    self.dispatch(event);
                }
                Event::Confirmed { alerted: false, .. } => {
                    self.stats.suppressed += 1;
                    info!(at = %event.at(), "sit-up confirmed, alert suppressed by cooldown");
                }
                _ => info!(at = %event.at(), "{}", event.description()),
            }
        }

        Ok(self.machine.snapshot(sample.at, signal, events))
    }

    /// Drain a source, handing each output to `on_output`. Malformed or
    /// out-of-order samples are logged and skipped.
    pub fn run<S, F>(&mut self, source: &mut S, mut on_output: F) -> &SessionStats
    where
        S: SignalSource + ?Sized,
        F: FnMut(&StateOutput),
    {
        while let Some(next) = source.next_sample() {
            let sample = match next {
                Ok(sample) => sample,
                Err(e) => {
                    self.reject(e);
                    continue;
                }
            };
            if let Ok(output) = self.process(sample) {
                on_output(&output);
            }
        }
        &self.stats
    }

    fn dispatch(&mut self, event: &Event) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.deliver(event) {
                error!(sink = sink.name(), error = %e, "alert delivery failed");
            }
        }
    }

    fn reject(&mut self, e: InputError) -> InputError {
        self.stats.rejected += 1;
        warn!(error = %e, "sample rejected");
        e
    }

    /// Current state without feeding a sample
    pub fn current_output(&self) -> StateOutput {
        let now = self.machine.last_sample_at().unwrap_or(Timestamp::ZERO);
        self.machine.snapshot(now, None, Vec::new())
    }

    pub fn state(&self) -> PostureState {
        self.machine.state()
    }

    pub fn machine(&self) -> &PostureStateMachine {
        &self.machine
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Restart the session: machine, smoother and counters
    pub fn reset(&mut self) {
        self.machine.reset();
        self.metrics.clear();
        self.stats = SessionStats::new();
    }
}
