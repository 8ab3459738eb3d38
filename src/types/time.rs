//! Monotonic sample timestamps
//!
//! A `Timestamp` is an offset from an arbitrary session epoch, with
//! millisecond resolution. The state machine only ever compares timestamps
//! it was given, so tests can use synthetic clocks.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::types::InputError;

/// Largest offset accepted from floating point seconds (about 292 million years)
const MAX_SECS: f64 = (u64::MAX / 1000) as f64;

/// Milliseconds since the session epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Convert floating point seconds, rounding to the nearest millisecond.
    pub fn from_secs_f64(secs: f64) -> Result<Self, InputError> {
        if !secs.is_finite() || secs < 0.0 || secs > MAX_SECS {
            return Err(InputError::InvalidTimestamp(secs));
        }
        Ok(Self((secs * 1000.0).round() as u64))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        let ms = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(ms))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Live clock for callers sampling in real time
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    epoch: Instant,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    /// Start a clock whose epoch is now
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    pub fn now(&self) -> Timestamp {
        let ms = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        Timestamp(ms)
    }
}
