//! Machine configuration

use serde::Serialize;
use std::time::Duration;

use crate::types::ConfigError;
use crate::{DEFAULT_ALERT_COOLDOWN_MS, DEFAULT_PERSISTENCE_MS, DEFAULT_POSTURE_THRESHOLD};

/// Immutable detection parameters, validated once at construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MachineConfig {
    posture_threshold: f64,
    persistence: Duration,
    alert_cooldown: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            posture_threshold: DEFAULT_POSTURE_THRESHOLD,
            persistence: Duration::from_millis(DEFAULT_PERSISTENCE_MS),
            alert_cooldown: Duration::from_millis(DEFAULT_ALERT_COOLDOWN_MS),
        }
    }
}

impl MachineConfig {
    /// Build a config; threshold must be > 0 and persistence non-zero
    pub fn new(
        posture_threshold: f64,
        persistence: Duration,
        alert_cooldown: Duration,
    ) -> Result<Self, ConfigError> {
        if !posture_threshold.is_finite() || posture_threshold <= 0.0 {
            return Err(ConfigError::NonPositiveThreshold(posture_threshold));
        }
        if persistence.is_zero() {
            return Err(ConfigError::ZeroPersistence);
        }
        Ok(Self {
            posture_threshold,
            persistence,
            alert_cooldown,
        })
    }

    /// Build a config from second counts, as found in settings files and flags
    pub fn from_secs(
        posture_threshold: f64,
        persistence_secs: f64,
        cooldown_secs: f64,
    ) -> Result<Self, ConfigError> {
        let persistence = secs_to_duration("persistence_secs", persistence_secs)?;
        let cooldown = secs_to_duration("cooldown_secs", cooldown_secs)?;
        Self::new(posture_threshold, persistence, cooldown)
    }

    pub fn posture_threshold(&self) -> f64 {
        self.posture_threshold
    }

    pub fn persistence(&self) -> Duration {
        self.persistence
    }

    pub fn alert_cooldown(&self) -> Duration {
        self.alert_cooldown
    }
}

fn secs_to_duration(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if secs < 0.0 {
        return Err(ConfigError::NegativeDuration { field, value: secs });
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::OutOfRange { field, value: secs })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_constants() {
        let config = MachineConfig::default();
        assert_eq!(config.posture_threshold(), 0.2);
        assert_eq!(config.persistence(), Duration::from_secs(5));
        assert_eq!(config.alert_cooldown(), Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        for bad in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let result = MachineConfig::new(bad, Duration::from_secs(1), Duration::ZERO);
            assert!(matches!(result, Err(ConfigError::NonPositiveThreshold(_))));
        }
    }

    #[test]
    fn test_rejects_zero_persistence() {
        let result = MachineConfig::new(0.2, Duration::ZERO, Duration::ZERO);
        assert!(matches!(result, Err(ConfigError::ZeroPersistence)));

        let result = MachineConfig::from_secs(0.2, 0.0, 10.0);
        assert!(matches!(result, Err(ConfigError::ZeroPersistence)));
    }

    #[test]
    fn test_rejects_negative_cooldown() {
        let result = MachineConfig::from_secs(0.2, 5.0, -1.0);
        assert!(matches!(
            result,
            Err(ConfigError::NegativeDuration { field: "cooldown_secs", .. })
        ));
    }

    #[test]
    fn test_zero_cooldown_is_allowed() {
        let config = MachineConfig::from_secs(0.2, 5.0, 0.0).unwrap();
        assert_eq!(config.alert_cooldown(), Duration::ZERO);
    }

    #[test]
    fn test_rejects_durations_too_large() {
        let result = MachineConfig::from_secs(0.2, 5.0, 1e20);
        assert!(matches!(result, Err(ConfigError::OutOfRange { field: "cooldown_secs", .. })));

        let result = MachineConfig::from_secs(0.2, 1e20, 30.0);
        assert!(matches!(result, Err(ConfigError::OutOfRange { field: "persistence_secs", .. })));
    }

    #[test]
    fn test_rejects_non_finite_seconds() {
        let result = MachineConfig::from_secs(0.2, f64::NAN, 1.0);
        assert!(matches!(result, Err(ConfigError::NonFinite { field: "persistence_secs" })));
    }
}
