//! Settings file (TOML)
//!
//! Precedence: built-in defaults < settings file < command-line flags.
//!
//! ```toml
//! [detection]
//! posture_threshold = 0.2
//! persistence_secs = 5.0
//! cooldown_secs = 30.0
//! min_confidence = 0.5
//! smoothing_frames = 3
//!
//! [alert]
//! bell = true
//! command = ["notify-send", "Sitwatch"]
//!
//! [server]
//! addr = "127.0.0.1:3000"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::metrics::MetricsCalculator;
use crate::core::sink::{AlertSink, CommandSink, LogSink};
use crate::types::{ConfigError, MachineConfig};
use crate::{
    DEFAULT_ALERT_COOLDOWN_MS, DEFAULT_MIN_CONFIDENCE, DEFAULT_PERSISTENCE_MS,
    DEFAULT_POSTURE_THRESHOLD, DEFAULT_SERVER_ADDR, DEFAULT_SMOOTHING_FRAMES,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub detection: DetectionSettings,
    pub alert: AlertSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionSettings {
    pub posture_threshold: f64,
    pub persistence_secs: f64,
    pub cooldown_secs: f64,
    pub min_confidence: f64,
    pub smoothing_frames: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            posture_threshold: DEFAULT_POSTURE_THRESHOLD,
            persistence_secs: DEFAULT_PERSISTENCE_MS as f64 / 1000.0,
            cooldown_secs: DEFAULT_ALERT_COOLDOWN_MS as f64 / 1000.0,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            smoothing_frames: DEFAULT_SMOOTHING_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertSettings {
    /// Ring the terminal bell on alert
    pub bell: bool,
    /// External notifier argv; empty for none
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { addr: DEFAULT_SERVER_ADDR.to_string() }
    }
}

impl Settings {
    /// Load and validate a settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every value that would otherwise fail later at construction
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.machine_config()?;
        self.detection.metrics_calculator()?;
        if self.alert.command.first().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyCommand);
        }
        Ok(())
    }

    /// Sinks described by the `[alert]` table; the log sink is always present
    pub fn sinks(&self) -> Vec<Box<dyn AlertSink>> {
        let mut sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(LogSink::new(self.alert.bell))];
        if let Some(cmd) = CommandSink::from_argv(&self.alert.command) {
            sinks.push(Box::new(cmd));
        }
        sinks
    }
}

impl DetectionSettings {
    pub fn machine_config(&self) -> Result<MachineConfig, ConfigError> {
        MachineConfig::from_secs(self.posture_threshold, self.persistence_secs, self.cooldown_secs)
    }

    pub fn metrics_calculator(&self) -> Result<MetricsCalculator, ConfigError> {
        MetricsCalculator::new(self.smoothing_frames, self.min_confidence)
    }
}
