//! Core modules for Sitwatch

pub mod machine;
pub mod metrics;
pub mod source;
pub mod sink;
pub mod monitor;
pub mod settings;
pub mod api;

pub use machine::PostureStateMachine;
pub use metrics::{Keypoint, Landmarks, MetricsCalculator, PostureMetrics};
pub use source::{LineSource, Sample, SampleInput, SignalSource};
pub use sink::{AlertSink, CommandSink, LogSink};
pub use monitor::{Monitor, SessionStats};
pub use settings::{AlertSettings, DetectionSettings, ServerSettings, Settings};
pub use api::{create_router, run_server};
