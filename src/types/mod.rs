//! Core types for Sitwatch

mod time;
mod error;
mod config;
mod state;
mod event;
mod output;

pub use time::{Timestamp, SessionClock};
pub use error::{ConfigError, InputError, SinkError};
pub use config::MachineConfig;
pub use state::{PostureState, PostureKind};
pub use event::Event;
pub use output::StateOutput;
