//! Alert sinks: where `Event::Alert` turns into something a human notices

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::{info, warn};

use crate::types::{Event, SinkError};

/// Receiver of alert events
pub trait AlertSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Deliver one alert
    fn deliver(&mut self, event: &Event) -> Result<(), SinkError>;
}

/// Logs the alert and optionally rings the terminal bell
#[derive(Debug, Default)]
pub struct LogSink {
    bell: bool,
}

impl LogSink {
    pub fn new(bell: bool) -> Self {
        Self { bell }
    }
}

impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&mut self, event: &Event) -> Result<(), SinkError> {
        warn!(at = %event.at(), "{}", event.description());
        if self.bell {
            let mut stdout = std::io::stdout();
            stdout.write_all(b"\x07")?;
            stdout.flush()?;
        }
        Ok(())
    }
}

/// Runs an external notifier, e.g. `notify-send Sitwatch`, with the alert
/// message appended as the last argument
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Build from a full argv, program first; `None` if empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl AlertSink for CommandSink {
    fn name(&self) -> &str {
        &self.program
    }

    fn deliver(&mut self, event: &Event) -> Result<(), SinkError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(event.description())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(SinkError::Command { status: status.to_string() });
        }
        info!(program = %self.program, "alert command delivered");
        Ok(())
    }
}
