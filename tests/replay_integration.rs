//! Integration tests for replay
//!
//! Tests the full path: settings file → text samples → LineSource → Monitor → sinks

use pretty_assertions::assert_eq;
use sitwatch::core::{AlertSink, LineSource, Monitor, Settings};
use sitwatch::types::{Event, PostureState, SinkError, Timestamp};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

/// Records delivered alerts
#[derive(Default, Clone)]
struct Collected(Arc<Mutex<Vec<Timestamp>>>);

impl AlertSink for Collected {
    fn name(&self) -> &str {
        "collected"
    }

    fn deliver(&mut self, event: &Event) -> Result<(), SinkError> {
        self.0.lock().unwrap().push(event.at());
        Ok(())
    }
}

const NIGHT: &str = "\
# subject asleep, one restless turn, then two sit-ups
0    0.02
1    0.04
2    -
3    0.31     # roll, not a sit-up
4    0.05
10   0.30
12   0.33
15   0.34     # confirmed: alert
20   0.35
25   0.02
26   0.28
31   0.30     # within cooldown of the alert at 15
40   0.01
60   0.40
65   0.41     # past cooldown: alert
";

fn monitor_from(settings: &Settings) -> Monitor {
    Monitor::new(
        settings.detection.machine_config().unwrap(),
        settings.detection.metrics_calculator().unwrap(),
    )
}

#[test]
fn test_replay_recorded_night() {
    let collected = Collected::default();
    let mut monitor = monitor_from(&Settings::default()).with_sink(Box::new(collected.clone()));
    let mut source = LineSource::new(Cursor::new(NIGHT));

    let mut codes = Vec::new();
    let stats = monitor.run(&mut source, |out| codes.extend(out.events.iter().map(Event::code)));

    assert_eq!(stats.samples, 15);
    assert_eq!(stats.missing, 1);
    assert_eq!(stats.rejected, 0);
    assert_eq!(stats.alerts, 2);
    assert_eq!(stats.suppressed, 1);
    assert_eq!(stats.runtime_string(), "00:01:05");
    assert_eq!(
        codes,
        vec![
            "PENDING_STARTED",
            "REVERTED",
            "PENDING_STARTED",
            "CONFIRMED",
            "ALERT",
            "RETURNED_TO_LYING_DOWN",
            "PENDING_STARTED",
            "CONFIRMED",
            "RETURNED_TO_LYING_DOWN",
            "PENDING_STARTED",
            "CONFIRMED",
            "ALERT",
        ]
    );
    assert_eq!(
        collected.0.lock().unwrap().as_slice(),
        &[Timestamp::from_millis(15_000), Timestamp::from_millis(65_000)]
    );
    assert_eq!(monitor.state(), PostureState::ConfirmedSitUp);
}

#[test]
fn test_settings_file_changes_outcome() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[detection]\npersistence_secs = 10.0\ncooldown_secs = 0.0").unwrap();
    let settings = Settings::load(file.path()).unwrap();

    let mut monitor = monitor_from(&settings);
    let mut source = LineSource::new(Cursor::new(NIGHT));
    let stats = monitor.run(&mut source, |_| {});

    // 10s windows: 10→20 confirms, 26→31 and 60→65 are too short
    assert_eq!(stats.alerts, 1);
    assert_eq!(stats.suppressed, 0);
}

#[test]
fn test_bad_settings_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[detection]\nposture_threshold = -0.2").unwrap();
    assert!(Settings::load(file.path()).is_err());
    assert!(Settings::load("/nonexistent/sitwatch.toml").is_err());
}

#[test]
fn test_landmark_replay() {
    // upright: shoulders at y=0.3, hips at y=0.7, vdiff 0.4
    let upright = "0.45 0.3 0.9 0.55 0.3 0.9 0.45 0.7 0.9 0.55 0.7 0.9";
    // lying: shoulders and hips level
    let lying = "0.2 0.5 0.9 0.2 0.55 0.9 0.7 0.5 0.9 0.7 0.55 0.9";
    let text = format!("0 {lying}\n1 {up}\n3 {up}\n6 {up}\n7 -\n", lying = lying, up = upright);

    let mut settings = Settings::default();
    settings.detection.smoothing_frames = 1;
    let mut monitor = monitor_from(&settings);
    let mut source = LineSource::new(Cursor::new(text));
    let stats = monitor.run(&mut source, |_| {});

    assert_eq!(stats.samples, 5);
    assert_eq!(stats.alerts, 1);
    assert_eq!(monitor.state(), PostureState::LyingDown);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let text = "0 0.3\nnot a sample\n5 0.3\n4 0.0\n6 nan\n";
    let mut monitor = monitor_from(&Settings::default());
    let mut source = LineSource::new(Cursor::new(text));
    let stats = monitor.run(&mut source, |_| {});

    assert_eq!(stats.samples, 2);
    assert_eq!(stats.rejected, 3);
    assert_eq!(stats.alerts, 1);
}
