//! Integration tests for the posture state machine
//!
//! Tests the full path: samples → PostureStateMachine → events

use pretty_assertions::assert_eq;
use sitwatch::core::PostureStateMachine;
use sitwatch::types::{ConfigError, Event, InputError, MachineConfig, PostureState, Timestamp};
use sitwatch::{DEFAULT_PERSISTENCE_MS, DEFAULT_POSTURE_THRESHOLD};
use std::time::Duration;

fn t(secs: u64) -> Timestamp {
    Timestamp::from_millis(secs * 1000)
}

/// threshold=0.2, persistence=5s, cooldown=30s
fn reference_machine() -> PostureStateMachine {
    PostureStateMachine::new(MachineConfig::from_secs(0.2, 5.0, 30.0).unwrap())
}

/// The documented walk-through, sample by sample
#[test]
fn test_reference_scenario() {
    let mut m = reference_machine();

    assert!(m.on_sample(t(0), Some(0.05)).unwrap().is_empty());

    assert_eq!(m.on_sample(t(1), Some(0.25)).unwrap(), vec![Event::PendingStarted { at: t(1) }]);
    assert_eq!(m.state(), PostureState::PendingSitUp { since: t(1) });

    assert_eq!(
        m.on_sample(t(6), Some(0.3)).unwrap(),
        vec![
            Event::Confirmed { at: t(6), held_ms: 5_000, alerted: true },
            Event::Alert { at: t(6) },
        ]
    );

    assert!(m.on_sample(t(10), Some(0.3)).unwrap().is_empty());

    assert_eq!(m.on_sample(t(12), Some(0.05)).unwrap(), vec![Event::ReturnedToLyingDown { at: t(12) }]);

    assert_eq!(m.on_sample(t(13), Some(0.25)).unwrap(), vec![Event::PendingStarted { at: t(13) }]);

    // 18 - 6 = 12 < 30: confirmed without an alert
    assert_eq!(
        m.on_sample(t(18), Some(0.3)).unwrap(),
        vec![Event::Confirmed { at: t(18), held_ms: 5_000, alerted: false }]
    );
    assert_eq!(m.state(), PostureState::ConfirmedSitUp);
    assert_eq!(m.last_alert_at(), Some(t(6)));
}

/// A single noisy spike cannot alert
#[test]
fn test_single_spike_is_debounced() {
    let mut m = reference_machine();
    let mut all = Vec::new();
    for s in 0..60 {
        let signal = if s == 20 { Some(0.9) } else { Some(0.02) };
        all.extend(m.on_sample(t(s), signal).unwrap());
    }
    assert_eq!(all, vec![Event::PendingStarted { at: t(20) }, Event::Reverted { at: t(21), held_ms: 1_000 }]);
}

/// Brief occlusion mid-window restarts the persistence timer
#[test]
fn test_occlusion_restarts_window() {
    let mut m = reference_machine();
    m.on_sample(t(0), Some(0.3)).unwrap();
    m.on_sample(t(4), Some(0.3)).unwrap();
    assert_eq!(m.on_sample(t(4), None).unwrap(), vec![Event::Reverted { at: t(4), held_ms: 4_000 }]);
    m.on_sample(t(5), Some(0.3)).unwrap();
    assert!(m.on_sample(t(9), Some(0.3)).unwrap().is_empty());
    assert!(m.on_sample(t(10), Some(0.3)).unwrap().iter().any(Event::is_alert));
}

/// Long sitting episode alerts once no matter how long it lasts
#[test]
fn test_one_alert_per_episode() {
    let mut m = reference_machine();
    let mut alerts = 0;
    for s in 0..3_600 {
        alerts += m.on_sample(t(s), Some(0.4)).unwrap().iter().filter(|e| e.is_alert()).count();
    }
    assert_eq!(alerts, 1);
}

/// A new episode after the cooldown alerts again
#[test]
fn test_new_episode_after_cooldown_alerts() {
    let mut m = reference_machine();
    m.on_sample(t(0), Some(0.3)).unwrap();
    m.on_sample(t(5), Some(0.3)).unwrap();
    m.on_sample(t(10), Some(0.0)).unwrap();
    m.on_sample(t(40), Some(0.3)).unwrap();
    let events = m.on_sample(t(45), Some(0.3)).unwrap();
    assert!(events.iter().any(Event::is_alert));
    assert_eq!(m.last_alert_at(), Some(t(45)));
}

/// Zero cooldown still needs time to pass between alerts
#[test]
fn test_zero_cooldown() {
    let mut m = PostureStateMachine::new(MachineConfig::from_secs(0.2, 1.0, 0.0).unwrap());
    m.on_sample(t(0), Some(0.3)).unwrap();
    assert!(m.on_sample(t(1), Some(0.3)).unwrap().iter().any(Event::is_alert));
    m.on_sample(t(2), None).unwrap();
    m.on_sample(t(3), Some(0.3)).unwrap();
    assert!(m.on_sample(t(4), Some(0.3)).unwrap().iter().any(Event::is_alert));
}

/// Threshold itself is "not sitting"
#[test]
fn test_threshold_is_exclusive() {
    let mut m = PostureStateMachine::default();
    assert!(m.on_sample(t(0), Some(DEFAULT_POSTURE_THRESHOLD)).unwrap().is_empty());
    assert_eq!(m.state(), PostureState::LyingDown);
}

/// Invalid samples fail without touching state
#[test]
fn test_invalid_input_leaves_state() {
    let mut m = reference_machine();
    m.on_sample(t(10), Some(0.3)).unwrap();

    assert!(matches!(m.on_sample(t(9), Some(0.3)), Err(InputError::NonMonotonicTimestamp { .. })));
    assert!(matches!(m.on_sample(t(11), Some(f64::NAN)), Err(InputError::NonFiniteSignal(_))));

    assert_eq!(m.state(), PostureState::PendingSitUp { since: t(10) });
    assert_eq!(m.last_sample_at(), Some(t(10)));
    assert_eq!(m.sample_count(), 1);

    // the session carries on normally afterwards
    let events = m.on_sample(t(15), Some(0.3)).unwrap();
    assert!(events.iter().any(Event::is_alert));
}

/// Construction validates every parameter
#[test]
fn test_invalid_config() {
    assert!(matches!(
        MachineConfig::new(0.0, Duration::from_secs(5), Duration::ZERO),
        Err(ConfigError::NonPositiveThreshold(_))
    ));
    assert!(matches!(
        MachineConfig::new(0.2, Duration::ZERO, Duration::ZERO),
        Err(ConfigError::ZeroPersistence)
    ));
    assert!(matches!(
        MachineConfig::from_secs(0.2, 5.0, -0.001),
        Err(ConfigError::NegativeDuration { .. })
    ));
}

/// Timer accessors follow the synthetic clock
#[test]
fn test_timer_accessors() {
    let mut m = reference_machine();
    m.on_sample(t(2), Some(0.3)).unwrap();
    assert_eq!(m.pending_elapsed(t(4)), Some(Duration::from_secs(2)));
    assert_eq!(m.cooldown_remaining(t(4)), Duration::ZERO);

    m.on_sample(t(2 + DEFAULT_PERSISTENCE_MS / 1000), Some(0.3)).unwrap();
    assert_eq!(m.pending_elapsed(t(8)), None);
    assert_eq!(m.cooldown_remaining(t(17)), Duration::from_secs(20));
    assert_eq!(m.cooldown_remaining(t(60)), Duration::ZERO);
}

/// Independent machines share nothing
#[test]
fn test_instances_are_independent() {
    let mut a = reference_machine();
    let mut b = reference_machine();
    a.on_sample(t(0), Some(0.3)).unwrap();
    a.on_sample(t(5), Some(0.3)).unwrap();
    assert_eq!(a.state(), PostureState::ConfirmedSitUp);
    assert_eq!(b.state(), PostureState::LyingDown);
    assert!(b.on_sample(t(0), Some(0.0)).unwrap().is_empty());
}

/// JSON output is valid
#[test]
fn test_json_output_valid() {
    let mut m = reference_machine();
    m.on_sample(t(1), Some(0.3)).unwrap();
    let events = m.on_sample(t(6), Some(0.3)).unwrap();
    let output = m.snapshot(t(6), Some(0.3), events);

    let json = serde_json::to_string(&output).unwrap();
    assert!(json.contains(r#""state":{"kind":"CONFIRMED_SIT_UP"}"#));
    assert!(json.contains("\"event\":\"ALERT\""));

    let back: sitwatch::types::StateOutput = serde_json::from_str(&json).unwrap();
    assert_eq!(back, output);
}
