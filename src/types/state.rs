//! Posture state definitions

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// The three posture states. The pending timer lives inside the
/// `PendingSitUp` variant, so it exists exactly while the machine is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostureState {
    /// Initial state; every reversion lands here
    LyingDown,
    /// Sitting signal seen, waiting for it to persist
    PendingSitUp { since: Timestamp },
    /// Sitting confirmed; holds until the subject lies back down
    ConfirmedSitUp,
}

/// Fieldless view of [`PostureState`] for display and matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostureKind {
    LyingDown,
    PendingSitUp,
    ConfirmedSitUp,
}

impl PostureState {
    pub fn kind(&self) -> PostureKind {
        match self {
            PostureState::LyingDown => PostureKind::LyingDown,
            PostureState::PendingSitUp { .. } => PostureKind::PendingSitUp,
            PostureState::ConfirmedSitUp => PostureKind::ConfirmedSitUp,
        }
    }

    /// Start of the pending window, if pending
    pub fn pending_since(&self) -> Option<Timestamp> {
        match self {
            PostureState::PendingSitUp { since } => Some(*since),
            _ => None,
        }
    }
}

impl PostureKind {
    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            PostureKind::LyingDown => "\x1b[90m",      // Gray
            PostureKind::PendingSitUp => "\x1b[33m",   // Yellow
            PostureKind::ConfirmedSitUp => "\x1b[31m", // Red
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            PostureKind::LyingDown => "🛏",
            PostureKind::PendingSitUp => "👀",
            PostureKind::ConfirmedSitUp => "🚨",
        }
    }
}

impl std::fmt::Display for PostureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PostureKind::LyingDown => "LYING_DOWN",
            PostureKind::PendingSitUp => "PENDING_SIT_UP",
            PostureKind::ConfirmedSitUp => "CONFIRMED_SIT_UP",
        };
        write!(f, "{}", name)
    }
}

impl std::fmt::Display for PostureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_since_only_when_pending() {
        let since = Timestamp::from_millis(1_000);
        assert_eq!(PostureState::PendingSitUp { since }.pending_since(), Some(since));
        assert_eq!(PostureState::LyingDown.pending_since(), None);
        assert_eq!(PostureState::ConfirmedSitUp.pending_since(), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(PostureState::LyingDown.to_string(), "LYING_DOWN");
        assert_eq!(
            PostureState::PendingSitUp { since: Timestamp::ZERO }.to_string(),
            "PENDING_SIT_UP"
        );
        assert_eq!(PostureState::ConfirmedSitUp.to_string(), "CONFIRMED_SIT_UP");
    }

    #[test]
    fn test_json_shape() {
        let state = PostureState::PendingSitUp { since: Timestamp::from_millis(1_500) };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"kind":"PENDING_SIT_UP","since":1500}"#);

        let back: PostureState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
