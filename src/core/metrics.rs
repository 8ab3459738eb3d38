//! Posture metrics from body landmarks
//!
//! Turns four keypoints (shoulders and hips) into the scalar vertical diff
//! the state machine consumes. Coordinates are normalized image coordinates
//! with y growing downwards, so an upright torso has hips below shoulders and
//! a positive vertical diff.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{ConfigError, InputError};
use crate::{DEFAULT_MIN_CONFIDENCE, DEFAULT_SMOOTHING_FRAMES};

/// One detected landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Detector visibility/confidence, 0.0-1.0
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Keypoint {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.visibility.is_finite()
    }
}

/// The four landmarks used for posture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmarks {
    pub left_shoulder: Keypoint,
    pub right_shoulder: Keypoint,
    pub left_hip: Keypoint,
    pub right_hip: Keypoint,
}

impl Landmarks {
    /// Mean visibility of the four landmarks
    pub fn confidence(&self) -> f64 {
        self.left_shoulder.visibility / 4.0
            + self.right_shoulder.visibility / 4.0
            + self.left_hip.visibility / 4.0
            + self.right_hip.visibility / 4.0
    }

    pub fn is_finite(&self) -> bool {
        self.left_shoulder.is_finite()
            && self.right_shoulder.is_finite()
            && self.left_hip.is_finite()
            && self.right_hip.is_finite()
    }
}

/// Smoothed metrics for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureMetrics {
    /// Torso angle in degrees, [0, 180); 90 is upright
    pub angle: f64,
    /// hip_mid_y - shoulder_mid_y
    pub vertical_diff: f64,
    /// Mean landmark visibility
    pub confidence: f64,
}

/// Moving-average metrics calculator with a confidence gate
#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    smoothing_frames: usize,
    min_confidence: f64,
    angles: VecDeque<f64>,
    vertical_diffs: VecDeque<f64>,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self {
            smoothing_frames: DEFAULT_SMOOTHING_FRAMES,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            angles: VecDeque::with_capacity(DEFAULT_SMOOTHING_FRAMES),
            vertical_diffs: VecDeque::with_capacity(DEFAULT_SMOOTHING_FRAMES),
        }
    }
}

impl MetricsCalculator {
    pub fn new(smoothing_frames: usize, min_confidence: f64) -> Result<Self, ConfigError> {
        if smoothing_frames == 0 {
            return Err(ConfigError::InvalidSmoothing);
        }
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(ConfigError::InvalidConfidence(min_confidence));
        }
        Ok(Self {
            smoothing_frames,
            min_confidence,
            angles: VecDeque::with_capacity(smoothing_frames),
            vertical_diffs: VecDeque::with_capacity(smoothing_frames),
        })
    }

    /// Compute smoothed metrics; `Ok(None)` for absent or low-confidence
    /// landmarks. Non-finite landmarks are an error. Neither enters the
    /// smoothing window.
    pub fn calculate(&mut self, landmarks: Option<&Landmarks>) -> Result<Option<PostureMetrics>, InputError> {
        let Some(lm) = landmarks else {
            return Ok(None);
        };
        if !lm.is_finite() {
            return Err(InputError::NonFiniteLandmarks);
        }
        let (angle, vertical_diff) = raw_metrics(lm);
        if !vertical_diff.is_finite() {
            return Err(InputError::NonFiniteSignal(vertical_diff));
        }
        if !angle.is_finite() {
            return Err(InputError::NonFiniteLandmarks);
        }

        let confidence = lm.confidence();
        if confidence < self.min_confidence {
            return Ok(None);
        }

        push_bounded(&mut self.angles, angle, self.smoothing_frames);
        push_bounded(&mut self.vertical_diffs, vertical_diff, self.smoothing_frames);

        Ok(Some(PostureMetrics {
            angle: mean(&self.angles),
            vertical_diff: mean(&self.vertical_diffs),
            confidence,
        }))
    }

    /// Signal for the state machine: the smoothed vertical diff, or `None`
    pub fn signal(&mut self, landmarks: Option<&Landmarks>) -> Result<Option<f64>, InputError> {
        Ok(self.calculate(landmarks)?.map(|m| m.vertical_diff))
    }

    /// Drop the smoothing history
    pub fn clear(&mut self) {
        self.angles.clear();
        self.vertical_diffs.clear();
    }
}

/// Unsmoothed (angle, vertical diff) from the shoulder and hip midpoints
fn raw_metrics(lm: &Landmarks) -> (f64, f64) {
    let shoulder_x = lm.left_shoulder.x / 2.0 + lm.right_shoulder.x / 2.0;
    let shoulder_y = lm.left_shoulder.y / 2.0 + lm.right_shoulder.y / 2.0;
    let hip_x = lm.left_hip.x / 2.0 + lm.right_hip.x / 2.0;
    let hip_y = lm.left_hip.y / 2.0 + lm.right_hip.y / 2.0;

    // torso vector, hip → shoulder
    let torso_x = shoulder_x - hip_x;
    let torso_y = shoulder_y - hip_y;

    let mut angle = torso_y.atan2(torso_x).to_degrees();
    if angle < 0.0 {
        angle += 180.0;
    }
    if angle >= 180.0 {
        angle -= 180.0;
    }

    (angle, hip_y - shoulder_y)
}

fn push_bounded(buf: &mut VecDeque<f64>, value: f64, cap: usize) {
    if buf.len() == cap {
        buf.pop_front();
    }
    buf.push_back(value);
}

/// Divides before summing so a window of finite values stays finite
fn mean(buf: &VecDeque<f64>) -> f64 {
    let n = buf.len() as f64;
    buf.iter().map(|v| v / n).sum()
}
