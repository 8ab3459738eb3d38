//! Signal sources
//!
//! A source yields timestamped samples in order. Camera capture and pose
//! estimation live outside this crate; `LineSource` replays recorded
//! samples from any text stream.
//!
//! Accepted line forms (blank lines and `#` comments are skipped):
//! - `<secs> <vdiff>` or `<secs> -` (no detection)
//! - `t=<secs> vdiff=<vdiff|none>`
//! - `<secs>` followed by 12 numbers: `x y visibility` for left shoulder,
//!   right shoulder, left hip, right hip

use std::io::{BufRead, ErrorKind};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::metrics::{Keypoint, Landmarks};
use crate::types::{InputError, Timestamp};

lazy_static! {
    static ref KEY_VALUE: Regex =
        Regex::new(r"^t\s*=\s*(?P<t>\S+)\s+vdiff\s*=\s*(?P<v>\S+)$").unwrap();
    static ref NO_DETECTION: Regex = Regex::new(r"(?i)^(-|none|null)$").unwrap();
}

/// What the upstream pipeline observed at one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleInput {
    /// Precomputed vertical diff, `None` when nobody was detected
    Signal(Option<f64>),
    /// Raw landmarks, `None` when nobody was detected
    Landmarks(Option<Landmarks>),
}

/// One timestamped observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub at: Timestamp,
    pub input: SampleInput,
}

impl Sample {
    pub fn signal(at: Timestamp, signal: Option<f64>) -> Self {
        Self { at, input: SampleInput::Signal(signal) }
    }

    pub fn landmarks(at: Timestamp, landmarks: Option<Landmarks>) -> Self {
        Self { at, input: SampleInput::Landmarks(landmarks) }
    }
}

/// Producer of samples, one per sampling tick
pub trait SignalSource {
    /// Next sample, or `None` once the source is exhausted
    fn next_sample(&mut self) -> Option<Result<Sample, InputError>>;
}

/// Replays samples from a line-oriented text stream
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    line_no: usize,
    buf: String,
    /// Set once the reader failed; the stream is over after that
    failed: bool,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0, buf: String::new(), failed: false }
    }

    /// Line number of the most recently read line (1-based)
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> SignalSource for LineSource<R> {
    fn next_sample(&mut self) -> Option<Result<Sample, InputError>> {
        if self.failed {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                // the offending line was consumed, so reading can go on
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    self.line_no += 1;
                    return Some(Err(malformed(self.line_no, format!("read error: {}", e))));
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(malformed(self.line_no + 1, format!("read error: {}", e))));
                }
            }
            self.line_no += 1;

            let line = strip_comment(&self.buf).trim();
            if line.is_empty() {
                continue;
            }
            return Some(parse_line(line, self.line_no));
        }
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Parse one non-empty, comment-free line
pub fn parse_line(line: &str, line_no: usize) -> Result<Sample, InputError> {
    if let Some(caps) = KEY_VALUE.captures(line) {
        let at = parse_timestamp(&caps["t"], line_no)?;
        let signal = parse_signal(&caps["v"], line_no)?;
        return Ok(Sample::signal(at, signal));
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields.len() {
        2 => {
            let at = parse_timestamp(fields[0], line_no)?;
            let signal = parse_signal(fields[1], line_no)?;
            Ok(Sample::signal(at, signal))
        }
        13 => {
            let at = parse_timestamp(fields[0], line_no)?;
            let mut values = [0.0f64; 12];
            for (slot, field) in values.iter_mut().zip(&fields[1..]) {
                *slot = parse_number(field, line_no)?;
            }
            let kp = |i: usize| Keypoint::new(values[i * 3], values[i * 3 + 1], values[i * 3 + 2]);
            Ok(Sample::landmarks(
                at,
                Some(Landmarks {
                    left_shoulder: kp(0),
                    right_shoulder: kp(1),
                    left_hip: kp(2),
                    right_hip: kp(3),
                }),
            ))
        }
        n => Err(malformed(line_no, format!("expected 2 or 13 fields, got {}", n))),
    }
}

fn parse_timestamp(field: &str, line_no: usize) -> Result<Timestamp, InputError> {
    let secs = parse_number(field, line_no)?;
    Timestamp::from_secs_f64(secs)
}

fn parse_signal(field: &str, line_no: usize) -> Result<Option<f64>, InputError> {
    if NO_DETECTION.is_match(field) {
        return Ok(None);
    }
    parse_number(field, line_no).map(Some)
}

fn parse_number(field: &str, line_no: usize) -> Result<f64, InputError> {
    field
        .parse::<f64>()
        .map_err(|_| malformed(line_no, format!("not a number: {:?}", field)))
}

fn malformed(line: usize, reason: String) -> InputError {
    InputError::Malformed { line, reason }
}
