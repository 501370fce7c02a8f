//! Decoding of a drained capture into state-change events.
//!
//! A capture is a run of newline separated lines of the form
//! `<2 framing bytes><6 state digits>,<timestamp µs><1 framing byte>`,
//! closed by a lone `slf` line and one empty line. Decoding is all or
//! nothing: any bad line fails the whole capture.

use crate::constants::{BASE_COUNT, LINE_PREFIX_LEN, LINE_SUFFIX_LEN, MIN_LINE_LEN, TOKEN_STOP_FINISHED};
use crate::error::{AccelError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Channel states of one event, 0 or 1 per base line
pub type StateVector = [u8; BASE_COUNT];

/// One decoded capture line, timestamp still on the device clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSample {
    pub states: StateVector,
    pub timestamp_micros: i64,
}

impl StateSample {
    /// Decode a single capture line. `line_no` is 1-based and only used in errors.
    pub fn parse(line: &[u8], line_no: usize) -> Result<Self> {
        if line.len() < MIN_LINE_LEN {
            return Err(AccelError::MalformedLine {
                line: line_no,
                message: format!("{} bytes, need at least {}", line.len(), MIN_LINE_LEN),
            });
        }

        let body = &line[LINE_PREFIX_LEN..line.len() - LINE_SUFFIX_LEN];
        let comma = body
            .iter()
            .position(|&b| b == b',')
            .ok_or_else(|| AccelError::MalformedLine {
                line: line_no,
                message: "missing ',' between states and timestamp".to_string(),
            })?;
        let (state_field, time_field) = (&body[..comma], &body[comma + 1..]);

        if !state_field.is_ascii() {
            return Err(AccelError::MalformedLine {
                line: line_no,
                message: "non-ASCII state characters".to_string(),
            });
        }
        if state_field.len() != BASE_COUNT {
            return Err(AccelError::MalformedLine {
                line: line_no,
                message: format!("{} state characters, expected {}", state_field.len(), BASE_COUNT),
            });
        }

        let time_text = String::from_utf8_lossy(time_field);
        let timestamp_micros = time_text.parse::<i64>().map_err(|e| AccelError::ParseError {
            line: line_no,
            message: format!("timestamp {:?}: {}", time_text, e),
        })?;

        // Only '0' is off; any other character counts as on.
        let mut states = [0u8; BASE_COUNT];
        for (slot, &c) in states.iter_mut().zip(state_field) {
            *slot = u8::from(c != b'0');
        }

        Ok(Self {
            states,
            timestamp_micros,
        })
    }
}

/// A state change, relative to the first sample of its capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub time_micros: i64,
    pub states: StateVector,
}

fn is_terminator(line: &[u8]) -> bool {
    line.strip_suffix(b"\r").unwrap_or(line) == TOKEN_STOP_FINISHED.as_bytes()
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|&b| b == b'\r' || b == b'\0')
}

/// Decode a raw capture into an ordered, deduplicated event list.
///
/// The first processed sample is the time origin. A sample is kept only when
/// its states differ from the last kept one. The result is sorted by time.
pub fn extract_data_points(capture: &[u8]) -> Result<Vec<DataPoint>> {
    let lines: Vec<&[u8]> = capture.split(|&b| b == b'\n').collect();

    let [.., terminator, tail] = lines.as_slice() else {
        return Err(AccelError::MalformedStream(format!(
            "{} line(s), expected samples followed by `{}` and an empty line",
            lines.len(),
            TOKEN_STOP_FINISHED
        )));
    };
    if !is_terminator(terminator) || !is_blank(tail) {
        return Err(AccelError::MalformedStream(format!(
            "capture does not end with `{}`",
            TOKEN_STOP_FINISHED
        )));
    }

    let mut origin: Option<i64> = None;
    let mut last_emitted: Option<StateVector> = None;
    let mut points = Vec::new();

    for (index, line) in lines[..lines.len() - 2].iter().enumerate() {
        if is_terminator(line) {
            debug!(line = index + 1, "Capture terminated early");
            break;
        }

        let sample = StateSample::parse(line, index + 1)?;
        let origin = *origin.get_or_insert(sample.timestamp_micros);

        if last_emitted == Some(sample.states) {
            continue;
        }

        let time_micros = sample
            .timestamp_micros
            .checked_sub(origin)
            .ok_or_else(|| AccelError::ParseError {
                line: index + 1,
                message: format!("timestamp {} is out of range", sample.timestamp_micros),
            })?;
        points.push(DataPoint {
            time_micros,
            states: sample.states,
        });
        last_emitted = Some(sample.states);
    }

    // Capture order is normally monotonic, but the device clock is not trusted.
    points.sort_by_key(|p| p.time_micros);
    points.dedup_by(|later, earlier| later.states == earlier.states);

    debug!(
        lines = lines.len(),
        points = points.len(),
        "Extracted data points"
    );
    Ok(points)
}
