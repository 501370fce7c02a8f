use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for one device session.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
/// The line speed is not among them: the firmware only talks at
/// [`BAUD_RATE`](crate::constants::BAUD_RATE).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Upper bound on waiting for an acknowledgement line
    pub ack_timeout_ms: u64,
    /// Longest reply accepted without seeing a CRLF
    pub max_reply_len: usize,
    /// Read size while draining a capture
    pub chunk_size: usize,
    /// A chunk read that waits longer than this counts as end of data
    pub chunk_timeout_ms: u64,
    pub max_capture_bytes: usize,
    pub progress_interval_ms: u64,
    /// Pause between the end of a recording and draining the device
    pub drain_settle_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 500,
            max_reply_len: 50,
            chunk_size: 1024,
            chunk_timeout_ms: 200,
            max_capture_bytes: 64 * 1024 * 1024,
            progress_interval_ms: 10,
            drain_settle_ms: 1000,
        }
    }
}

impl DeviceConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_millis(self.chunk_timeout_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn drain_settle(&self) -> Duration {
        Duration::from_millis(self.drain_settle_ms)
    }
}
