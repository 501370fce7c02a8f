use crate::constants::BASE_COUNT;
use crate::error::{AccelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six base output lines, in command order.
///
/// `true` means the line is disabled. The default set has every line
/// enabled, which the device sees as `b000000`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseLineSet {
    lines: [bool; BASE_COUNT],
}

impl BaseLineSet {
    pub fn new(lines: [bool; BASE_COUNT]) -> Self {
        Self { lines }
    }

    /// Change a single line, leaving the others untouched
    pub fn set(&mut self, index: usize, disabled: bool) -> Result<()> {
        let line = self.lines.get_mut(index).ok_or(AccelError::InvalidBaseIndex(index))?;
        *line = disabled;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.lines.get(index).copied()
    }

    pub fn lines(&self) -> [bool; BASE_COUNT] {
        self.lines
    }

    /// Restore every line to the default state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Wire form: one '0'/'1' character per line
    pub fn bitmap(&self) -> String {
        self.lines.iter().map(|&disabled| if disabled { '1' } else { '0' }).collect()
    }
}

impl fmt::Display for BaseLineSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bitmap())
    }
}
