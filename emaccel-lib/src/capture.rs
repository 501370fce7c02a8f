use crate::error::Result;
use crate::extract::{DataPoint, extract_data_points};
use bytes::Bytes;
use std::path::Path;

/// Bytes drained from the device during one recording window.
///
/// A capture is decoded once: [`RawCapture::into_data_points`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct RawCapture {
    bytes: Bytes,
}

impl RawCapture {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Load a capture previously written with [`RawCapture::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_data_points(self) -> Result<Vec<DataPoint>> {
        extract_data_points(&self.bytes)
    }
}
