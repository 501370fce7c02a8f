use std::io;
use thiserror::Error;

/// The primary error type for the `emaccel-lib` library.
#[derive(Error, Debug)]
pub enum AccelError {
    #[error("Not connected to a device")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Timeout waiting for the device: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Device replied `{message}`, expected `{expected}`")]
    ProtocolMismatch { expected: String, message: String },

    #[error("Base line index {0} out of range")]
    InvalidBaseIndex(usize),

    #[error("Capture exceeded the limit of {limit} bytes")]
    CaptureTooLarge { limit: usize },

    #[error("Malformed capture stream: {0}")]
    MalformedStream(String),

    #[error("Malformed capture line {line}: {message}")]
    MalformedLine { line: usize, message: String },

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl AccelError {
    pub(crate) fn mismatch(expected: impl Into<String>, message: impl Into<String>) -> Self {
        AccelError::ProtocolMismatch {
            expected: expected.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AccelError>;
