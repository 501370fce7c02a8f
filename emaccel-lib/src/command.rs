//! Host commands and device acknowledgements.
//!
//! Every command is a single ASCII line terminated by `\n`. The device answers
//! with a reply whose first CRLF-terminated token is the acknowledgement.

use crate::bases::BaseLineSet;
use crate::constants::{
    ACK_DELIMITER, STOP_DURATION, TOKEN_BASES_SET, TOKEN_PING_FAILURE, TOKEN_START_SUCCESS, TOKEN_STOP_FINISHED,
};
use bytes::Bytes;
use std::fmt;
use strum_macros::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `pTest`: ask whether a compatible device is listening
    Ping,
    /// `l<N>`: record for N seconds
    StartLog { seconds: u32 },
    /// `l-1`: stop the running recording
    StopLog,
    /// `b<bits>`: apply the full base bitmap
    SetBases(BaseLineSet),
}

impl Command {
    /// Encode the command as it goes on the wire, newline included
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(format!("{self}\n"))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ping => write!(f, "pTest"),
            Command::StartLog { seconds } => write!(f, "l{seconds}"),
            Command::StopLog => write!(f, "l{STOP_DURATION}"),
            Command::SetBases(bases) => write!(f, "b{}", bases.bitmap()),
        }
    }
}

/// Leading token of a device reply.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Ack {
    #[strum(to_string = "sls")]
    StartSuccess,
    #[strum(to_string = "slf")]
    StopFinished,
    #[strum(to_string = "sb")]
    BasesSet,
    #[strum(to_string = "sPingTest")]
    PingFailure,
    /// Anything else is an error message from the firmware
    #[strum(to_string = "{message}")]
    Other { message: String },
}

impl From<&str> for Ack {
    fn from(token: &str) -> Self {
        match token {
            TOKEN_START_SUCCESS => Ack::StartSuccess,
            TOKEN_STOP_FINISHED => Ack::StopFinished,
            TOKEN_BASES_SET => Ack::BasesSet,
            TOKEN_PING_FAILURE => Ack::PingFailure,
            other => Ack::Other {
                message: other.to_string(),
            },
        }
    }
}

impl Ack {
    /// Extract the acknowledgement from a raw reply: everything before the
    /// first CRLF, or the whole reply when no CRLF arrived.
    pub fn from_reply(reply: &[u8]) -> Self {
        let end = find_delimiter(reply).unwrap_or(reply.len());
        let token = String::from_utf8_lossy(&reply[..end]);
        Ack::from(token.trim_end_matches('\0'))
    }
}

/// Position of the first CRLF in `bytes`
pub(crate) fn find_delimiter(bytes: &[u8]) -> Option<usize> {
    bytes.windows(ACK_DELIMITER.len()).position(|w| w == ACK_DELIMITER)
}
