//! Acknowledgement handshake codes.
//!
//! Most commands are confirmed by a single status byte from the device:
//!
//! | byte | meaning |
//! |------|---------|
//! | `1`  | success |
//! | `2`  | argument error |
//! | `3`  | failed |
//!
//! Any other byte is not a protocol code. The engine reports it as a
//! transport error because the stream is most likely desynchronized.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use std::io;

/// Status returned by the device after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckCode {
    /// Command accepted and executed.
    Success,
    /// Command understood but one of its arguments was out of range.
    ArgumentError,
    /// Command could not be executed.
    Failed,
}

impl AckCode {
    /// Wire value of this code.
    pub fn as_byte(self) -> u8 {
        match self {
            AckCode::Success => 1,
            AckCode::ArgumentError => 2,
            AckCode::Failed => 3,
        }
    }

    /// Turn a device rejection into [`ProtocolError::Rejected`].
    pub fn ensure_success(self) -> ProtocolResult<()> {
        match self {
            AckCode::Success => Ok(()),
            rejected => Err(ProtocolError::Rejected(rejected)),
        }
    }
}

impl TryFrom<u8> for AckCode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(AckCode::Success),
            2 => Ok(AckCode::ArgumentError),
            3 => Ok(AckCode::Failed),
            other => Err(ProtocolError::Transport(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected acknowledgement byte 0x{other:02X}"),
            ))),
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AckCode::Success => "success",
            AckCode::ArgumentError => "argument error",
            AckCode::Failed => "failed",
        };
        f.write_str(name)
    }
}
