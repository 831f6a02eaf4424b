//! Error types for the protocol engine.
//!
//! `ProtocolError` is the single failure type returned by every public
//! operation. Each variant maps to a distinct recovery strategy for the caller:
//!
//! - **`NotConnected`**: a send was attempted while the engine's connection
//!   state is `Disconnected`. Nothing was written. Reconnect and rebuild the engine.
//! - **`Transport`**: the underlying write or read failed, timed out with no
//!   data, or delivered a byte with no protocol meaning. Wraps `std::io::Error`.
//! - **`Rejected`**: the device answered the handshake with `ArgumentError`
//!   or `Failed`. The link is healthy; the command was not accepted.
//! - **`ShortRead`**: a fixed-width frame arrived truncated before the timeout.
//! - **`CapacityExceeded`**: a burst or frame request would overflow the
//!   fixed 2000-byte buffers. This is a caller bug, never a resize.
//!
//! Nothing in this crate retries. Use [`ProtocolError::is_recoverable`] to
//! decide whether a retry at the call site makes sense.

use crate::handshake::AckCode;
use thiserror::Error;

/// Convenience alias for results using the protocol error type.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Device not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Command rejected by device: {0}")]
    Rejected(AckCode),

    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("Buffer capacity exceeded: {requested} bytes requested, capacity is {capacity}")]
    CapacityExceeded { capacity: usize, requested: usize },

    #[error("No burst in progress")]
    NoBurstInProgress,

    #[error("Operation needs direct mode but a burst is being recorded")]
    BurstInProgress,

    #[error("Unexpected device version: expected '{expected}', device reported '{actual}'")]
    VersionMismatch { expected: String, actual: String },
}

impl ProtocolError {
    /// Whether repeating the same operation may succeed without caller changes.
    ///
    /// Communication failures are recoverable (retry or reconnect). Rejections
    /// and programming errors are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProtocolError::NotConnected
            | ProtocolError::Transport(_)
            | ProtocolError::ShortRead { .. } => true,
            ProtocolError::Rejected(_)
            | ProtocolError::CapacityExceeded { .. }
            | ProtocolError::NoBurstInProgress
            | ProtocolError::BurstInProgress
            | ProtocolError::VersionMismatch { .. } => false,
        }
    }

    /// Build a `Transport` error that reports a read timing out with no data.
    pub(crate) fn timed_out(what: &str) -> Self {
        ProtocolError::Transport(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("timed out waiting for {what}"),
        ))
    }
}
