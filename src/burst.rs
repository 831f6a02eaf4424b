//! Burst session: batch many commands into one write and one read.
//!
//! While recording, every encoded command is appended to an in-memory buffer
//! and every handshake only bumps a pending-reply counter. [`BurstSession::flush`]
//! then performs exactly one transport write of the whole buffer followed by
//! exactly one read asking for as many bytes as replies are pending.
//!
//! The device answers queued commands one reply byte each, in submission
//! order, so byte `i` of the flushed reply belongs to the `i`-th handshake
//! recorded in the burst.
//!
//! ```text
//! Idle --begin()--> Recording --flush()--> Idle
//! ```

use crate::error::{ProtocolError, ProtocolResult};
use crate::transport::Transport;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed capacity of the burst buffer and of the reply read.
pub const BURST_CAPACITY: usize = 2000;

/// Recording state of a [`BurstSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstState {
    /// Commands go straight to the transport.
    Idle,
    /// Commands accumulate until flushed.
    Recording,
}

/// Write-side buffer and pending reply count of a burst.
#[derive(Debug)]
pub struct BurstSession {
    buffer: Vec<u8>,
    pending_acks: usize,
    state: BurstState,
}

impl BurstSession {
    /// Create an idle session with its buffer allocated up front.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(BURST_CAPACITY),
            pending_acks: 0,
            state: BurstState::Idle,
        }
    }

    /// Start recording, discarding anything left from a previous burst.
    pub fn begin(&mut self) {
        if self.state == BurstState::Recording && !self.buffer.is_empty() {
            warn!(
                discarded = self.buffer.len(),
                pending_acks = self.pending_acks,
                "Restarting burst, unflushed commands dropped"
            );
        }
        self.reset();
        self.state = BurstState::Recording;
        debug!("Burst recording started");
    }

    /// Current state.
    pub fn state(&self) -> BurstState {
        self.state
    }

    /// Whether commands are currently being recorded.
    pub fn is_recording(&self) -> bool {
        self.state == BurstState::Recording
    }

    /// Bytes recorded so far.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Replies the device owes for the recorded commands.
    pub fn pending_acknowledgements(&self) -> usize {
        self.pending_acks
    }

    /// Append an encoded frame to the burst.
    ///
    /// Fails with `CapacityExceeded` without appending anything if the frame
    /// does not fit.
    pub fn record(&mut self, frame: &[u8]) -> ProtocolResult<()> {
        self.ensure_recording()?;

        let requested = self.buffer.len() + frame.len();
        if requested > BURST_CAPACITY {
            return Err(ProtocolError::CapacityExceeded {
                capacity: BURST_CAPACITY,
                requested,
            });
        }
        self.buffer.extend_from_slice(frame);
        Ok(())
    }

    /// Register one more expected reply byte.
    pub fn expect_reply(&mut self) -> ProtocolResult<()> {
        self.ensure_recording()?;

        if self.pending_acks >= BURST_CAPACITY {
            return Err(ProtocolError::CapacityExceeded {
                capacity: BURST_CAPACITY,
                requested: self.pending_acks + 1,
            });
        }
        self.pending_acks += 1;
        Ok(())
    }

    /// Send the recorded burst and collect its replies into `rx`.
    ///
    /// Performs one write of every recorded byte, returns to `Idle`, then
    /// performs one read for `pending_acknowledgements()` bytes. Returns how
    /// many reply bytes actually arrived, which may be fewer than requested
    /// if the timeout elapsed first.
    ///
    /// The session is back in `Idle` with an empty buffer and a zero count
    /// afterwards, whether or not the I/O succeeded.
    pub fn flush<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        rx: &mut [u8],
        timeout: Duration,
    ) -> ProtocolResult<usize> {
        self.ensure_recording()?;

        let expected = self.pending_acks;
        if expected > rx.len() {
            self.reset();
            return Err(ProtocolError::CapacityExceeded {
                capacity: rx.len(),
                requested: expected,
            });
        }

        let written = self.buffer.len();
        let write_result = transport.write(&self.buffer, timeout);
        self.reset();
        write_result?;

        let received = transport.read(&mut rx[..expected], timeout)?;
        if received < expected {
            warn!(expected, received, "Burst reply truncated");
        }
        debug!(written, expected, received, "Burst flushed");
        Ok(received)
    }

    fn ensure_recording(&self) -> ProtocolResult<()> {
        match self.state {
            BurstState::Recording => Ok(()),
            BurstState::Idle => Err(ProtocolError::NoBurstInProgress),
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.pending_acks = 0;
        self.state = BurstState::Idle;
    }
}

impl Default for BurstSession {
    fn default() -> Self {
        Self::new()
    }
}
