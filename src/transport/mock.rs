//! In-memory transport for testing
//!
//! Stands in for an instrument without requiring physical hardware. It provides:
//! - Scripted replies queued ahead of time
//! - Loopback mode (every written byte becomes readable)
//! - One-shot failure injection for writes and reads
//! - A call log for verifying exactly which I/O the engine performed

use super::Transport;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// One I/O call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// A write carrying this payload.
    Write(Vec<u8>),
    /// A read that delivered `returned` of `requested` bytes.
    Read {
        /// Size of the caller's slice.
        requested: usize,
        /// Bytes actually copied into it.
        returned: usize,
    },
}

/// Mock transport for testing
///
/// # Example
///
/// ```
/// use pslab_protocol::transport::{MockTransport, Transport};
/// use std::time::Duration;
///
/// let mut transport = MockTransport::new().with_reply(&[0x01]);
/// let mut buf = [0u8; 1];
/// let n = transport.read(&mut buf, Duration::from_millis(10)).unwrap();
/// assert_eq!((n, buf[0]), (1, 0x01));
/// ```
#[derive(Debug)]
pub struct MockTransport {
    connected: bool,
    loopback: bool,
    rx: VecDeque<u8>,
    fail_next_write: bool,
    fail_next_read: bool,
    call_log: Vec<TransportCall>,
}

impl MockTransport {
    /// Create a connected transport with an empty reply queue.
    pub fn new() -> Self {
        Self {
            connected: true,
            loopback: false,
            rx: VecDeque::new(),
            fail_next_write: false,
            fail_next_read: false,
            call_log: Vec::new(),
        }
    }

    /// Create a transport that reports itself disconnected.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    /// Create a connected transport that echoes every write back to the reader.
    pub fn loopback() -> Self {
        Self {
            loopback: true,
            ..Self::new()
        }
    }

    /// Queue `bytes` to be returned by subsequent reads.
    pub fn with_reply(mut self, bytes: &[u8]) -> Self {
        self.queue_reply(bytes);
        self
    }

    /// Queue `bytes` to be returned by subsequent reads.
    pub fn queue_reply(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Number of queued bytes not yet read.
    pub fn pending_reply_len(&self) -> usize {
        self.rx.len()
    }

    /// Change the reported link state.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Make the next write fail with `BrokenPipe`.
    pub fn trigger_write_failure(&mut self) {
        self.fail_next_write = true;
    }

    /// Make the next read fail with `BrokenPipe`.
    pub fn trigger_read_failure(&mut self) {
        self.fail_next_read = true;
    }

    /// Every call made so far, in order.
    pub fn call_log(&self) -> &[TransportCall] {
        &self.call_log
    }

    /// Clear the call log
    pub fn clear_call_log(&mut self) {
        self.call_log.clear();
    }

    /// Payloads of every write, in order.
    pub fn writes(&self) -> Vec<&[u8]> {
        self.call_log
            .iter()
            .filter_map(|call| match call {
                TransportCall::Write(bytes) => Some(bytes.as_slice()),
                TransportCall::Read { .. } => None,
            })
            .collect()
    }

    /// Requested sizes of every read, in order.
    pub fn read_requests(&self) -> Vec<usize> {
        self.call_log
            .iter()
            .filter_map(|call| match call {
                TransportCall::Read { requested, .. } => Some(*requested),
                TransportCall::Write(_) => None,
            })
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8], _timeout: Duration) -> io::Result<()> {
        if std::mem::take(&mut self.fail_next_write) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }

        self.call_log.push(TransportCall::Write(bytes.to_vec()));
        if self.loopback {
            self.rx.extend(bytes.iter().copied());
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        if std::mem::take(&mut self.fail_next_read) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock read failure"));
        }

        let available = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..available)) {
            *slot = byte;
        }
        self.call_log.push(TransportCall::Read {
            requested: buf.len(),
            returned: available,
        });
        Ok(available)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
