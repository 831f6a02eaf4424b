//! Byte-level transports consumed by the protocol engine.
//!
//! The engine never talks to a port directly. It drives a [`Transport`],
//! which lets the same protocol code run against real hardware
//! ([`SerialTransport`]) or a deterministic in-memory stand-in
//! ([`MockTransport`]).

use std::io;
use std::time::Duration;

pub mod mock;
pub use mock::{MockTransport, TransportCall};

#[cfg(feature = "instrument_serial")]
pub mod serial;
#[cfg(feature = "instrument_serial")]
pub use serial::SerialTransport;

/// Blocking, timeout-bound byte channel to an instrument.
pub trait Transport: Send {
    /// Write all of `bytes`, blocking for at most `timeout`.
    fn write(&mut self, bytes: &[u8], timeout: Duration) -> io::Result<()>;

    /// Read up to `buf.len()` bytes, blocking until the slice is full or
    /// `timeout` elapses.
    ///
    /// Returns the number of bytes actually read. A timeout with partial or no
    /// data is not an error at this level; the caller compares the count.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Whether the underlying link is currently usable.
    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8], timeout: Duration) -> io::Result<()> {
        (**self).write(bytes, timeout)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read(buf, timeout)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
