//! Protocol engine: the composition root that owns the transport, the
//! receive buffer and the burst session.
//!
//! Commands are built from three primitives:
//!
//! 1. [`ProtocolEngine::send_command`] / [`ProtocolEngine::send_byte`] /
//!    [`ProtocolEngine::send_word`] encode and transmit a frame,
//! 2. [`ProtocolEngine::acknowledge`] waits for the status byte,
//! 3. [`ProtocolEngine::read_byte`] and friends decode typed replies.
//!
//! # Burst mode
//!
//! Between [`ProtocolEngine::enter_burst_mode`] and
//! [`ProtocolEngine::exit_burst_mode`], sends are buffered and handshakes do
//! no I/O. Handshake results are *provisional* (`Success`) during a burst;
//! the real status bytes are the ones returned by `exit_burst_mode`, one per
//! handshake, in recording order.
//!
//! # Example
//!
//! ```
//! use pslab_protocol::{MockTransport, ProtocolEngine};
//! use std::time::Duration;
//!
//! let transport = MockTransport::new().with_reply(b"CS\n");
//! let mut engine = ProtocolEngine::new(transport, Duration::from_millis(500));
//! assert_eq!(engine.query_version().unwrap(), "CS");
//! ```

use crate::burst::{BurstSession, BurstState, BURST_CAPACITY};
use crate::codec::{self, BYTE_LEN, LONG_LEN, WORD_LEN};
use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, ProtocolResult};
use crate::handshake::AckCode;
use crate::opcodes::{Opcode, GET_VERSION, VERSION_STRING_LENGTH};
use crate::transport::Transport;
use std::io;
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

/// Capacity of the receive buffer.
pub const RX_CAPACITY: usize = BURST_CAPACITY;

/// Link state sampled from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The transport reported a usable link.
    Connected,
    /// The transport reported no link; every send fails fast.
    Disconnected,
}

impl ConnectionState {
    fn sample<T: Transport + ?Sized>(transport: &T) -> Self {
        if transport.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

/// Command/response engine for one instrument.
///
/// The engine is single-caller: it holds one receive buffer and one burst
/// buffer, so operations must not interleave. Share it behind a mutex if
/// several threads need it.
pub struct ProtocolEngine<T> {
    transport: T,
    timeout: Duration,
    connection: ConnectionState,
    rx: Box<[u8]>,
    burst: BurstSession,
    version: String,
}

impl<T: Transport> ProtocolEngine<T> {
    /// Create an engine, sampling the transport's link state once.
    pub fn new(transport: T, timeout: Duration) -> Self {
        let connection = ConnectionState::sample(&transport);
        match connection {
            ConnectionState::Connected => info!(?timeout, "Protocol engine connected"),
            ConnectionState::Disconnected => warn!("Protocol engine created without a connection"),
        }

        Self {
            transport,
            timeout,
            connection,
            rx: vec![0u8; RX_CAPACITY].into_boxed_slice(),
            burst: BurstSession::new(),
            version: String::new(),
        }
    }

    /// Create an engine using the timeout from `config`.
    pub fn from_config(transport: T, config: &ProtocolConfig) -> Self {
        Self::new(transport, config.timeout())
    }

    /// Timeout applied to every blocking call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connection state as last sampled.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Whether the last sample saw a usable link.
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Re-sample the transport's link state.
    ///
    /// The engine never does this on its own.
    pub fn refresh_connection(&mut self) -> ConnectionState {
        let sampled = ConnectionState::sample(&self.transport);
        if sampled != self.connection {
            info!(from = ?self.connection, to = ?sampled, "Connection state changed");
        }
        self.connection = sampled;
        sampled
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back, dropping the engine.
    pub fn into_transport(self) -> T {
        self.transport
    }

    // =========================================================================
    // Send primitives
    // =========================================================================

    /// Send the low 8 bits of `value`.
    pub fn send_byte(&mut self, value: u32) -> ProtocolResult<()> {
        self.send(&codec::encode_byte(value))
    }

    /// Send the low 16 bits of `value`, least-significant byte first.
    pub fn send_word(&mut self, value: u32) -> ProtocolResult<()> {
        self.send(&codec::encode_word(value))
    }

    /// Send a `[group, code]` command header.
    pub fn send_command(&mut self, opcode: Opcode) -> ProtocolResult<()> {
        self.send(&opcode.to_bytes())
    }

    fn send(&mut self, frame: &[u8]) -> ProtocolResult<()> {
        self.ensure_connected()?;

        if self.burst.is_recording() {
            self.burst.record(frame)?;
            trace!(frame = ?frame, buffered = self.burst.buffered().len(), "Queued in burst");
        } else {
            self.transport.write(frame, self.timeout)?;
            trace!(frame = ?frame, "Sent");
        }
        Ok(())
    }

    // =========================================================================
    // Handshake
    // =========================================================================

    /// Wait for the status byte confirming the last command.
    ///
    /// In direct mode this reads one byte. A timeout or a byte outside `1..=3`
    /// is a `Transport` error; `ArgumentError` and `Failed` are returned as
    /// codes so the caller can tell a rejection from a broken link.
    ///
    /// During a burst no I/O happens: the pending reply count grows by one and
    /// `Success` is returned provisionally. Check the bytes returned by
    /// [`ProtocolEngine::exit_burst_mode`] for the real outcome.
    pub fn acknowledge(&mut self) -> ProtocolResult<AckCode> {
        if self.burst.is_recording() {
            self.burst.expect_reply()?;
            return Ok(AckCode::Success);
        }

        self.ensure_connected()?;
        let received = self.transport.read(&mut self.rx[..BYTE_LEN], self.timeout)?;
        if received == 0 {
            return Err(ProtocolError::timed_out("acknowledgement"));
        }

        let code = AckCode::try_from(self.rx[0])?;
        if code != AckCode::Success {
            warn!(%code, "Device rejected command");
        }
        Ok(code)
    }

    // =========================================================================
    // Typed reads
    // =========================================================================

    /// Read one signed byte.
    pub fn read_byte(&mut self) -> ProtocolResult<i8> {
        let frame = self.read_frame(BYTE_LEN)?;
        codec::decode_byte(frame)
    }

    /// Read one little-endian 16-bit word.
    pub fn read_word(&mut self) -> ProtocolResult<u16> {
        let frame = self.read_frame(WORD_LEN)?;
        codec::decode_word(frame)
    }

    /// Read one little-endian signed 32-bit value.
    pub fn read_long(&mut self) -> ProtocolResult<i32> {
        let frame = self.read_frame(LONG_LEN)?;
        codec::decode_long(frame)
    }

    /// Read exactly `len` bytes into the receive buffer.
    ///
    /// The returned slice aliases the receive buffer and is overwritten by the
    /// next read; copy out whatever must be kept.
    pub fn read_frame(&mut self, len: usize) -> ProtocolResult<&[u8]> {
        self.ensure_direct_mode()?;
        self.ensure_connected()?;
        if len > RX_CAPACITY {
            return Err(ProtocolError::CapacityExceeded {
                capacity: RX_CAPACITY,
                requested: len,
            });
        }

        let received = self.transport.read(&mut self.rx[..len], self.timeout)?;
        if received < len {
            warn!(expected = len, received, "Short read");
            return Err(ProtocolError::ShortRead {
                expected: len,
                received,
            });
        }
        trace!(frame = ?&self.rx[..received], "Received");
        Ok(&self.rx[..received])
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Ask the device for its version identifier and cache it.
    ///
    /// On failure the cached value keeps whatever it held before (empty if no
    /// query ever succeeded) and the error is returned.
    #[instrument(skip(self))]
    pub fn query_version(&mut self) -> ProtocolResult<&str> {
        self.ensure_direct_mode()?;
        self.send_command(GET_VERSION)?;

        let frame = self.read_frame(VERSION_STRING_LENGTH + 1)?;
        let version = decode_identifier(&frame[..VERSION_STRING_LENGTH])?;

        debug!(%version, "Device version");
        self.version = version;
        Ok(&self.version)
    }

    /// Version identifier from the last successful [`ProtocolEngine::query_version`].
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Query the version and require it to start with `expected`.
    pub fn verify_version(&mut self, expected: &str) -> ProtocolResult<()> {
        let actual = self.query_version()?;
        if actual.starts_with(expected) {
            Ok(())
        } else {
            Err(ProtocolError::VersionMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }

    // =========================================================================
    // Burst mode
    // =========================================================================

    /// Start recording a burst. Any unflushed burst is discarded.
    pub fn enter_burst_mode(&mut self) {
        self.burst.begin();
    }

    /// Flush the burst: one write of every queued frame, then one read for
    /// one reply byte per handshake recorded.
    ///
    /// Returns the reply bytes that arrived before the timeout, in recording
    /// order. The slice may be shorter than the number of handshakes; compare
    /// its length with what was recorded. It aliases the receive buffer.
    #[instrument(skip(self))]
    pub fn exit_burst_mode(&mut self) -> ProtocolResult<&[u8]> {
        self.ensure_connected()?;
        let received = self
            .burst
            .flush(&mut self.transport, &mut self.rx, self.timeout)?;
        Ok(&self.rx[..received])
    }

    /// Whether a burst is being recorded.
    pub fn is_burst_mode(&self) -> bool {
        self.burst.state() == BurstState::Recording
    }

    /// Handshakes recorded in the current burst.
    pub fn pending_acknowledgements(&self) -> usize {
        self.burst.pending_acknowledgements()
    }

    /// Bytes queued in the current burst.
    pub fn burst_len(&self) -> usize {
        self.burst.buffered().len()
    }

    fn ensure_connected(&self) -> ProtocolResult<()> {
        match self.connection {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected => Err(ProtocolError::NotConnected),
        }
    }

    fn ensure_direct_mode(&self) -> ProtocolResult<()> {
        if self.burst.is_recording() {
            Err(ProtocolError::BurstInProgress)
        } else {
            Ok(())
        }
    }
}

fn decode_identifier(bytes: &[u8]) -> ProtocolResult<String> {
    if !bytes.is_ascii() {
        return Err(ProtocolError::Transport(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("version identifier is not ASCII: {bytes:02X?}"),
        )));
    }
    Ok(bytes.iter().map(|&b| char::from(b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, TransportCall};
    use tracing_test::traced_test;

    fn engine(transport: MockTransport) -> ProtocolEngine<MockTransport> {
        ProtocolEngine::new(transport, Duration::from_millis(50))
    }

    #[test]
    fn test_connection_sampled_once() {
        let mut engine = engine(MockTransport::new());
        assert_eq!(engine.connection_state(), ConnectionState::Connected);

        engine.transport_mut().set_connected(false);
        // Not re-sampled until asked.
        assert!(engine.is_connected());
        assert_eq!(engine.refresh_connection(), ConnectionState::Disconnected);
        assert!(matches!(
            engine.send_byte(1),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_send_primitives_write_immediately() {
        let mut engine = engine(MockTransport::new());
        engine.send_command(Opcode::new(0x0B, 0x05)).unwrap();
        engine.send_byte(0x1FF).unwrap();
        engine.send_word(0x1234).unwrap();

        assert_eq!(
            engine.transport().writes(),
            vec![&[0x0Bu8, 0x05][..], &[0xFF][..], &[0x34, 0x12][..]]
        );
    }

    #[test]
    fn test_acknowledge_returns_rejections_as_codes() {
        let mut engine = engine(MockTransport::new().with_reply(&[2, 3]));
        assert_eq!(engine.acknowledge().unwrap(), AckCode::ArgumentError);
        assert_eq!(engine.acknowledge().unwrap(), AckCode::Failed);
    }

    #[test]
    #[traced_test]
    fn test_rejection_is_logged() {
        let mut engine = engine(MockTransport::new().with_reply(&[3]));
        assert_eq!(engine.acknowledge().unwrap(), AckCode::Failed);
        assert!(logs_contain("Device rejected command"));
    }

    #[test]
    fn test_acknowledge_timeout_is_transport_error() {
        let mut engine = engine(MockTransport::new());
        match engine.acknowledge() {
            Err(ProtocolError::Transport(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_typed_reads() {
        let mut engine = engine(
            MockTransport::new().with_reply(&[0xFE, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12]),
        );
        assert_eq!(engine.read_byte().unwrap(), -2);
        assert_eq!(engine.read_word().unwrap(), 0x1234);
        assert_eq!(engine.read_long().unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_read_frame_rejects_oversized_request() {
        let mut engine = engine(MockTransport::new());
        assert!(matches!(
            engine.read_frame(RX_CAPACITY + 1),
            Err(ProtocolError::CapacityExceeded { .. })
        ));
        assert!(engine.transport().call_log().is_empty());
    }

    #[test]
    fn test_reads_refused_during_burst() {
        let mut engine = engine(MockTransport::new().with_reply(&[1]));
        engine.enter_burst_mode();
        assert!(matches!(
            engine.read_byte(),
            Err(ProtocolError::BurstInProgress)
        ));
        assert!(matches!(
            engine.query_version(),
            Err(ProtocolError::BurstInProgress)
        ));
        assert!(engine.transport().call_log().is_empty());
    }

    #[test]
    fn test_query_version_caches_result() {
        let mut engine = engine(MockTransport::new().with_reply(b"CS\n"));
        assert_eq!(engine.version(), "");
        assert_eq!(engine.query_version().unwrap(), "CS");
        assert_eq!(engine.version(), "CS");
        assert_eq!(
            engine.transport().call_log(),
            &[
                TransportCall::Write(vec![0x0B, 0x05]),
                TransportCall::Read {
                    requested: 3,
                    returned: 3
                },
            ]
        );
    }

    #[test]
    fn test_query_version_failure_keeps_previous_value() {
        let mut engine = engine(MockTransport::new().with_reply(b"CS\n"));
        engine.query_version().unwrap();

        engine.transport_mut().queue_reply(b"X");
        assert!(matches!(
            engine.query_version(),
            Err(ProtocolError::ShortRead {
                expected: 3,
                received: 1
            })
        ));
        assert_eq!(engine.version(), "CS");
    }

    #[test]
    fn test_query_version_rejects_non_ascii() {
        let mut engine = engine(MockTransport::new().with_reply(&[0xC3, 0xA9, 0x0A]));
        assert!(matches!(
            engine.query_version(),
            Err(ProtocolError::Transport(_))
        ));
        assert_eq!(engine.version(), "");
    }

    #[test]
    fn test_verify_version() {
        let mut engine = engine(MockTransport::new().with_reply(b"CS\nPS\n"));
        engine.verify_version("CS").unwrap();

        match engine.verify_version("CS") {
            Err(ProtocolError::VersionMismatch { expected, actual }) => {
                assert_eq!(expected, "CS");
                assert_eq!(actual, "PS");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_from_config_uses_timeout() {
        let config = ProtocolConfig {
            timeout_ms: 250,
            ..ProtocolConfig::default()
        };
        let engine = ProtocolEngine::from_config(MockTransport::new(), &config);
        assert_eq!(engine.timeout(), Duration::from_millis(250));
    }
}
