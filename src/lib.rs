//! # PSLab Protocol Engine
//!
//! This crate drives a PSLab-class measurement instrument over a byte-oriented
//! serial link. It turns symbolic operations into the device's fixed wire
//! format, runs the acknowledgement handshake, decodes typed replies and
//! offers a burst mode that batches many commands into one write and one read.
//!
//! ## Crate Structure
//!
//! - **`engine`**: `ProtocolEngine`, the composition root owning the transport,
//!   the receive buffer and the burst session.
//! - **`codec`**: byte/word encoders and byte/word/long decoders (little-endian).
//! - **`handshake`**: the `AckCode` status returned after a command.
//! - **`burst`**: the `BurstSession` state machine.
//! - **`opcodes`**: the `[group, code]` headers the engine issues itself.
//! - **`transport`**: the `Transport` trait plus mock and serial implementations.
//! - **`config`**: Figment-based configuration (TOML + environment).
//! - **`tracing_setup`**: subscriber initialization for binaries and tests.
//! - **`error`**: the `ProtocolError` taxonomy.
//!
//! The engine is synchronous and single-caller. Every blocking call is bounded
//! by the configured timeout and nothing is retried internally.

pub mod burst;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod handshake;
pub mod opcodes;
pub mod tracing_setup;
pub mod transport;

pub use burst::{BurstSession, BurstState, BURST_CAPACITY};
pub use engine::{ConnectionState, ProtocolEngine, RX_CAPACITY};
pub use error::{ProtocolError, ProtocolResult};
pub use handshake::AckCode;
pub use opcodes::Opcode;
pub use transport::{MockTransport, Transport};

#[cfg(feature = "instrument_serial")]
pub use transport::SerialTransport;
