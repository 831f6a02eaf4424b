//! Frame codec: wire encoding of command arguments and decoding of
//! fixed-width replies.
//!
//! Multi-byte values travel least-significant byte first in both directions.
//! Encoders are pure. Decoders work on the slice the engine actually received,
//! so a truncated frame is reported as [`ProtocolError::ShortRead`] instead of
//! being padded or reinterpreted.

use crate::error::{ProtocolError, ProtocolResult};

/// Width of a byte reply.
pub const BYTE_LEN: usize = 1;
/// Width of a 16-bit word reply.
pub const WORD_LEN: usize = 2;
/// Width of a 32-bit long reply.
pub const LONG_LEN: usize = 4;

/// Encode the low 8 bits of `value`.
pub fn encode_byte(value: u32) -> [u8; BYTE_LEN] {
    [(value & 0xFF) as u8]
}

/// Encode the low 16 bits of `value`, least-significant byte first.
pub fn encode_word(value: u32) -> [u8; WORD_LEN] {
    [(value & 0xFF) as u8, ((value >> 8) & 0xFF) as u8]
}

/// Decode a signed byte from the first byte of `frame`.
pub fn decode_byte(frame: &[u8]) -> ProtocolResult<i8> {
    let bytes: [u8; BYTE_LEN] = leading(frame)?;
    Ok(i8::from_le_bytes(bytes))
}

/// Decode an unsigned little-endian word from the first two bytes of `frame`.
pub fn decode_word(frame: &[u8]) -> ProtocolResult<u16> {
    let bytes: [u8; WORD_LEN] = leading(frame)?;
    Ok(u16::from_le_bytes(bytes))
}

/// Decode a signed little-endian 32-bit value from the first four bytes of `frame`.
pub fn decode_long(frame: &[u8]) -> ProtocolResult<i32> {
    let bytes: [u8; LONG_LEN] = leading(frame)?;
    Ok(i32::from_le_bytes(bytes))
}

fn leading<const N: usize>(frame: &[u8]) -> ProtocolResult<[u8; N]> {
    frame
        .get(..N)
        .and_then(|head| <[u8; N]>::try_from(head).ok())
        .ok_or(ProtocolError::ShortRead {
            expected: N,
            received: frame.len(),
        })
}
