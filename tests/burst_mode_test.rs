//! Integration tests for burst mode
//!
//! A burst must leave the transport untouched while recording and then
//! perform exactly one write and one read when flushed.

use pslab_protocol::transport::TransportCall;
use pslab_protocol::{
    AckCode, MockTransport, Opcode, ProtocolEngine, ProtocolError, BURST_CAPACITY,
};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(100);

fn engine_with(transport: MockTransport) -> ProtocolEngine<MockTransport> {
    ProtocolEngine::new(transport, TIMEOUT)
}

/// Record one `[group, code, word]` command followed by its handshake.
fn record_command(engine: &mut ProtocolEngine<MockTransport>, code: u8, arg: u32) {
    engine.send_command(Opcode::new(0x0A, code)).unwrap();
    engine.send_word(arg).unwrap();
    // Provisional during a burst.
    assert_eq!(engine.acknowledge().unwrap(), AckCode::Success);
}

#[test]
fn test_recording_counts_handshakes_without_io() {
    let mut engine = engine_with(MockTransport::new());
    engine.enter_burst_mode();
    assert!(engine.is_burst_mode());

    for n in 0..5u8 {
        record_command(&mut engine, n, 0x0100 + u32::from(n));
    }

    assert_eq!(engine.pending_acknowledgements(), 5);
    assert_eq!(engine.burst_len(), 5 * 4);
    assert!(engine.transport().call_log().is_empty());
}

#[test]
fn test_flush_performs_one_write_and_one_read() {
    let mut engine = engine_with(MockTransport::new().with_reply(&[1, 1, 1, 1]));
    engine.enter_burst_mode();
    for n in 0..4u8 {
        record_command(&mut engine, n, 1000);
    }

    let replies = engine.exit_burst_mode().unwrap().to_vec();
    assert_eq!(replies, vec![1, 1, 1, 1]);

    let expected_write: Vec<u8> = (0..4u8).flat_map(|n| [0x0A, n, 0xE8, 0x03]).collect();
    assert_eq!(
        engine.transport().call_log(),
        &[
            TransportCall::Write(expected_write),
            TransportCall::Read {
                requested: 4,
                returned: 4
            },
        ]
    );

    assert!(!engine.is_burst_mode());
    assert_eq!(engine.pending_acknowledgements(), 0);
    assert_eq!(engine.burst_len(), 0);
}

#[test]
fn test_burst_of_three_byte_sends() {
    let mut engine = engine_with(MockTransport::loopback());

    engine.enter_burst_mode();
    for value in [0x10, 0x20, 0x30] {
        engine.send_byte(value).unwrap();
        engine.acknowledge().unwrap();
    }
    let echoed = engine.exit_burst_mode().unwrap().to_vec();

    assert_eq!(echoed, vec![0x10, 0x20, 0x30]);
    assert_eq!(engine.transport().writes(), vec![&[0x10u8, 0x20, 0x30][..]]);
    assert_eq!(engine.transport().read_requests(), vec![3]);
}

#[test]
fn test_flush_reconciles_provisional_results() {
    let mut engine = engine_with(MockTransport::new().with_reply(&[1, 2, 3]));
    engine.enter_burst_mode();
    for n in 0..3u8 {
        record_command(&mut engine, n, 0);
    }

    let codes: Vec<AckCode> = engine
        .exit_burst_mode()
        .unwrap()
        .iter()
        .map(|&byte| AckCode::try_from(byte).unwrap())
        .collect();
    assert_eq!(
        codes,
        vec![AckCode::Success, AckCode::ArgumentError, AckCode::Failed]
    );
}

#[test]
fn test_flush_returns_partial_reply() {
    let mut engine = engine_with(MockTransport::new().with_reply(&[1, 1]));
    engine.enter_burst_mode();
    for n in 0..5u8 {
        record_command(&mut engine, n, 0);
    }

    let replies = engine.exit_burst_mode().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(engine.transport().read_requests(), vec![5]);
}

#[test]
fn test_direct_mode_resumes_after_flush() {
    let mut engine = engine_with(MockTransport::new().with_reply(&[1, 1]));
    engine.enter_burst_mode();
    record_command(&mut engine, 1, 0);
    engine.exit_burst_mode().unwrap();

    engine.send_byte(0x42).unwrap();
    assert_eq!(engine.acknowledge().unwrap(), AckCode::Success);
    assert_eq!(engine.transport().writes().len(), 2);
    assert_eq!(engine.transport().read_requests(), vec![1, 1]);
}

#[test]
fn test_capacity_exceeded_is_explicit() {
    let mut engine = engine_with(MockTransport::new());
    engine.enter_burst_mode();

    for _ in 0..BURST_CAPACITY / 2 {
        engine.send_word(0xFFFF).unwrap();
    }
    assert_eq!(engine.burst_len(), BURST_CAPACITY);

    assert!(matches!(
        engine.send_byte(0x01),
        Err(ProtocolError::CapacityExceeded { .. })
    ));
    assert_eq!(engine.burst_len(), BURST_CAPACITY);
    assert!(engine.transport().call_log().is_empty());
}

#[test]
fn test_exit_without_burst_fails() {
    let mut engine = engine_with(MockTransport::new());
    assert!(matches!(
        engine.exit_burst_mode(),
        Err(ProtocolError::NoBurstInProgress)
    ));
    assert!(engine.transport().call_log().is_empty());
}

#[test]
fn test_reentering_burst_discards_recording() {
    let mut engine = engine_with(MockTransport::new());
    engine.enter_burst_mode();
    record_command(&mut engine, 1, 0);

    engine.enter_burst_mode();
    assert_eq!(engine.pending_acknowledgements(), 0);
    assert_eq!(engine.burst_len(), 0);
}
