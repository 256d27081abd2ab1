//! Encoder/decoder tests over whole frames

use laser_tag_ir::decoder::{DecodeError, ErrorKind, NecDecoder};
use laser_tag_ir::encoder::{EncodeSession, NecEncoder};
use laser_tag_ir::symbol::Symbol;
use laser_tag_ir::timing::TimingTable;
use laser_tag_ir::transport::MAX_PAYLOAD_BYTES;

const T: TimingTable = TimingTable::STANDARD;

/// Encode in one call with room for the whole frame.
fn encode_all(payload: &[u8]) -> Vec<Symbol> {
    let encoder = NecEncoder::new(&T);
    let mut session = EncodeSession::new();
    let mut out = vec![Symbol::EMPTY; NecEncoder::frame_symbols(payload.len()) + 4];
    let progress = encoder.encode(payload, &mut session, &mut out);
    assert!(progress.complete);
    out.truncate(progress.written);
    out
}

/// What the receiver records: same symbols, last idle cut to zero.
fn as_received(mut symbols: Vec<Symbol>) -> Vec<Symbol> {
    if let Some(last) = symbols.last_mut() {
        last.idle = 0;
    }
    symbols
}

fn decode(symbols: &[Symbol], capacity: usize) -> Result<Vec<u8>, DecodeError> {
    let mut dest = vec![0u8; capacity];
    let len = NecDecoder::new(&T).decode(symbols, &mut dest)?;
    dest.truncate(len);
    Ok(dest)
}

#[test]
fn test_round_trip_all_lengths() {
    for len in 1..=MAX_PAYLOAD_BYTES {
        let payload: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(37) ^ 0x5A).collect();
        let symbols = as_received(encode_all(&payload));
        assert_eq!(symbols.len(), NecEncoder::frame_symbols(len));
        assert_eq!(decode(&symbols, len).unwrap(), payload, "len {}", len);
    }
}

#[test]
fn test_round_trip_with_transmitted_ending() {
    // Unbounded idle on the ending is accepted as well
    let symbols = encode_all(&[0x00, 0xFF]);
    assert_eq!(decode(&symbols, 2).unwrap(), vec![0x00, 0xFF]);
}

#[test]
fn test_single_symbol_calls_match_one_call() {
    let payload = [0xDE, 0xAD, 0xBE, 0xEF, 0x01];
    let whole = encode_all(&payload);

    let encoder = NecEncoder::new(&T);
    let mut session = EncodeSession::new();
    let mut pieces = Vec::new();
    let mut calls = 0;
    loop {
        let mut slot = [Symbol::EMPTY; 1];
        let progress = encoder.encode(&payload, &mut session, &mut slot);
        assert_eq!(progress.written, 1);
        pieces.push(slot[0]);
        calls += 1;
        if progress.complete {
            break;
        }
    }

    assert_eq!(pieces, whole);
    assert_eq!(calls, NecEncoder::frame_symbols(payload.len()));
    assert!(session.is_idle());
}

#[test]
fn test_uneven_slices_match_one_call() {
    let payload = [0x10, 0x32, 0x54];
    let whole = encode_all(&payload);
    let encoder = NecEncoder::new(&T);

    for capacity in 2..=whole.len() {
        let mut session = EncodeSession::new();
        let mut pieces = Vec::new();
        loop {
            let mut block = vec![Symbol::EMPTY; capacity];
            let progress = encoder.encode(&payload, &mut session, &mut block);
            pieces.extend_from_slice(&block[..progress.written]);
            if progress.complete {
                break;
            }
        }
        assert_eq!(pieces, whole, "capacity {}", capacity);
    }
}

#[test]
fn test_0xaa_example() {
    let symbols = encode_all(&[0xAA]);
    assert_eq!(symbols.len(), 10);
    assert_eq!(symbols[0], Symbol::new(9000, 4500));
    for (i, symbol) in symbols[1..9].iter().enumerate() {
        let expected = if i % 2 == 0 { Symbol::new(560, 560) } else { Symbol::new(560, 1690) };
        assert_eq!(*symbol, expected, "bit {}", i);
    }
    assert_eq!(symbols[9], Symbol::new(560, 0x7FFF));
}

#[test]
fn test_tolerance_boundary() {
    let margin = T.margin();
    let nominal = T.leader().active;

    assert!(T.matches(nominal, nominal));
    assert!(T.matches(nominal - (margin - 1), nominal));
    assert!(T.matches(nominal + (margin - 1), nominal));
    assert!(!T.matches(nominal - margin, nominal));
    assert!(!T.matches(nominal + margin, nominal));
}

#[test]
fn test_tolerance_boundary_in_frame() {
    let base = as_received(encode_all(&[0x3C]));

    let mut inside = base.clone();
    inside[3].idle += T.margin() - 1;
    assert_eq!(decode(&inside, 1).unwrap(), vec![0x3C]);

    let mut edge = base;
    edge[3].idle += T.margin();
    assert_eq!(decode(&edge, 1), Err(DecodeError::BadBit { index: 3 }));
}

#[test]
fn test_leader_corruption_rejects_frame() {
    let mut symbols = as_received(encode_all(&[0x12, 0x34, 0x56]));
    symbols[0].idle = 2250;
    assert_eq!(decode(&symbols, 3), Err(DecodeError::BadLeader));
    assert_eq!(NecDecoder::new(&T).decoded_len(&symbols, &mut [0u8; 3]), 0);
}

#[test]
fn test_single_bit_corruption_anywhere() {
    let payload = [0x12, 0x34, 0x56];
    let clean = as_received(encode_all(&payload));

    for index in 1..clean.len() - 1 {
        let mut symbols = clean.clone();
        symbols[index].active = 1000;
        let result = decode(&symbols, payload.len());
        assert_eq!(result, Err(DecodeError::BadBit { index }), "symbol {}", index);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Timing);
    }
}

#[test]
fn test_bad_ending_rejects_frame() {
    let mut symbols = as_received(encode_all(&[0x01]));
    let last = symbols.len() - 1;
    symbols[last].active = 9000;
    assert_eq!(decode(&symbols, 1), Err(DecodeError::BadEnding));
}

#[test]
fn test_destination_too_small_checked_before_bits() {
    // Regression: a short destination must not make the decoder read a data
    // symbol as the ending code.
    let symbols = as_received(encode_all(&[0xAB, 0xCD, 0xEF]));

    let err = decode(&symbols, 2).unwrap_err();
    assert_eq!(err, DecodeError::DestinationTooSmall { needed: 3, capacity: 2 });
    assert_eq!(err.kind(), ErrorKind::Capacity);

    // Even with a corrupted bit, capacity is reported first
    let mut corrupted = symbols.clone();
    corrupted[5].idle = 3000;
    assert!(matches!(
        decode(&corrupted, 1),
        Err(DecodeError::DestinationTooSmall { .. })
    ));

    // Exact capacity decodes
    assert_eq!(decode(&symbols, 3).unwrap(), vec![0xAB, 0xCD, 0xEF]);
}

#[test]
fn test_truncated_byte_rejected() {
    let mut symbols = as_received(encode_all(&[0xFF]));
    symbols.remove(4);
    assert_eq!(decode(&symbols, 1), Err(DecodeError::TruncatedByte { data_symbols: 7 }));
}

#[test]
fn test_too_short_and_empty() {
    assert_eq!(decode(&[], 4), Err(DecodeError::TooShort { symbols: 0 }));
    assert_eq!(decode(&[T.leader()], 4), Err(DecodeError::TooShort { symbols: 1 }));

    // Leader and ending only: valid, zero bytes
    let empty = as_received(encode_all(&[]));
    assert_eq!(empty.len(), 2);
    assert_eq!(decode(&empty, 0).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_scaled_resolution_round_trip() {
    let timing = TimingTable::new(2_000_000, 200).unwrap();
    assert_eq!(timing.leader(), Symbol::new(18000, 9000));
    assert_eq!(timing.margin(), 400);

    let encoder = NecEncoder::new(&timing);
    let mut session = EncodeSession::new();
    let mut out = [Symbol::EMPTY; 18];
    let progress = encoder.encode(&[0x5A, 0xA5], &mut session, &mut out);
    assert!(progress.complete);

    let mut dest = [0u8; 2];
    assert_eq!(NecDecoder::new(&timing).decode(&out, &mut dest), Ok(2));
    assert_eq!(dest, [0x5A, 0xA5]);

    // Same burst is garbage at the standard resolution
    assert_eq!(NecDecoder::new(&T).decode(&out, &mut dest), Err(DecodeError::BadLeader));
}
