//! Shot framing and sequence tracking tests

use laser_tag_ir::logging::{LogLevel, LogStream};
use laser_tag_ir::shot::{
    FrameError, ShotCounter, ShotFrame, ShotHandler, ShotOutcome, ShotSequenceTracker,
    SHOT_FRAME_LEN,
};
use laser_tag_ir::stats::LinkStats;
use laser_tag_ir::transport::FrameHandler;

#[test]
fn test_frame_big_endian_sequence() {
    let bytes = ShotFrame::new(0x1234_5678).to_bytes();
    assert_eq!(bytes.len(), SHOT_FRAME_LEN);
    assert_eq!(&bytes[..3], &[0x4C, 0x54, 0x00]);
    assert_eq!(&bytes[3..], &[0x12, 0x34, 0x56, 0x78]);
    assert_eq!(ShotFrame::parse(&bytes).unwrap().sequence(), 0x1234_5678);
}

#[test]
fn test_high_sequence_bytes_survive() {
    // Every octet must reach the wire, not only the lowest
    let frame = ShotFrame::parse(&ShotFrame::new(0xFF00_0000).to_bytes()).unwrap();
    assert_eq!(frame.sequence(), 0xFF00_0000);
}

#[test]
fn test_parse_rejects_malformed() {
    assert_eq!(
        ShotFrame::parse(&[0x4C, 0x54, 0x00]),
        Err(FrameError::WrongLength { len: 3 })
    );
    assert_eq!(
        ShotFrame::parse(&[0x4C, 0x55, 0x00, 0, 0, 0, 1]),
        Err(FrameError::BadHeader { found: [0x4C, 0x55] })
    );
    assert_eq!(
        ShotFrame::parse(&[0x4C, 0x54, 0x01, 0, 0, 0, 1]),
        Err(FrameError::UnsupportedVersion { version: 1 })
    );
}

#[test]
fn test_counter_starts_at_one_and_wraps() {
    let mut counter = ShotCounter::new();
    assert_eq!(counter.next_frame().sequence(), 1);
    assert_eq!(counter.next_frame().sequence(), 2);

    let mut tracker = ShotSequenceTracker::starting_at(u32::MAX);
    assert!(tracker.classify(ShotFrame::new(u32::MAX)).is_hit());
    assert_eq!(tracker.next_expected(), 0);
}

#[test]
fn test_hit_then_replay_is_miss() {
    let mut tracker = ShotSequenceTracker::starting_at(5);
    let frame = ShotFrame::new(5);

    assert_eq!(tracker.classify(frame), ShotOutcome::Hit { sequence: 5 });
    assert_eq!(tracker.next_expected(), 6);

    assert_eq!(tracker.classify(frame), ShotOutcome::Miss { expected: 6, received: 5 });
    assert_eq!(tracker.next_expected(), 6);
}

#[test]
fn test_skipped_sequence_is_miss() {
    let mut tracker = ShotSequenceTracker::new();
    assert!(tracker.classify(ShotFrame::new(1)).is_hit());
    assert_eq!(
        tracker.classify(ShotFrame::new(3)),
        ShotOutcome::Miss { expected: 2, received: 3 }
    );
    assert!(tracker.classify(ShotFrame::new(2)).is_hit());
}

#[test]
fn test_handler_publishes_to_stats() {
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let mut outcomes = Vec::new();
    {
        let tracker = ShotSequenceTracker::starting_at(5);
        let mut handler = ShotHandler::with_tracker(tracker, &stats, &log, |o| outcomes.push(o));
        assert_eq!(stats.snapshot().next_expected, 5);

        let frame = ShotFrame::new(5).to_bytes();
        handler.on_frame(&frame);
        handler.on_frame(&frame);
        handler.on_frame(&[0xAA]);
        assert_eq!(handler.tracker().next_expected(), 6);
    }

    assert_eq!(
        outcomes,
        vec![
            ShotOutcome::Hit { sequence: 5 },
            ShotOutcome::Miss { expected: 6, received: 5 },
        ]
    );

    let snap = stats.snapshot();
    assert_eq!(snap.hits, 1);
    assert_eq!(snap.misses, 1);
    assert_eq!(snap.malformed, 1);
    assert_eq!(snap.next_expected, 6);

    // Hit, miss and the malformed payload each logged to the handler's stream
    let levels: Vec<LogLevel> = std::iter::from_fn(|| log.drain()).map(|e| e.level).collect();
    assert_eq!(levels, vec![LogLevel::Info, LogLevel::Warn, LogLevel::Debug]);
}

#[test]
fn test_handle_reports_frame_error() {
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let mut handler =
        ShotHandler::new(&stats, &log, |_| panic!("no feedback for malformed frames"));
    let err = handler.handle(&[0u8; 8]).unwrap_err();
    assert_eq!(err, FrameError::WrongLength { len: 8 });
    assert_eq!(err.code(), "F01");
}
