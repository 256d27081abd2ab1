//! Shot frames: the 7-byte application packet carried over the IR link.
//!
//! ```text
//! [0x4C 'L'][0x54 'T'][version 0x00][seq b3][seq b2][seq b1][seq b0]
//! ```
//!
//! The sequence number is a big-endian `u32`. The blaster numbers its shots
//! from 1; the target expects them in order and classifies everything else as
//! a miss. There is no resynchronization and no reordering buffer.

use crate::logging::LogStream;
use crate::stats::LinkStats;
use crate::transport::FrameHandler;

/// Frame magic, "LT".
pub const SHOT_HEADER: [u8; 2] = [0x4C, 0x54];

/// Only supported frame version.
pub const SHOT_VERSION: u8 = 0x00;

/// Encoded frame length in bytes.
pub const SHOT_FRAME_LEN: usize = 7;

/// First sequence number of a power-on session.
pub const FIRST_SEQUENCE: u32 = 1;

/// Why a decoded payload is not a shot frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// F01: Payload is not exactly 7 bytes
    WrongLength { len: usize },
    /// F02: Magic bytes do not match
    BadHeader { found: [u8; 2] },
    /// F03: Unknown frame version
    UnsupportedVersion { version: u8 },
}

impl FrameError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::WrongLength { .. } => "F01",
            Self::BadHeader { .. } => "F02",
            Self::UnsupportedVersion { .. } => "F03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::WrongLength { .. } => "wrong frame length",
            Self::BadHeader { .. } => "bad frame header",
            Self::UnsupportedVersion { .. } => "unsupported frame version",
        }
    }
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())?;
        match self {
            Self::WrongLength { len } => write!(f, " ({} bytes)", len),
            Self::BadHeader { found } => write!(f, " ({:02X} {:02X})", found[0], found[1]),
            Self::UnsupportedVersion { version } => write!(f, " ({})", version),
        }
    }
}

/// One trigger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotFrame {
    sequence: u32,
}

impl ShotFrame {
    pub const fn new(sequence: u32) -> Self {
        Self { sequence }
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Encode to wire format.
    pub fn to_bytes(&self) -> [u8; SHOT_FRAME_LEN] {
        let seq = self.sequence.to_be_bytes();
        [SHOT_HEADER[0], SHOT_HEADER[1], SHOT_VERSION, seq[0], seq[1], seq[2], seq[3]]
    }

    /// Parse a decoded payload.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let bytes: &[u8; SHOT_FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| FrameError::WrongLength { len: bytes.len() })?;

        if bytes[..2] != SHOT_HEADER {
            return Err(FrameError::BadHeader {
                found: [bytes[0], bytes[1]],
            });
        }
        if bytes[2] != SHOT_VERSION {
            return Err(FrameError::UnsupportedVersion { version: bytes[2] });
        }

        Ok(Self {
            sequence: u32::from_be_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
        })
    }
}

/// Sender side sequence source.
///
/// Lives for the power-on session; a new game does not reset it.
#[derive(Debug, Clone)]
pub struct ShotCounter {
    next: u32,
}

impl ShotCounter {
    pub const fn new() -> Self {
        Self { next: FIRST_SEQUENCE }
    }

    /// Sequence number the next shot will carry.
    #[inline]
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Issue the next shot frame.
    pub fn next_frame(&mut self) -> ShotFrame {
        let frame = ShotFrame::new(self.next);
        self.next = self.next.wrapping_add(1);
        frame
    }
}

impl Default for ShotCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Classification of a received shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Sequence was the expected one.
    Hit { sequence: u32 },
    /// Replayed, skipped or out-of-order sequence.
    Miss { expected: u32, received: u32 },
}

impl ShotOutcome {
    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Receiver side ordering check.
///
/// Mutated only by the receive consumer. Other tasks read the published
/// copy in [`LinkStats`].
#[derive(Debug, Clone)]
pub struct ShotSequenceTracker {
    next_expected: u32,
}

impl ShotSequenceTracker {
    pub const fn new() -> Self {
        Self::starting_at(FIRST_SEQUENCE)
    }

    pub const fn starting_at(next_expected: u32) -> Self {
        Self { next_expected }
    }

    #[inline]
    pub fn next_expected(&self) -> u32 {
        self.next_expected
    }

    /// Classify a shot; only a hit advances the expected sequence.
    pub fn classify(&mut self, frame: ShotFrame) -> ShotOutcome {
        if frame.sequence == self.next_expected {
            self.next_expected = self.next_expected.wrapping_add(1);
            ShotOutcome::Hit {
                sequence: frame.sequence,
            }
        } else {
            ShotOutcome::Miss {
                expected: self.next_expected,
                received: frame.sequence,
            }
        }
    }
}

impl Default for ShotSequenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame handler for the target: parse, classify, publish, notify.
///
/// `feedback` runs in the receive consumer's context with the receive window
/// closed, so it must be short (set a flag, queue a notification).
pub struct ShotHandler<'a, F: FnMut(ShotOutcome)> {
    tracker: ShotSequenceTracker,
    stats: &'a LinkStats,
    log: &'a LogStream,
    feedback: F,
}

impl<'a, F: FnMut(ShotOutcome)> ShotHandler<'a, F> {
    pub fn new(stats: &'a LinkStats, log: &'a LogStream, feedback: F) -> Self {
        Self::with_tracker(ShotSequenceTracker::new(), stats, log, feedback)
    }

    pub fn with_tracker(
        tracker: ShotSequenceTracker,
        stats: &'a LinkStats,
        log: &'a LogStream,
        feedback: F,
    ) -> Self {
        stats.publish_next_expected(tracker.next_expected());
        Self {
            tracker,
            stats,
            log,
            feedback,
        }
    }

    #[inline]
    pub fn tracker(&self) -> &ShotSequenceTracker {
        &self.tracker
    }

    /// Handle one decoded payload.
    pub fn handle(&mut self, bytes: &[u8]) -> Result<ShotOutcome, FrameError> {
        let frame = match ShotFrame::parse(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.record_malformed();
                return Err(e);
            }
        };

        let outcome = self.tracker.classify(frame);
        self.stats.record_shot(&outcome, self.tracker.next_expected());
        (self.feedback)(outcome);
        Ok(outcome)
    }
}

impl<'a, F: FnMut(ShotOutcome)> FrameHandler for ShotHandler<'a, F> {
    fn on_frame(&mut self, bytes: &[u8]) {
        let now = crate::clock::now_us();
        match self.handle(bytes) {
            Ok(ShotOutcome::Hit { sequence }) => {
                crate::rt_info!(self.log, now, "hit seq={}", sequence);
            }
            Ok(ShotOutcome::Miss { expected, received }) => {
                crate::rt_warn!(
                    self.log,
                    now,
                    "miss seq={} expected={}",
                    received,
                    expected
                );
            }
            Err(e) => {
                crate::rt_debug!(self.log, now, "not a shot: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let bytes = ShotFrame::new(0x0102_0304).to_bytes();
        assert_eq!(bytes, [0x4C, 0x54, 0x00, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_high_bytes_not_zeroed() {
        let bytes = ShotFrame::new(0xDEAD_BEEF).to_bytes();
        assert_eq!(&bytes[3..], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ShotFrame::parse(&[0x4C, 0x54, 0x00]), Err(FrameError::WrongLength { len: 3 }));
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
    fn test_counter_starts_at_one() {
        let mut counter = ShotCounter::new();
        assert_eq!(counter.next_frame().sequence(), 1);
        assert_eq!(counter.next_frame().sequence(), 2);
        assert_eq!(counter.peek(), 3);
    }

    #[test]
    fn test_tracker_wraps_like_counter() {
        let mut tracker = ShotSequenceTracker::starting_at(u32::MAX);
        assert!(tracker.classify(ShotFrame::new(u32::MAX)).is_hit());
        assert_eq!(tracker.next_expected(), 0);
    }
}
