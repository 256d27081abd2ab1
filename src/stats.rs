//! Link statistics shared between the receive consumer and everything else.
//!
//! Atomics only. The receive consumer is the single writer for the receive
//! counters and the transmit task for the transmit ones; any task may take a
//! [`LinkSnapshot`] without locking.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::decoder::{DecodeError, ErrorKind};
use crate::shot::{ShotOutcome, FIRST_SEQUENCE};

/// Counters for one IR link endpoint.
///
/// # Usage
///
/// ```ignore
/// static STATS: LinkStats = LinkStats::new();
///
/// // In the receive consumer:
/// STATS.record_frame(bytes);
///
/// // In the feedback task:
/// let snap = STATS.snapshot();
/// show_score(snap.hits, snap.misses);
/// ```
pub struct LinkStats {
    bursts: AtomicU32,
    frames: AtomicU32,
    empty_frames: AtomicU32,
    timing_errors: AtomicU32,
    framing_errors: AtomicU32,
    capacity_errors: AtomicU32,
    malformed: AtomicU32,
    hits: AtomicU32,
    misses: AtomicU32,
    next_expected: AtomicU32,
    shots_sent: AtomicU32,
    tx_errors: AtomicU32,
}

impl LinkStats {
    pub const fn new() -> Self {
        Self {
            bursts: AtomicU32::new(0),
            frames: AtomicU32::new(0),
            empty_frames: AtomicU32::new(0),
            timing_errors: AtomicU32::new(0),
            framing_errors: AtomicU32::new(0),
            capacity_errors: AtomicU32::new(0),
            malformed: AtomicU32::new(0),
            hits: AtomicU32::new(0),
            misses: AtomicU32::new(0),
            next_expected: AtomicU32::new(FIRST_SEQUENCE),
            shots_sent: AtomicU32::new(0),
            tx_errors: AtomicU32::new(0),
        }
    }

    /// A receive burst was taken off the queue.
    #[inline]
    pub fn record_burst(&self) {
        self.bursts.fetch_add(1, Ordering::Relaxed);
    }

    /// A burst decoded successfully into `bytes` payload bytes.
    #[inline]
    pub fn record_frame(&self, bytes: usize) {
        if bytes == 0 {
            self.empty_frames.fetch_add(1, Ordering::Relaxed);
        } else {
            self.frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A burst was rejected by the decoder.
    #[inline]
    pub fn record_decode_error(&self, error: &DecodeError) {
        let counter = match error.kind() {
            ErrorKind::Timing => &self.timing_errors,
            ErrorKind::Framing => &self.framing_errors,
            ErrorKind::Capacity => &self.capacity_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// A decoded payload was not a valid shot frame.
    #[inline]
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// A shot was classified.
    #[inline]
    pub fn record_shot(&self, outcome: &ShotOutcome, next_expected: u32) {
        match outcome {
            ShotOutcome::Hit { .. } => self.hits.fetch_add(1, Ordering::Relaxed),
            ShotOutcome::Miss { .. } => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        self.publish_next_expected(next_expected);
    }

    /// Publish the tracker's expected sequence for readers.
    #[inline]
    pub fn publish_next_expected(&self, next_expected: u32) {
        self.next_expected.store(next_expected, Ordering::Release);
    }

    /// A shot frame was handed to the transmitter.
    #[inline]
    pub fn record_sent(&self) {
        self.shots_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// The transmitter reported an error.
    #[inline]
    pub fn record_tx_error(&self) {
        self.tx_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of all counters.
    ///
    /// Counters are read one by one; a snapshot taken while the consumer runs
    /// may mix values from before and after one burst.
    pub fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            bursts: self.bursts.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            empty_frames: self.empty_frames.load(Ordering::Relaxed),
            timing_errors: self.timing_errors.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            capacity_errors: self.capacity_errors.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            next_expected: self.next_expected.load(Ordering::Acquire),
            shots_sent: self.shots_sent.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for LinkStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of link statistics at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub bursts: u32,
    pub frames: u32,
    pub empty_frames: u32,
    pub timing_errors: u32,
    pub framing_errors: u32,
    pub capacity_errors: u32,
    pub malformed: u32,
    pub hits: u32,
    pub misses: u32,
    pub next_expected: u32,
    pub shots_sent: u32,
    pub tx_errors: u32,
}

impl LinkSnapshot {
    /// Bursts the decoder rejected, all causes.
    pub fn rejected(&self) -> u32 {
        self.timing_errors + self.framing_errors + self.capacity_errors
    }
}
