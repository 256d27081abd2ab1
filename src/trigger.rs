//! Shot request latch between the trigger interrupt and the transmit task.
//!
//! ```text
//! trigger ISR ──request()──▶ ShotRequests ──take()──▶ TX task ──▶ TxChannel
//! ```
//!
//! The interrupt only counts presses. Building the frame and driving the
//! encoder stays in the one transmit task, so frames never interleave.

use core::sync::atomic::{AtomicU32, Ordering};

/// Pending shots held at most; matches the driver's transmit queue depth.
pub const MAX_PENDING_SHOTS: u32 = 4;

/// Bounded counter of pending shot requests.
pub struct ShotRequests {
    pending: AtomicU32,
    dropped: AtomicU32,
    limit: u32,
}

impl ShotRequests {
    pub const fn new() -> Self {
        Self::with_limit(MAX_PENDING_SHOTS)
    }

    pub const fn with_limit(limit: u32) -> Self {
        Self {
            pending: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            limit,
        }
    }

    /// Latch one shot (ISR-safe, never blocks).
    ///
    /// Returns `false` and counts a drop when `limit` shots are already
    /// pending.
    pub fn request(&self) -> bool {
        let accepted = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok();

        if !accepted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        accepted
    }

    /// Claim one pending shot, if any.
    pub fn take(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    #[inline]
    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::Acquire)
    }

    /// Requests refused because the latch was full.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for ShotRequests {
    fn default() -> Self {
        Self::new()
    }
}
