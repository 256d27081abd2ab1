//! Lock-free bounded queue of receive bursts.
//!
//! Hand-off between the RMT receive-done interrupt and the receive consumer
//! task.
//!
//! # Architecture
//!
//! ```text
//! RX ISR ──push──▶ BurstQueue ──pop──▶ RxPipeline
//! (never blocks)    (bounded)           (decode + handler)
//! ```
//!
//! # Rules
//!
//! - Built for one producer (the ISR) and one consumer (the receive task);
//!   extra producers or consumers stay sound, they only contend
//! - `push` never blocks and never allocates
//! - Full queue: the new burst is dropped and counted (drop-newest)

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::symbol::Symbol;

/// Largest burst the receiver captures: one RMT memory block.
pub const MAX_BURST_SYMBOLS: usize = 128;

/// Default queue depth (bursts).
pub const RX_QUEUE_DEPTH: usize = 8;

/// One captured receive burst.
#[derive(Clone, Copy)]
pub struct RxBurst {
    symbols: [Symbol; MAX_BURST_SYMBOLS],
    len: u16,
    truncated: bool,
}

impl RxBurst {
    pub const EMPTY: Self = Self {
        symbols: [Symbol::EMPTY; MAX_BURST_SYMBOLS],
        len: 0,
        truncated: false,
    };

    /// Captured symbols.
    #[inline]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// More symbols arrived than one burst holds; the tail was cut.
    #[inline]
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    fn fill(&mut self, symbols: impl IntoIterator<Item = Symbol>) {
        let mut len = 0;
        let mut truncated = false;
        for symbol in symbols {
            if len == MAX_BURST_SYMBOLS {
                truncated = true;
                break;
            }
            self.symbols[len] = symbol;
            len += 1;
        }
        self.len = len as u16;
        self.truncated = truncated;
    }
}

impl core::fmt::Debug for RxBurst {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RxBurst")
            .field("len", &self.len)
            .field("truncated", &self.truncated)
            .finish()
    }
}

/// Bounded burst queue.
///
/// # Safety
///
/// Uses `UnsafeCell` internally. Each slot carries a stamp that says whose
/// turn it is:
/// - `stamp == pos`: free for the producer claiming position `pos`
/// - `stamp == pos + 1`: filled, for the consumer claiming `pos`
/// - The consumer hands the slot back with `stamp = pos + N`
///
/// A position is claimed by CAS on `write_idx` / `read_idx`, so a slot is only
/// ever accessed by the one side whose turn it is.
pub struct BurstQueue<const N: usize = RX_QUEUE_DEPTH> {
    slots: UnsafeCell<[RxBurst; N]>,
    stamps: [AtomicU32; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: slot access is serialized by the stamp protocol above.
unsafe impl<const N: usize> Sync for BurstQueue<N> {}
unsafe impl<const N: usize> Send for BurstQueue<N> {}

impl<const N: usize> BurstQueue<N> {
    const MASK: usize = N - 1;
    const UNSTAMPED: AtomicU32 = AtomicU32::new(0);

    /// Create an empty queue.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Queue depth must be power of 2");

        let mut stamps = [Self::UNSTAMPED; N];
        let mut i = 0;
        while i < N {
            stamps[i] = AtomicU32::new(i as u32);
            i += 1;
        }

        Self {
            slots: UnsafeCell::new([RxBurst::EMPTY; N]),
            stamps,
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue a burst (producer side).
    ///
    /// Returns `false` and counts a drop if the queue is full.
    #[inline]
    pub fn push(&self, symbols: &[Symbol]) -> bool {
        self.push_iter(symbols.iter().copied())
    }

    /// Enqueue a burst straight from an iterator, without an intermediate
    /// buffer. Symbols past [`MAX_BURST_SYMBOLS`] are cut.
    ///
    /// # Timing
    ///
    /// O(burst length). Never blocks, never allocates. Safe in ISR context.
    pub fn push_iter(&self, symbols: impl IntoIterator<Item = Symbol>) -> bool {
        // A slot still holding last lap's burst means the queue is full
        let Some(pos) = self.claim(&self.write_idx, 0) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        // SAFETY: position claimed above and its stamp says the slot is free
        let slot = unsafe { &mut *self.slot_ptr(pos) };
        slot.fill(symbols);

        self.stamp(pos).store(pos.wrapping_add(1), Ordering::Release);
        true
    }

    /// Dequeue the oldest burst and run `f` on it in place (consumer side).
    ///
    /// The slot is released after `f` returns. Returns `None` if nothing is
    /// queued, or the oldest burst is still being written.
    pub fn pop_with<R>(&self, f: impl FnOnce(&RxBurst) -> R) -> Option<R> {
        let pos = self.claim(&self.read_idx, 1)?;

        // SAFETY: position claimed above and its stamp says the slot is
        // filled; no producer reuses it before the stamp moves on
        let result = f(unsafe { &*self.slot_ptr(pos) });

        self.stamp(pos).store(pos.wrapping_add(N as u32), Ordering::Release);
        Some(result)
    }

    /// Dequeue the oldest burst by copy.
    #[inline]
    pub fn pop(&self) -> Option<RxBurst> {
        self.pop_with(|burst| *burst)
    }

    /// Bursts claimed by producers and not yet taken by the consumer.
    #[inline]
    pub fn len(&self) -> usize {
        let read = self.read_idx.load(Ordering::Acquire);
        let write = self.write_idx.load(Ordering::Acquire);
        (write.wrapping_sub(read) as usize).min(N)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bursts dropped because the queue was full.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Claim the next position on `cursor` whose stamp reads `pos + turn`
    /// (0 for producers, 1 for consumers).
    fn claim(&self, cursor: &AtomicU32, turn: u32) -> Option<u32> {
        let mut pos = cursor.load(Ordering::Relaxed);
        loop {
            let stamp = self.stamp(pos).load(Ordering::Acquire);
            let lag = stamp.wrapping_sub(pos.wrapping_add(turn)) as i32;
            if lag < 0 {
                return None;
            }
            if lag > 0 {
                // Another claimant moved the cursor on
                pos = cursor.load(Ordering::Relaxed);
                continue;
            }
            match cursor.compare_exchange_weak(
                pos,
                pos.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(pos),
                Err(current) => pos = current,
            }
        }
    }

    #[inline]
    fn stamp(&self, pos: u32) -> &AtomicU32 {
        &self.stamps[pos as usize & Self::MASK]
    }

    #[inline]
    fn slot_ptr(&self, pos: u32) -> *mut RxBurst {
        // Pointer arithmetic only; no reference to the whole array is formed
        let base = self.slots.get() as *mut RxBurst;
        // SAFETY: masked index is always within the N-slot array
        unsafe { base.add(pos as usize & Self::MASK) }
    }
}

impl<const N: usize> Default for BurstQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
