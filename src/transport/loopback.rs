//! In-memory IR medium joining a transmitter to a receiver.
//!
//! Stands in for the LED, the air and the demodulating receiver when running
//! the link on the host. Behaves like the RMT receiver where it matters:
//!
//! - Transmitted blocks are joined into one burst until an idle phase
//!   reaching the receiver's maximum signal range ends it
//! - The idle of the burst's last symbol is recorded as zero
//! - A burst longer than [`MAX_BURST_SYMBOLS`] is cut
//! - A burst that starts while the receive window is closed is lost
//!
//! Not `Sync`: both ends must live on the same thread.

use core::cell::{Cell, RefCell};

use crate::queue::{BurstQueue, MAX_BURST_SYMBOLS, RX_QUEUE_DEPTH};
use crate::symbol::Symbol;
use crate::transport::{IrReceiver, IrTransmitter, TransportError};

/// Idle ticks that end a burst at 1 MHz (12 ms receiver signal range).
pub const DEFAULT_BURST_END_IDLE: u16 = 12_000;

/// Per-symbol distortion applied on the way through the medium.
pub type Distortion = fn(Symbol) -> Symbol;

struct Assembly {
    symbols: [Symbol; MAX_BURST_SYMBOLS],
    len: usize,
    overflow: usize,
    /// Receive window was open when this burst started.
    captured: bool,
}

impl Assembly {
    const EMPTY: Self = Self {
        symbols: [Symbol::EMPTY; MAX_BURST_SYMBOLS],
        len: 0,
        overflow: 0,
        captured: false,
    };

    fn in_progress(&self) -> bool {
        self.len > 0 || self.overflow > 0
    }

    fn append(&mut self, symbol: Symbol) {
        if self.len < MAX_BURST_SYMBOLS {
            self.symbols[self.len] = symbol;
            self.len += 1;
        } else {
            self.overflow += 1;
        }
    }
}

/// Simulated medium feeding a [`BurstQueue`].
pub struct LoopbackMedium<'q, const N: usize = RX_QUEUE_DEPTH> {
    queue: &'q BurstQueue<N>,
    assembly: RefCell<Assembly>,
    armed: Cell<bool>,
    burst_end_idle: u16,
    distortion: Cell<Option<Distortion>>,
    delivered: Cell<u32>,
    lost: Cell<u32>,
}

impl<'q, const N: usize> LoopbackMedium<'q, N> {
    /// Medium with the default 1 MHz burst-end threshold.
    pub fn new(queue: &'q BurstQueue<N>) -> Self {
        Self::with_burst_end_idle(queue, DEFAULT_BURST_END_IDLE)
    }

    /// Medium ending bursts on idle phases of at least `burst_end_idle` ticks.
    pub fn with_burst_end_idle(queue: &'q BurstQueue<N>, burst_end_idle: u16) -> Self {
        Self {
            queue,
            assembly: RefCell::new(Assembly::EMPTY),
            armed: Cell::new(false),
            burst_end_idle,
            distortion: Cell::new(None),
            delivered: Cell::new(0),
            lost: Cell::new(0),
        }
    }

    /// Transmit end.
    pub fn tx(&self) -> LoopbackTx<'_, 'q, N> {
        LoopbackTx { medium: self }
    }

    /// Receive end.
    pub fn rx(&self) -> LoopbackRx<'_, 'q, N> {
        LoopbackRx { medium: self }
    }

    /// Install (or clear, with `None`) a per-symbol distortion.
    pub fn set_distortion(&self, distortion: Option<Distortion>) {
        self.distortion.set(distortion);
    }

    /// End the current burst as if the line had gone quiet.
    ///
    /// For transmissions whose last symbol does not carry a long idle.
    pub fn flush(&self) {
        let mut assembly = self.assembly.borrow_mut();
        if assembly.in_progress() {
            self.finish(&mut assembly);
        }
    }

    /// Receive window currently open.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Bursts the queue accepted.
    #[inline]
    pub fn delivered(&self) -> u32 {
        self.delivered.get()
    }

    /// Bursts that started with the receive window closed.
    #[inline]
    pub fn lost(&self) -> u32 {
        self.lost.get()
    }

    fn carry(&self, symbols: &[Symbol]) {
        let distortion = self.distortion.get();
        let mut assembly = self.assembly.borrow_mut();

        for &symbol in symbols {
            let symbol = match distortion {
                Some(f) => f(symbol),
                None => symbol,
            };

            if !assembly.in_progress() {
                // Window is one-shot: a new burst consumes it
                assembly.captured = self.armed.replace(false);
            }

            if symbol.idle >= self.burst_end_idle {
                assembly.append(Symbol { idle: 0, ..symbol });
                self.finish(&mut assembly);
            } else {
                assembly.append(symbol);
            }
        }
    }

    fn finish(&self, assembly: &mut Assembly) {
        if assembly.captured {
            // One extra symbol past the limit marks the burst truncated
            let marker = core::iter::repeat(Symbol::EMPTY).take(assembly.overflow.min(1));
            let symbols = assembly.symbols[..assembly.len].iter().copied().chain(marker);
            // A full queue counts the burst in its own dropped()
            if self.queue.push_iter(symbols) {
                self.delivered.set(self.delivered.get().wrapping_add(1));
            }
        } else {
            self.lost.set(self.lost.get().wrapping_add(1));
        }

        assembly.len = 0;
        assembly.overflow = 0;
        assembly.captured = false;
    }
}

/// Transmit handle on a [`LoopbackMedium`].
pub struct LoopbackTx<'m, 'q, const N: usize = RX_QUEUE_DEPTH> {
    medium: &'m LoopbackMedium<'q, N>,
}

impl<const N: usize> IrTransmitter for LoopbackTx<'_, '_, N> {
    fn transmit(&mut self, symbols: &[Symbol]) -> Result<(), TransportError> {
        self.medium.carry(symbols);
        Ok(())
    }
}

/// Receive handle on a [`LoopbackMedium`].
pub struct LoopbackRx<'m, 'q, const N: usize = RX_QUEUE_DEPTH> {
    medium: &'m LoopbackMedium<'q, N>,
}

impl<const N: usize> IrReceiver for LoopbackRx<'_, '_, N> {
    fn arm(&mut self) -> Result<(), TransportError> {
        self.medium.armed.set(true);
        Ok(())
    }
}
