//! Boundary between the protocol core and the IR hardware.
//!
//! The core consumes two seams from the hardware side:
//! - [`IrTransmitter`]: queue a run of symbols for output
//! - [`IrReceiver`]: open the receive window for the next burst
//!
//! and exposes one to the application: [`FrameHandler`], called once per
//! burst that decodes to a non-empty payload.
//!
//! One application frame must fit inside one receive burst. Nothing here
//! reassembles frames across bursts.

pub mod loopback;
pub mod rx;
pub mod tx;

pub use loopback::{LoopbackMedium, LoopbackRx, LoopbackTx};
pub use rx::{BurstOutcome, RxPipeline, DECODE_BUFFER_BYTES};
pub use tx::{TxChannel, TX_BLOCK_SYMBOLS};

use crate::encoder::{BITS_PER_BYTE, FRAMING_SYMBOLS};
use crate::queue::MAX_BURST_SYMBOLS;
use crate::symbol::Symbol;

/// Largest payload whose frame fits one receive burst.
pub const MAX_PAYLOAD_BYTES: usize = (MAX_BURST_SYMBOLS - FRAMING_SYMBOLS) / BITS_PER_BYTE;

/// Transport error with code and message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// X01: Frame would not fit one receive burst
    PayloadTooLarge { len: usize, max: usize },
    /// X02: Peripheral driver error (ESP-IDF error code)
    Hardware(i32),
}

impl TransportError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge { .. } => "X01",
            Self::Hardware(_) => "X02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge { .. } => "payload too large",
            Self::Hardware(_) => "hardware error",
        }
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())?;
        match self {
            Self::PayloadTooLarge { len, max } => write!(f, " ({} > {})", len, max),
            Self::Hardware(code) => write!(f, " ({})", code),
        }
    }
}

/// Output side of an IR channel.
pub trait IrTransmitter {
    /// Queue symbols for transmission.
    ///
    /// May return before the symbols are physically sent, but must not need
    /// `symbols` after returning.
    fn transmit(&mut self, symbols: &[Symbol]) -> Result<(), TransportError>;
}

/// Input side of an IR channel.
///
/// Captured bursts are delivered out of band (interrupt into a
/// [`BurstQueue`](crate::queue::BurstQueue)). The window is one-shot: after a
/// burst is captured nothing more is received until `arm` is called again.
pub trait IrReceiver {
    /// Open the receive window for the next burst.
    fn arm(&mut self) -> Result<(), TransportError>;
}

/// Consumer of decoded payloads.
pub trait FrameHandler {
    /// Called once per burst that decoded to at least one byte.
    fn on_frame(&mut self, bytes: &[u8]);
}

impl<F: FnMut(&[u8])> FrameHandler for F {
    fn on_frame(&mut self, bytes: &[u8]) {
        self(bytes)
    }
}

impl<T: IrTransmitter + ?Sized> IrTransmitter for &mut T {
    fn transmit(&mut self, symbols: &[Symbol]) -> Result<(), TransportError> {
        (**self).transmit(symbols)
    }
}

impl<R: IrReceiver + ?Sized> IrReceiver for &mut R {
    fn arm(&mut self) -> Result<(), TransportError> {
        (**self).arm()
    }
}
