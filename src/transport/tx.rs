//! Transmit channel: payload → resumable encoder → bounded hardware blocks.

use crate::encoder::{EncodeSession, NecEncoder};
use crate::symbol::Symbol;
use crate::transport::{IrTransmitter, TransportError, MAX_PAYLOAD_BYTES};

/// Default block size: one RMT memory block on the transmit side.
pub const TX_BLOCK_SYMBOLS: usize = 64;

/// One transmit channel.
///
/// Owns the encoder session, so frames from this channel never interleave.
/// Callers on several tasks must funnel their requests through one task
/// (see [`ShotRequests`](crate::trigger::ShotRequests)) instead of sharing
/// the channel.
pub struct TxChannel<T: IrTransmitter, const BLOCK: usize = TX_BLOCK_SYMBOLS> {
    transmitter: T,
    encoder: NecEncoder,
    session: EncodeSession,
    block: [Symbol; BLOCK],
}

impl<T: IrTransmitter, const BLOCK: usize> TxChannel<T, BLOCK> {
    pub fn new(transmitter: T, encoder: NecEncoder) -> Self {
        const { assert!(BLOCK > 0, "Transmit block must hold at least one symbol") };

        Self {
            transmitter,
            encoder,
            session: EncodeSession::new(),
            block: [Symbol::EMPTY; BLOCK],
        }
    }

    /// Encode and transmit one frame.
    ///
    /// The frame goes out in as many `BLOCK`-symbol transmissions as needed.
    /// Returns the total number of symbols sent.
    ///
    /// # Errors
    ///
    /// - `PayloadTooLarge` - the frame would not fit one receive burst
    /// - `Hardware` - the transmitter failed; the partial frame is abandoned
    ///   and the next call starts a fresh frame
    pub fn send(&mut self, payload: &[u8]) -> Result<usize, TransportError> {
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_BYTES,
            });
        }

        let mut sent = 0;
        loop {
            let progress = self.encoder.encode(payload, &mut self.session, &mut self.block);

            if progress.written > 0 {
                if let Err(e) = self.transmitter.transmit(&self.block[..progress.written]) {
                    self.session.reset();
                    return Err(e);
                }
                sent += progress.written;
            }

            if progress.complete {
                return Ok(sent);
            }
        }
    }

    #[inline]
    pub fn session(&self) -> &EncodeSession {
        &self.session
    }

    #[inline]
    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    #[inline]
    pub fn transmitter_mut(&mut self) -> &mut T {
        &mut self.transmitter
    }
}
