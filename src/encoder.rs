//! Resumable NEC-style frame encoder.
//!
//! Pure logic, no hardware dependencies. Turns a byte payload into a symbol
//! stream `leader, data bits (LSB first), ending`, writing at most as many
//! symbols as the caller's output slice holds. Progress is kept in an
//! [`EncodeSession`] so the next call resumes exactly where the last one
//! stopped: the RMT peripheral only accepts a bounded run of symbols at a time.
//!
//! # Example
//!
//! ```
//! use laser_tag_ir::encoder::{EncodeSession, NecEncoder};
//! use laser_tag_ir::symbol::Symbol;
//! use laser_tag_ir::timing::TimingTable;
//!
//! let encoder = NecEncoder::new(&TimingTable::STANDARD);
//! let mut session = EncodeSession::new();
//! let mut block = [Symbol::EMPTY; 4];
//!
//! let mut total = 0;
//! loop {
//!     let progress = encoder.encode(&[0xAA], &mut session, &mut block);
//!     total += progress.written;
//!     if progress.complete {
//!         break;
//!     }
//! }
//! assert_eq!(total, NecEncoder::frame_symbols(1));
//! ```

use crate::symbol::Symbol;
use crate::timing::TimingTable;

/// Bits per payload byte.
pub const BITS_PER_BYTE: usize = 8;

/// Symbols a frame spends on leader and ending codes.
pub const FRAMING_SYMBOLS: usize = 2;

/// Frame section the encoder emits next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EncodePhase {
    /// Leader code not yet emitted.
    #[default]
    Leader,
    /// Emitting payload bits.
    Data,
    /// Payload done, ending code not yet emitted.
    Ending,
}

/// Encoder progress for one transmit channel.
///
/// Owned by exactly one channel. Returns to `{Leader, 0, 0}` by itself when
/// the ending code goes out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EncodeSession {
    phase: EncodePhase,
    payload_cursor: usize,
    bit_cursor: u8,
}

impl EncodeSession {
    /// Fresh session positioned before the leader code.
    pub const fn new() -> Self {
        Self {
            phase: EncodePhase::Leader,
            payload_cursor: 0,
            bit_cursor: 0,
        }
    }

    #[inline]
    pub fn phase(&self) -> EncodePhase {
        self.phase
    }

    /// Index of the next payload byte to encode.
    #[inline]
    pub fn payload_cursor(&self) -> usize {
        self.payload_cursor
    }

    /// Next bit (0-7, LSB first) within the current byte.
    #[inline]
    pub fn bit_cursor(&self) -> u8 {
        self.bit_cursor
    }

    /// True when no frame is in progress.
    #[inline]
    pub fn is_idle(&self) -> bool {
        *self == Self::new()
    }

    /// Abandon any frame in progress.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Result of one [`NecEncoder::encode`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeProgress {
    /// Symbols written to the front of the output slice.
    pub written: usize,
    /// The ending code was emitted; the session is ready for a new frame.
    pub complete: bool,
}

/// Frame encoder holding the resolved nominal symbols.
#[derive(Clone, Copy, Debug)]
pub struct NecEncoder {
    leader: Symbol,
    bit0: Symbol,
    bit1: Symbol,
    ending: Symbol,
}

impl NecEncoder {
    /// Create an encoder for a channel's timing table.
    pub fn new(timing: &TimingTable) -> Self {
        Self {
            leader: timing.leader(),
            bit0: timing.bit0(),
            bit1: timing.bit1(),
            ending: timing.ending(),
        }
    }

    /// Number of symbols a complete frame of `payload_len` bytes occupies.
    #[inline]
    pub const fn frame_symbols(payload_len: usize) -> usize {
        FRAMING_SYMBOLS + payload_len * BITS_PER_BYTE
    }

    /// Encode as much of `payload` as fits in `out`.
    ///
    /// The same payload must be passed on every call until `complete` is
    /// returned. An empty `out` is a no-op: nothing written, session
    /// untouched. Concatenating the output of all calls gives the same stream
    /// as one call with unlimited room, however the calls are sliced.
    pub fn encode(
        &self,
        payload: &[u8],
        session: &mut EncodeSession,
        out: &mut [Symbol],
    ) -> EncodeProgress {
        let mut written = 0;

        if out.is_empty() {
            return EncodeProgress { written, complete: false };
        }

        if session.phase == EncodePhase::Leader {
            out[written] = self.leader;
            written += 1;
            session.phase = EncodePhase::Data;
        }

        if session.phase == EncodePhase::Data {
            while written < out.len() && session.payload_cursor < payload.len() {
                let byte = payload[session.payload_cursor];
                let one = (byte >> session.bit_cursor) & 1 == 1;
                out[written] = if one { self.bit1 } else { self.bit0 };
                written += 1;

                session.bit_cursor += 1;
                if session.bit_cursor as usize == BITS_PER_BYTE {
                    session.bit_cursor = 0;
                    session.payload_cursor += 1;
                }
            }

            if session.payload_cursor >= payload.len() {
                session.phase = EncodePhase::Ending;
            }
        }

        if session.phase == EncodePhase::Ending && written < out.len() {
            out[written] = self.ending;
            written += 1;
            session.reset();
            return EncodeProgress { written, complete: true };
        }

        EncodeProgress { written, complete: false }
    }
}
