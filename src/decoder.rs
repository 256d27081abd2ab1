//! Tolerant, all-or-nothing frame decoder.
//!
//! Rebuilds payload bytes from one received burst:
//!
//! ```text
//! [leader][b0 b1 .. b7][b0 .. b7] ... [ending]
//!          byte 0       byte 1
//! ```
//!
//! Every data symbol must match logic 0 or logic 1 within the timing margin.
//! Any mismatch rejects the whole burst; no partial bytes are returned.
//!
//! The ending code is always the last symbol of the burst. If the data between
//! leader and ending holds more bytes than the destination can take, decoding
//! fails with [`DecodeError::DestinationTooSmall`] instead of treating a data
//! symbol as the ending code.

use crate::encoder::{BITS_PER_BYTE, FRAMING_SYMBOLS};
use crate::symbol::Symbol;
use crate::timing::TimingTable;

/// Decode failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A data symbol matched no nominal duration.
    Timing,
    /// Leader, ending or overall frame shape is wrong.
    Framing,
    /// Destination buffer smaller than the frame.
    Capacity,
}

/// Why a burst was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// D01: Fewer symbols than leader + ending
    TooShort { symbols: usize },
    /// D02: First symbol is not a leader code
    BadLeader,
    /// D03: Data symbols do not form whole bytes
    TruncatedByte { data_symbols: usize },
    /// D04: Frame carries more bytes than the destination holds
    DestinationTooSmall { needed: usize, capacity: usize },
    /// D05: Data symbol at `index` is neither logic 0 nor logic 1
    BadBit { index: usize },
    /// D06: Last symbol is not an ending code
    BadEnding,
}

impl DecodeError {
    /// Failure class for statistics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadBit { .. } => ErrorKind::Timing,
            Self::DestinationTooSmall { .. } => ErrorKind::Capacity,
            Self::TooShort { .. }
            | Self::BadLeader
            | Self::TruncatedByte { .. }
            | Self::BadEnding => ErrorKind::Framing,
        }
    }

    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "D01",
            Self::BadLeader => "D02",
            Self::TruncatedByte { .. } => "D03",
            Self::DestinationTooSmall { .. } => "D04",
            Self::BadBit { .. } => "D05",
            Self::BadEnding => "D06",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "burst too short",
            Self::BadLeader => "bad leader code",
            Self::TruncatedByte { .. } => "partial byte",
            Self::DestinationTooSmall { .. } => "destination too small",
            Self::BadBit { .. } => "bit timing out of tolerance",
            Self::BadEnding => "bad ending code",
        }
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())?;
        match self {
            Self::TooShort { symbols } => write!(f, " ({} symbols)", symbols),
            Self::TruncatedByte { data_symbols } => write!(f, " ({} data symbols)", data_symbols),
            Self::DestinationTooSmall { needed, capacity } => {
                write!(f, " (need {}, have {})", needed, capacity)
            }
            Self::BadBit { index } => write!(f, " (symbol {})", index),
            Self::BadLeader | Self::BadEnding => Ok(()),
        }
    }
}

/// Stateless decoder bound to a channel's timing table.
///
/// Safe to share: decoding only reads the table.
#[derive(Clone, Copy, Debug)]
pub struct NecDecoder {
    timing: TimingTable,
}

impl NecDecoder {
    pub fn new(timing: &TimingTable) -> Self {
        Self { timing: *timing }
    }

    #[inline]
    pub fn timing(&self) -> &TimingTable {
        &self.timing
    }

    /// Decode one burst into `dest`.
    ///
    /// Returns the number of bytes written. On error `dest` contents are
    /// unspecified and must not be used.
    pub fn decode(&self, symbols: &[Symbol], dest: &mut [u8]) -> Result<usize, DecodeError> {
        if symbols.len() < FRAMING_SYMBOLS {
            return Err(DecodeError::TooShort { symbols: symbols.len() });
        }

        if !self.timing.is_leader(symbols[0]) {
            return Err(DecodeError::BadLeader);
        }

        let data = &symbols[1..symbols.len() - 1];
        if data.len() % BITS_PER_BYTE != 0 {
            return Err(DecodeError::TruncatedByte { data_symbols: data.len() });
        }

        let needed = data.len() / BITS_PER_BYTE;
        if needed > dest.len() {
            return Err(DecodeError::DestinationTooSmall {
                needed,
                capacity: dest.len(),
            });
        }

        for (byte_idx, group) in data.chunks_exact(BITS_PER_BYTE).enumerate() {
            let mut byte = 0u8;
            for (bit, symbol) in group.iter().enumerate() {
                match self.timing.classify_bit(*symbol) {
                    Some(true) => byte |= 1 << bit,
                    Some(false) => {}
                    None => {
                        return Err(DecodeError::BadBit {
                            index: 1 + byte_idx * BITS_PER_BYTE + bit,
                        })
                    }
                }
            }
            dest[byte_idx] = byte;
        }

        if !self.timing.is_ending(symbols[symbols.len() - 1]) {
            return Err(DecodeError::BadEnding);
        }

        Ok(needed)
    }

    /// Decode one burst, reporting failure as zero bytes.
    ///
    /// Note that a valid frame with an empty payload also yields zero.
    #[inline]
    pub fn decoded_len(&self, symbols: &[Symbol], dest: &mut [u8]) -> usize {
        self.decode(symbols, dest).unwrap_or(0)
    }
}
