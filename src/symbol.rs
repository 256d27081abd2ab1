//! Module: symbol
//!
//! Purpose: Physical-layer unit of the IR link. One symbol is a carrier burst
//! (active phase) followed by a gap (idle phase), both measured in channel
//! ticks.
//!
//! Architecture:
//! - Compact 4-byte value, same footprint as one RMT symbol word
//! - Durations are 15-bit, the widest the RMT peripheral can express
//! - Levels are implied: active = carrier on, idle = carrier off
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// Longest duration a single phase can hold (15-bit RMT duration field).
pub const MAX_DURATION_TICKS: u16 = 0x7FFF;

/// Output level while the carrier is on.
pub const LEVEL_ACTIVE: u32 = 1;

/// Output level while the carrier is off.
pub const LEVEL_IDLE: u32 = 0;

/// One IR pulse: carrier burst followed by a gap.
///
/// Memory layout when packed for the peripheral:
/// ```text
/// [duration0:15][level0:1][duration1:15][level1:1] = 32 bits
///  active        1         idle          0
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Symbol {
    /// Carrier-on duration in ticks.
    pub active: u16,

    /// Carrier-off duration in ticks.
    ///
    /// Zero in the last symbol of a received burst: the receiver stops
    /// measuring once the line stays idle past its maximum signal range.
    pub idle: u16,
}

impl Symbol {
    /// Empty symbol, used to initialize fixed buffers.
    pub const EMPTY: Self = Self { active: 0, idle: 0 };

    /// Create a symbol from its two phase durations.
    ///
    /// Durations wider than 15 bits are clamped to [`MAX_DURATION_TICKS`].
    pub const fn new(active: u16, idle: u16) -> Self {
        Self {
            active: clamp_duration(active),
            idle: clamp_duration(idle),
        }
    }

    /// Pack into an RMT symbol word.
    #[inline]
    pub const fn to_raw(self) -> u32 {
        (self.active as u32 & 0x7FFF)
            | (LEVEL_ACTIVE << 15)
            | ((self.idle as u32 & 0x7FFF) << 16)
            | (LEVEL_IDLE << 31)
    }

    /// Unpack an RMT symbol word. Level bits are ignored.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            active: (raw & 0x7FFF) as u16,
            idle: ((raw >> 16) & 0x7FFF) as u16,
        }
    }
}

const fn clamp_duration(ticks: u16) -> u16 {
    if ticks > MAX_DURATION_TICKS {
        MAX_DURATION_TICKS
    } else {
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_size() {
        assert_eq!(core::mem::size_of::<Symbol>(), 4);
    }

    #[test]
    fn test_raw_layout() {
        let raw = Symbol::new(9000, 4500).to_raw();
        assert_eq!(raw & 0x7FFF, 9000);
        assert_eq!((raw >> 15) & 1, LEVEL_ACTIVE);
        assert_eq!((raw >> 16) & 0x7FFF, 4500);
        assert_eq!(raw >> 31, LEVEL_IDLE);
    }

    #[test]
    fn test_from_raw_ignores_levels() {
        let raw = 560 | (1 << 15) | (1690 << 16) | (1 << 31);
        assert_eq!(Symbol::from_raw(raw), Symbol::new(560, 1690));
    }

    #[test]
    fn test_new_clamps_to_15_bits() {
        let symbol = Symbol::new(0xFFFF, 0x8000);
        assert_eq!(symbol.active, MAX_DURATION_TICKS);
        assert_eq!(symbol.idle, MAX_DURATION_TICKS);
    }
}
