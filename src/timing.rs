//! NEC-derived timing table.
//!
//! Nominal durations are defined in microseconds and resolved once into
//! channel ticks. Every comparison after construction happens in ticks, so the
//! protocol behaves the same at any channel resolution.
//!
//! | Code    | Active  | Idle      |
//! |---------|---------|-----------|
//! | Leader  | 9000 µs | 4500 µs   |
//! | Bit 0   | 560 µs  | 560 µs    |
//! | Bit 1   | 560 µs  | 1690 µs   |
//! | Ending  | 560 µs  | unbounded |

use crate::symbol::{Symbol, MAX_DURATION_TICKS};

/// Clock the nominal durations are written against (1 tick = 1 µs).
pub const REFERENCE_HZ: u32 = 1_000_000;

/// Leader code: 9 ms burst, 4.5 ms space.
pub const LEADER_US: (u32, u32) = (9000, 4500);

/// Logic 0: 560 µs burst, 560 µs space.
pub const BIT0_US: (u32, u32) = (560, 560);

/// Logic 1: 560 µs burst, 1690 µs space.
pub const BIT1_US: (u32, u32) = (560, 1690);

/// Ending code burst. Its space is not part of the protocol.
pub const ENDING_ACTIVE_US: u32 = 560;

/// Default tolerance around every nominal duration.
pub const DEFAULT_MARGIN_US: u32 = 200;

/// Errors building a timing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingError {
    /// T01: Resolution of zero ticks per second
    ZeroResolution,
    /// T02: A duration does not fit the 15-bit tick field
    DurationOverflow { us: u32, ticks: u64 },
    /// T03: A duration or the margin rounds down to zero ticks
    ZeroDuration { us: u32 },
    /// T04: Margin wide enough to confuse two nominal durations
    AmbiguousMargin { margin: u16, min_gap: u16 },
}

impl TimingError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroResolution => "T01",
            Self::DurationOverflow { .. } => "T02",
            Self::ZeroDuration { .. } => "T03",
            Self::AmbiguousMargin { .. } => "T04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::ZeroResolution => "zero resolution",
            Self::DurationOverflow { .. } => "duration exceeds 15-bit ticks",
            Self::ZeroDuration { .. } => "duration rounds to zero ticks",
            Self::AmbiguousMargin { .. } => "margin overlaps nominal durations",
        }
    }
}

impl core::fmt::Display for TimingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())?;
        match self {
            Self::DurationOverflow { us, ticks } => write!(f, " ({} us -> {} ticks)", us, ticks),
            Self::ZeroDuration { us } => write!(f, " ({} us)", us),
            Self::AmbiguousMargin { margin, min_gap } => {
                write!(f, " (margin {} ticks, gap {} ticks)", margin, min_gap)
            }
            Self::ZeroResolution => Ok(()),
        }
    }
}

/// Nominal symbols and tolerance resolved for one channel.
///
/// Constructed once per channel, read-only afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingTable {
    resolution_hz: u32,
    leader: Symbol,
    bit0: Symbol,
    bit1: Symbol,
    ending: Symbol,
    margin: u16,
}

impl TimingTable {
    /// Table for a 1 MHz channel with the default 200 µs margin.
    pub const STANDARD: Self = Self {
        resolution_hz: REFERENCE_HZ,
        leader: Symbol::new(LEADER_US.0 as u16, LEADER_US.1 as u16),
        bit0: Symbol::new(BIT0_US.0 as u16, BIT0_US.1 as u16),
        bit1: Symbol::new(BIT1_US.0 as u16, BIT1_US.1 as u16),
        ending: Symbol::new(ENDING_ACTIVE_US as u16, MAX_DURATION_TICKS),
        margin: DEFAULT_MARGIN_US as u16,
    };

    /// Resolve the nominal durations for a channel.
    ///
    /// # Arguments
    ///
    /// * `resolution_hz` - Channel tick rate (ticks per second)
    /// * `margin_us` - Tolerance applied to every comparison
    pub fn new(resolution_hz: u32, margin_us: u32) -> Result<Self, TimingError> {
        if resolution_hz == 0 {
            return Err(TimingError::ZeroResolution);
        }

        let phase = |us| scale(us, resolution_hz);
        let table = Self {
            resolution_hz,
            leader: Symbol::new(phase(LEADER_US.0)?, phase(LEADER_US.1)?),
            bit0: Symbol::new(phase(BIT0_US.0)?, phase(BIT0_US.1)?),
            bit1: Symbol::new(phase(BIT1_US.0)?, phase(BIT1_US.1)?),
            // Space after the ending burst only terminates the transmission
            ending: Symbol::new(phase(ENDING_ACTIVE_US)?, MAX_DURATION_TICKS),
            margin: phase(margin_us)?,
        };

        let min_gap = table.min_gap();
        if 2 * table.margin as u32 >= min_gap as u32 {
            return Err(TimingError::AmbiguousMargin {
                margin: table.margin,
                min_gap,
            });
        }

        Ok(table)
    }

    /// Channel resolution this table was resolved for.
    #[inline]
    pub fn resolution_hz(&self) -> u32 {
        self.resolution_hz
    }

    /// Tolerance margin in ticks.
    #[inline]
    pub fn margin(&self) -> u16 {
        self.margin
    }

    #[inline]
    pub fn leader(&self) -> Symbol {
        self.leader
    }

    #[inline]
    pub fn bit0(&self) -> Symbol {
        self.bit0
    }

    #[inline]
    pub fn bit1(&self) -> Symbol {
        self.bit1
    }

    #[inline]
    pub fn ending(&self) -> Symbol {
        self.ending
    }

    /// Nominal symbol for one data bit.
    #[inline]
    pub fn bit(&self, one: bool) -> Symbol {
        if one {
            self.bit1
        } else {
            self.bit0
        }
    }

    /// Check a measured duration against a nominal one.
    ///
    /// Open interval: `nominal - margin < measured < nominal + margin`.
    #[inline]
    pub fn matches(&self, measured: u16, nominal: u16) -> bool {
        let measured = measured as u32;
        let nominal = nominal as u32;
        let margin = self.margin as u32;
        measured + margin > nominal && measured < nominal + margin
    }

    /// Both phases within tolerance of the leader code.
    #[inline]
    pub fn is_leader(&self, symbol: Symbol) -> bool {
        self.matches_both(symbol, self.leader)
    }

    /// Decode a data symbol.
    ///
    /// Returns `Some(bit)` when both phases match a bit nominal, `None` when
    /// the symbol is neither logic 0 nor logic 1.
    #[inline]
    pub fn classify_bit(&self, symbol: Symbol) -> Option<bool> {
        if self.matches_both(symbol, self.bit1) {
            Some(true)
        } else if self.matches_both(symbol, self.bit0) {
            Some(false)
        } else {
            None
        }
    }

    /// Active phase within tolerance of the ending code.
    #[inline]
    pub fn is_ending(&self, symbol: Symbol) -> bool {
        self.matches(symbol.active, self.ending.active)
    }

    fn matches_both(&self, measured: Symbol, nominal: Symbol) -> bool {
        self.matches(measured.active, nominal.active) && self.matches(measured.idle, nominal.idle)
    }

    /// Smallest gap between two distinct nominal durations of the same phase.
    fn min_gap(&self) -> u16 {
        let active = [self.leader.active, self.bit0.active, self.bit1.active, self.ending.active];
        let idle = [self.leader.idle, self.bit0.idle, self.bit1.idle];
        min_distinct_gap(&active).min(min_distinct_gap(&idle))
    }
}

impl Default for TimingTable {
    fn default() -> Self {
        Self::STANDARD
    }
}

fn scale(us: u32, resolution_hz: u32) -> Result<u16, TimingError> {
    let ticks = us as u64 * resolution_hz as u64 / REFERENCE_HZ as u64;
    if ticks == 0 {
        return Err(TimingError::ZeroDuration { us });
    }
    if ticks > MAX_DURATION_TICKS as u64 {
        return Err(TimingError::DurationOverflow { us, ticks });
    }
    Ok(ticks as u16)
}

fn min_distinct_gap(values: &[u16]) -> u16 {
    let mut gap = u16::MAX;
    for (i, a) in values.iter().enumerate() {
        for b in &values[i + 1..] {
            if a != b {
                gap = gap.min(a.abs_diff(*b));
            }
        }
    }
    gap
}
