//! Module: config
//!
//! Purpose: Link and board configuration.
//!
//! Architecture:
//! - Plain structs with `Default` holding the deployed board's values
//! - Built once at startup and passed by reference into each driver
//! - No process-wide mutable state
//!
//! Safety: Safe. No unsafe blocks.

use crate::timing::{TimingError, TimingTable, DEFAULT_MARGIN_US, REFERENCE_HZ};

/// IR channel configuration, shared by the transmit and receive sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrConfig {
    /// Channel tick rate.
    pub resolution_hz: u32,

    /// Receive tolerance in microseconds.
    pub margin_us: u32,

    /// IR LED output pin.
    pub tx_gpio: i32,

    /// Demodulating receiver input pin.
    pub rx_gpio: i32,

    /// RMT memory per channel, in symbols.
    pub mem_block_symbols: usize,

    /// Transmissions the driver may hold in flight.
    pub trans_queue_depth: usize,

    /// Carrier frequency.
    pub carrier_hz: u32,

    /// Carrier duty cycle (0.0..1.0).
    pub carrier_duty: f32,

    /// Pulses shorter than this are treated as glitches.
    pub rx_signal_min_ns: u32,

    /// An idle longer than this ends a burst.
    pub rx_signal_max_ns: u32,
}

impl Default for IrConfig {
    fn default() -> Self {
        Self {
            resolution_hz: REFERENCE_HZ,
            margin_us: DEFAULT_MARGIN_US,
            tx_gpio: 15,
            rx_gpio: 4,
            mem_block_symbols: 128,
            trans_queue_depth: 4,
            carrier_hz: 40_000,
            carrier_duty: 0.33,
            rx_signal_min_ns: 1_250,
            rx_signal_max_ns: 12_000_000,
        }
    }
}

impl IrConfig {
    /// Build the timing table for this channel.
    pub fn timing(&self) -> Result<TimingTable, TimingError> {
        TimingTable::new(self.resolution_hz, self.margin_us)
    }

    /// Idle length, in ticks, at or above which a received burst ends.
    ///
    /// Clamped to the 15-bit symbol range, where it meets the ending
    /// symbol's idle.
    pub fn burst_end_idle_ticks(&self) -> u16 {
        let ticks = self.rx_signal_max_ns as u64 * self.resolution_hz as u64 / 1_000_000_000;
        ticks.min(crate::symbol::MAX_DURATION_TICKS as u64) as u16
    }
}

/// Blaster trigger button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    pub pin: i32,
    /// Pressed pulls the pin low.
    pub active_low: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            pin: 18,
            active_low: true,
        }
    }
}
