//! Global log stream instances.
//!
//! One stream per producing context, so drained lines can be labelled by
//! where they came from. Library types take their stream by reference; only
//! the firmware binaries and the HAL interrupt name these statics.

use crate::logging::LogStream;

/// Receive-done interrupt.
///
/// Only the RMT receive callback writes here.
pub static ISR_LOG_STREAM: LogStream = LogStream::new();

/// Receive consumer task: decode outcomes, shot classification.
pub static RX_LOG_STREAM: LogStream = LogStream::new();

/// Transmit task: trigger requests, encoder and driver errors.
pub static TX_LOG_STREAM: LogStream = LogStream::new();
