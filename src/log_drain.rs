//! Log output: drains the log streams into a text sink.
//!
//! The firmware points this at the console from a background loop; tests
//! point it at a `String`.
//!
//! ```text
//! ISR_LOG_STREAM ─┐
//! RX_LOG_STREAM  ─┼──▶ drain_into() ──▶ core::fmt::Write
//! TX_LOG_STREAM  ─┘
//! ```

use core::fmt::Write;

use crate::logging::{LogEntry, LogStream};

/// Write one entry as `[timestamp_us] LEVEL: message\n`.
pub fn format_log_entry<W: Write>(out: &mut W, entry: &LogEntry) -> core::fmt::Result {
    writeln!(
        out,
        "[{:10}] {}: {}",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.message()
    )
}

/// Drain every pending entry of each stream, in stream order.
///
/// Streams that dropped messages since the last call get one
/// `WARN: <name> dropped N` line after their entries. Returns the number of
/// entries written.
pub fn drain_into<W: Write, const N: usize>(
    out: &mut W,
    streams: &[(&str, &LogStream<N>)],
) -> Result<usize, core::fmt::Error> {
    let mut written = 0;

    for (name, stream) in streams {
        while let Some(entry) = stream.drain() {
            format_log_entry(out, &entry)?;
            written += 1;
        }

        let dropped = stream.take_dropped();
        if dropped > 0 {
            writeln!(out, "WARN: {} dropped {}", name, dropped)?;
        }
    }

    Ok(written)
}

/// Drain the three global streams.
pub fn drain_global<W: Write>(out: &mut W) -> Result<usize, core::fmt::Error> {
    drain_into(
        out,
        &[
            ("isr", &crate::ISR_LOG_STREAM),
            ("rx", &crate::RX_LOG_STREAM),
            ("tx", &crate::TX_LOG_STREAM),
        ],
    )
}
