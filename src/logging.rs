//! Interrupt-safe logging for the IR link.
//!
//! # Architecture
//!
//! ```text
//! RX ISR / RX task / TX task     LogStream           Drain loop
//! ──────────────────────────     ─────────           ──────────
//!
//! rt_log!() ───────────────────▶ [L0][L1][L2] ─────▶ console
//! non-blocking                   lock-free           blocking ok
//! no allocation                  ring buffer
//! ```
//!
//! # Rules
//!
//! - Interrupt and decode paths never call blocking log functions
//! - `log::*`, `println!` and `ESP_LOGx` are not used on those paths
//! - Streams take any number of producers; the firmware keeps one per
//!   context (see `log_globals`) so the drain can label them
//! - Messages are dropped, and counted, when a ring is full

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 96;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 64;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LogEntry {
    /// Timestamp in microseconds since boot.
    pub timestamp_us: i64,
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: Self = Self {
        timestamp_us: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text. Truncation may split a UTF-8 sequence; the broken tail
    /// is cut.
    pub fn message(&self) -> &str {
        let bytes = &self.msg[..self.len as usize];
        match core::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Lock-free log stream.
///
/// - Push never blocks (drops message if full)
/// - Any number of producers; drain runs in a background task at leisure
/// - Each slot carries a stamp: `pos` when free for the producer of `pos`,
///   `pos + 1` when filled, `pos + N` once drained. Positions are claimed by
///   CAS, so a slot is only touched by the side whose turn it is
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    entries: UnsafeCell<[LogEntry; N]>,
    stamps: [AtomicU32; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: slot access is serialized by the stamp protocol above.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;
    const UNSTAMPED: AtomicU32 = AtomicU32::new(0);

    /// Create a new empty log stream.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");

        let mut stamps = [Self::UNSTAMPED; N];
        let mut i = 0;
        while i < N {
            stamps[i] = AtomicU32::new(i as u32);
            i += 1;
        }

        Self {
            entries: UnsafeCell::new([LogEntry::EMPTY; N]),
            stamps,
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Push a log entry (ISR-safe, never blocks).
    ///
    /// Returns `true` if message was queued, `false` if dropped (ring full).
    /// Messages longer than [`MAX_MSG_LEN`] are truncated.
    ///
    /// # Timing
    ///
    /// O(message length), plus one CAS retry per concurrent producer.
    #[inline]
    pub fn push(&self, timestamp_us: i64, level: LogLevel, msg: &[u8]) -> bool {
        let Some(pos) = self.claim(&self.write_idx, 0) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let len = msg.len().min(MAX_MSG_LEN);

        // SAFETY: position claimed, and its stamp says the drain is done
        // with the slot
        unsafe {
            let entry = &mut *self.entry_ptr(pos);
            entry.timestamp_us = timestamp_us;
            entry.level = level;
            entry.len = len as u8;
            entry.msg[..len].copy_from_slice(&msg[..len]);
        }

        self.stamp(pos).store(pos.wrapping_add(1), Ordering::Release);
        true
    }

    /// Drain next log entry.
    ///
    /// Returns `None` if no entries are available, or if the oldest claimed
    /// slot is still being written.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let pos = self.claim(&self.read_idx, 1)?;

        // SAFETY: position claimed, and its stamp says the producer is done
        // with the slot
        let entry = unsafe { *self.entry_ptr(pos) };

        self.stamp(pos).store(pos.wrapping_add(N as u32), Ordering::Release);
        Some(entry)
    }

    /// Get count of dropped messages.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Read and clear the dropped counter in one step.
    #[inline]
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Get number of entries claimed but not yet drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Acquire);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read).min(N as u32)
    }

    /// Claim the next position on `cursor` whose stamp reads `pos + turn`.
    ///
    /// `None` when that slot is not ready for this side yet.
    fn claim(&self, cursor: &AtomicU32, turn: u32) -> Option<u32> {
        let mut pos = cursor.load(Ordering::Relaxed);
        loop {
            let stamp = self.stamp(pos).load(Ordering::Acquire);
            let lag = stamp.wrapping_sub(pos.wrapping_add(turn)) as i32;
            if lag < 0 {
                return None;
            }
            if lag > 0 {
                pos = cursor.load(Ordering::Relaxed);
                continue;
            }
            match cursor.compare_exchange_weak(
                pos,
                pos.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(pos),
                Err(current) => pos = current,
            }
        }
    }

    #[inline]
    fn stamp(&self, pos: u32) -> &AtomicU32 {
        &self.stamps[pos as usize & Self::MASK]
    }

    #[inline]
    fn entry_ptr(&self, pos: u32) -> *mut LogEntry {
        let base = self.entries.get() as *mut LogEntry;
        // SAFETY: masked index is always within the N-entry array
        unsafe { base.add(pos as usize & Self::MASK) }
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer.
///
/// Output past the end of `buf` is cut. Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
    }

    impl Write for BufWriter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// Interrupt-safe log macro.
///
/// # Example
///
/// ```ignore
/// rt_log!(LogLevel::Info, RX_LOG_STREAM, now_us(), "seq {} hit", seq);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($level:expr, $stream:expr, $timestamp:expr, $($arg:tt)*) => {{
        let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
        let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
        $stream.push($timestamp, $level, &buf[..len]);
    }};
}

#[macro_export]
macro_rules! rt_info {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Info, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_warn {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Warn, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_error {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Error, $stream, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! rt_debug {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Debug, $stream, $timestamp, $($arg)*)
    };
}

/// Maximum verbosity: per-burst detail.
#[macro_export]
macro_rules! rt_trace {
    ($stream:expr, $timestamp:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Trace, $stream, $timestamp, $($arg)*)
    };
}
