//! Microsecond timestamps for log entries.

/// Microseconds since boot.
#[cfg(target_os = "espidf")]
#[inline]
pub fn now_us() -> i64 {
    // SAFETY: esp_timer_get_time is callable from tasks and ISRs
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}

/// Host builds have no boot timer; entries are stamped zero.
#[cfg(not(target_os = "espidf"))]
#[inline]
pub fn now_us() -> i64 {
    0
}
