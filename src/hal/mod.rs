//! Hardware Abstraction Layer for the IR link.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Protocol logic stays in core modules, HAL is just I/O.

pub mod rmt;
pub mod trigger;

pub use rmt::{RmtReceiver, RmtTransmitter};
pub use trigger::TriggerInput;

use crate::transport::TransportError;
use esp_idf_svc::sys::EspError;

impl From<EspError> for TransportError {
    fn from(e: EspError) -> Self {
        TransportError::Hardware(e.code())
    }
}
