//! # LaserTag IR
//!
//! One-way infrared shot link between a laser tag blaster and a target.
//!
//! ## Architecture
//!
//! ```text
//! Blaster                                   Target
//! ───────                                   ──────
//! trigger ISR ─▶ ShotRequests               RX ISR ─▶ BurstQueue
//!                    │                                    │
//!   ShotCounter ─▶ TxChannel ─▶ RMT TX ~~IR~~ RMT RX    RxPipeline
//!                 (NecEncoder)                        (NecDecoder)
//!                                                          │
//!                                          ShotHandler ◀───┘
//!                                          (sequence tracking, LinkStats)
//! ```
//!
//! Everything above the RMT driver is plain `no_std` code and runs on the
//! host against [`transport::LoopbackMedium`]. The ESP-IDF drivers live in
//! [`hal`], compiled only for `target_os = "espidf"`.

#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod queue;
pub mod shot;
pub mod stats;
pub mod symbol;
pub mod timing;
pub mod transport;
pub mod trigger;

#[cfg(target_os = "espidf")]
pub mod hal;

pub use config::{IrConfig, TriggerConfig};
pub use decoder::{DecodeError, NecDecoder};
pub use encoder::{EncodeSession, NecEncoder};
pub use log_globals::{ISR_LOG_STREAM, RX_LOG_STREAM, TX_LOG_STREAM};
pub use queue::BurstQueue;
pub use shot::{ShotCounter, ShotFrame, ShotHandler, ShotOutcome};
pub use stats::{LinkSnapshot, LinkStats};
pub use symbol::Symbol;
pub use timing::TimingTable;
pub use transport::{RxPipeline, TxChannel};
pub use trigger::ShotRequests;
