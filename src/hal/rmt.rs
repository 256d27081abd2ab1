//! RMT channels driving the IR LED and sampling the IR receiver.
//!
//! # Hardware Setup
//!
//! ```text
//! GPIO15 ──▶ IR LED driver    (40 kHz carrier, 33 % duty)
//! GPIO4  ◀── IR demodulator   (carrier removed, active high)
//! ```
//!
//! Transmit uses the copy encoder: symbols are packed into RMT words by
//! [`Symbol::to_raw`] and handed over verbatim. Receive runs one-shot: each
//! [`RmtReceiver::arm`] captures one burst into a static buffer, and the
//! receive-done interrupt copies it into the [`BurstQueue`] and notifies the
//! task that created the receiver. That task sleeps in
//! [`RmtReceiver::wait_for_burst`] until then.

use core::cell::UnsafeCell;
use core::ffi::c_void;
use core::num::NonZeroU32;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use esp_idf_svc::hal::delay::BLOCK;
use esp_idf_svc::hal::task;
use esp_idf_svc::sys::{
    esp, rmt_apply_carrier, rmt_carrier_config_t, rmt_channel_handle_t, rmt_copy_encoder_config_t,
    rmt_del_channel, rmt_del_encoder, rmt_disable, rmt_enable, rmt_encoder_handle_t,
    rmt_new_copy_encoder, rmt_new_rx_channel, rmt_new_tx_channel, rmt_receive,
    rmt_receive_config_t, rmt_rx_channel_config_t, rmt_rx_done_event_data_t,
    rmt_rx_event_callbacks_t, rmt_rx_register_event_callbacks, rmt_symbol_word_t, rmt_transmit,
    rmt_transmit_config_t, rmt_tx_channel_config_t, rmt_tx_wait_all_done,
    soc_periph_rmt_clk_src_t_RMT_CLK_SRC_DEFAULT, tskTaskControlBlock, EspError,
};

use crate::config::IrConfig;
use crate::queue::{BurstQueue, MAX_BURST_SYMBOLS};
use crate::symbol::Symbol;
use crate::transport::{IrReceiver, IrTransmitter, TransportError};
use crate::{rt_warn, ISR_LOG_STREAM};

/// Block until the driver has sent everything queued.
const WAIT_FOREVER: i32 = -1;

/// Capture buffer the RMT driver writes into while a receive is armed.
///
/// # Safety
///
/// Owned by the driver between `rmt_receive` and the receive-done interrupt,
/// read by that interrupt, and never touched by task code.
struct CaptureBuffer(UnsafeCell<[rmt_symbol_word_t; MAX_BURST_SYMBOLS]>);

// SAFETY: see CaptureBuffer docs; accesses are serialized by the driver.
unsafe impl Sync for CaptureBuffer {}

static CAPTURE_BUFFER: CaptureBuffer =
    CaptureBuffer(UnsafeCell::new([rmt_symbol_word_t { val: 0 }; MAX_BURST_SYMBOLS]));

/// Task woken by the receive-done interrupt; null while no receiver exists.
static CONSUMER_TASK: AtomicPtr<tskTaskControlBlock> = AtomicPtr::new(ptr::null_mut());

/// Notification bit posted per captured burst.
const BURST_READY: NonZeroU32 = NonZeroU32::MIN;

/// Transmit channel with carrier and copy encoder.
pub struct RmtTransmitter {
    channel: rmt_channel_handle_t,
    encoder: rmt_encoder_handle_t,
    words: [u32; MAX_BURST_SYMBOLS],
}

impl RmtTransmitter {
    /// Create, configure and enable the transmit channel.
    pub fn new(config: &IrConfig) -> Result<Self, EspError> {
        let channel_config = rmt_tx_channel_config_t {
            gpio_num: config.tx_gpio,
            clk_src: soc_periph_rmt_clk_src_t_RMT_CLK_SRC_DEFAULT,
            resolution_hz: config.resolution_hz,
            mem_block_symbols: config.mem_block_symbols,
            trans_queue_depth: config.trans_queue_depth,
            ..Default::default()
        };

        let mut channel: rmt_channel_handle_t = ptr::null_mut();
        // SAFETY: config outlives the call; handle is written on success
        esp!(unsafe { rmt_new_tx_channel(&channel_config, &mut channel) })?;

        let carrier = rmt_carrier_config_t {
            frequency_hz: config.carrier_hz,
            duty_cycle: config.carrier_duty,
            ..Default::default()
        };

        let mut encoder: rmt_encoder_handle_t = ptr::null_mut();
        let encoder_config = rmt_copy_encoder_config_t::default();

        // SAFETY: channel handle valid from here on; released in Drop
        let setup = unsafe {
            esp!(rmt_apply_carrier(channel, &carrier))
                .and_then(|_| esp!(rmt_new_copy_encoder(&encoder_config, &mut encoder)))
                .and_then(|_| esp!(rmt_enable(channel)))
        };

        if let Err(e) = setup {
            // SAFETY: channel was created above and is not enabled
            unsafe {
                if !encoder.is_null() {
                    rmt_del_encoder(encoder);
                }
                rmt_del_channel(channel);
            }
            return Err(e);
        }

        Ok(Self {
            channel,
            encoder,
            words: [0; MAX_BURST_SYMBOLS],
        })
    }
}

impl IrTransmitter for RmtTransmitter {
    /// Send `symbols` and wait until they have left the peripheral.
    ///
    /// Waiting lets the next call reuse the word buffer.
    fn transmit(&mut self, symbols: &[Symbol]) -> Result<(), TransportError> {
        let transmit_config = rmt_transmit_config_t {
            loop_count: 0,
            ..Default::default()
        };

        for chunk in symbols.chunks(MAX_BURST_SYMBOLS) {
            for (word, symbol) in self.words.iter_mut().zip(chunk) {
                *word = symbol.to_raw();
            }

            // SAFETY: words stays borrowed until rmt_tx_wait_all_done returns
            unsafe {
                esp!(rmt_transmit(
                    self.channel,
                    self.encoder,
                    self.words.as_ptr() as *const c_void,
                    chunk.len() * core::mem::size_of::<u32>(),
                    &transmit_config,
                ))?;
                esp!(rmt_tx_wait_all_done(self.channel, WAIT_FOREVER))?;
            }
        }

        Ok(())
    }
}

impl Drop for RmtTransmitter {
    fn drop(&mut self) {
        // SAFETY: handles created in new(); errors on teardown are ignored
        unsafe {
            rmt_disable(self.channel);
            rmt_del_encoder(self.encoder);
            rmt_del_channel(self.channel);
        }
    }
}

/// Receive channel feeding a static [`BurstQueue`].
pub struct RmtReceiver {
    channel: rmt_channel_handle_t,
    receive_config: rmt_receive_config_t,
}

impl RmtReceiver {
    /// Create the receive channel and route its interrupt into `queue`.
    ///
    /// Only one receiver may exist: it owns the static capture buffer. The
    /// calling task becomes the one [`wait_for_burst`](Self::wait_for_burst)
    /// wakes, so create the receiver from the receive consumer task.
    pub fn new<const N: usize>(
        config: &IrConfig,
        queue: &'static BurstQueue<N>,
    ) -> Result<Self, EspError> {
        let channel_config = rmt_rx_channel_config_t {
            gpio_num: config.rx_gpio,
            clk_src: soc_periph_rmt_clk_src_t_RMT_CLK_SRC_DEFAULT,
            resolution_hz: config.resolution_hz,
            mem_block_symbols: config.mem_block_symbols,
            ..Default::default()
        };

        let mut channel: rmt_channel_handle_t = ptr::null_mut();
        // SAFETY: config outlives the call; handle is written on success
        esp!(unsafe { rmt_new_rx_channel(&channel_config, &mut channel) })?;

        let callbacks = rmt_rx_event_callbacks_t {
            on_recv_done: Some(on_recv_done::<N>),
        };

        // SAFETY: queue is 'static, so the user context never dangles
        let setup = unsafe {
            esp!(rmt_rx_register_event_callbacks(
                channel,
                &callbacks,
                queue as *const BurstQueue<N> as *mut c_void,
            ))
            .and_then(|_| esp!(rmt_enable(channel)))
        };

        if let Err(e) = setup {
            // SAFETY: channel was created above
            unsafe {
                rmt_del_channel(channel);
            }
            return Err(e);
        }

        if let Some(current) = task::current() {
            CONSUMER_TASK.store(current, Ordering::Release);
        }

        Ok(Self {
            channel,
            receive_config: rmt_receive_config_t {
                signal_range_min_ns: config.rx_signal_min_ns,
                signal_range_max_ns: config.rx_signal_max_ns,
                ..Default::default()
            },
        })
    }

    /// Sleep until the receive interrupt has queued a burst.
    ///
    /// Returns at once if a burst arrived since the last wait. Spurious
    /// returns are harmless: the caller polls the queue afterwards.
    pub fn wait_for_burst(&self) {
        let _ = task::wait_notification(BLOCK);
    }
}

impl IrReceiver for RmtReceiver {
    fn arm(&mut self) -> Result<(), TransportError> {
        // SAFETY: the capture buffer is only read by on_recv_done, which runs
        // after the driver has finished writing it
        esp!(unsafe {
            rmt_receive(
                self.channel,
                CAPTURE_BUFFER.0.get() as *mut c_void,
                core::mem::size_of::<[rmt_symbol_word_t; MAX_BURST_SYMBOLS]>(),
                &self.receive_config,
            )
        })?;
        Ok(())
    }
}

impl Drop for RmtReceiver {
    fn drop(&mut self) {
        CONSUMER_TASK.store(ptr::null_mut(), Ordering::Release);
        // SAFETY: handle created in new(); errors on teardown are ignored
        unsafe {
            rmt_disable(self.channel);
            rmt_del_channel(self.channel);
        }
    }
}

/// Receive-done interrupt: copy the burst into the queue, wake the consumer.
///
/// Never blocks, never allocates. Returns whether a higher-priority task was
/// woken, so the driver can yield on interrupt exit.
unsafe extern "C" fn on_recv_done<const N: usize>(
    _channel: rmt_channel_handle_t,
    event: *const rmt_rx_done_event_data_t,
    user_ctx: *mut c_void,
) -> bool {
    // SAFETY: user_ctx was registered as &'static BurstQueue<N>; event and
    // its symbol array are valid for the duration of the callback
    let queue = &*(user_ctx as *const BurstQueue<N>);
    let event = &*event;
    let words = core::slice::from_raw_parts(event.received_symbols, event.num_symbols);

    if !queue.push_iter(words.iter().map(|word| Symbol::from_raw(word.val))) {
        rt_warn!(ISR_LOG_STREAM, crate::clock::now_us(), "rx queue full, burst dropped");
    }

    let consumer = CONSUMER_TASK.load(Ordering::Acquire);
    if consumer.is_null() {
        return false;
    }
    // SAFETY: the handle is cleared before the receiver, and with it this
    // callback, goes away
    let (_, woken) = task::notify(consumer, BURST_READY);
    woken
}
