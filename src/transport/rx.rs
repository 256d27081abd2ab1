//! Receive consumer: burst queue → decoder → frame handler.
//!
//! Runs in a single task. Each [`RxPipeline::poll`] takes at most one burst,
//! decodes it, runs the handler on success and only then re-opens the receive
//! window. A transmission arriving while a burst is being handled is not
//! captured at all; the link has no acknowledgements, so that loss is silent.

use crate::decoder::{DecodeError, NecDecoder};
use crate::queue::{BurstQueue, RX_QUEUE_DEPTH};
use crate::stats::LinkStats;
use crate::transport::{FrameHandler, IrReceiver, TransportError};
use crate::logging::LogStream;
use crate::{rt_debug, rt_trace, rt_warn};

/// Decode buffer size. Holds the largest payload one burst can carry.
pub const DECODE_BUFFER_BYTES: usize = 16;

/// What happened to one burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstOutcome {
    /// Decoded and handed to the frame handler.
    Frame { bytes: usize },
    /// Valid leader and ending with no payload; handler not called.
    Empty,
    /// Rejected by the decoder.
    Rejected(DecodeError),
}

/// Single-consumer receive loop body.
pub struct RxPipeline<'a, R: IrReceiver, H: FrameHandler, const N: usize = RX_QUEUE_DEPTH> {
    queue: &'a BurstQueue<N>,
    receiver: R,
    decoder: NecDecoder,
    handler: H,
    stats: &'a LinkStats,
    log: &'a LogStream,
    buffer: [u8; DECODE_BUFFER_BYTES],
}

impl<'a, R: IrReceiver, H: FrameHandler, const N: usize> RxPipeline<'a, R, H, N> {
    /// Create a pipeline.
    ///
    /// # Arguments
    ///
    /// * `queue` - Queue the receive interrupt fills
    /// * `receiver` - Window control for the same channel
    /// * `decoder` - Decoder for the channel's timing
    /// * `handler` - Called with each decoded payload
    /// * `stats` - Counters to update
    /// * `log` - Stream for per-burst diagnostics
    pub fn new(
        queue: &'a BurstQueue<N>,
        receiver: R,
        decoder: NecDecoder,
        handler: H,
        stats: &'a LinkStats,
        log: &'a LogStream,
    ) -> Self {
        Self {
            queue,
            receiver,
            decoder,
            handler,
            stats,
            log,
            buffer: [0; DECODE_BUFFER_BYTES],
        }
    }

    /// Open the receive window for the first burst.
    pub fn start(&mut self) -> Result<(), TransportError> {
        self.receiver.arm()
    }

    /// Process at most one queued burst.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(outcome))` - One burst handled, window re-armed
    /// - `Ok(None)` - Queue empty, nothing done
    /// - `Err(_)` - Re-arming the receiver failed
    pub fn poll(&mut self) -> Result<Option<BurstOutcome>, TransportError> {
        let Self {
            queue,
            decoder,
            handler,
            stats,
            log,
            buffer,
            ..
        } = &mut *self;

        let outcome = queue.pop_with(|burst| {
            stats.record_burst();
            let now = crate::clock::now_us();

            if burst.truncated() {
                rt_warn!(log, now, "burst truncated at {} symbols", burst.len());
            }

            match decoder.decode(burst.symbols(), buffer) {
                Ok(0) => {
                    stats.record_frame(0);
                    BurstOutcome::Empty
                }
                Ok(len) => {
                    stats.record_frame(len);
                    rt_trace!(log, now, "decoded {} bytes", len);
                    handler.on_frame(&buffer[..len]);
                    BurstOutcome::Frame { bytes: len }
                }
                Err(e) => {
                    stats.record_decode_error(&e);
                    rt_debug!(log, now, "burst rejected: {}", e);
                    BurstOutcome::Rejected(e)
                }
            }
        });

        match outcome {
            Some(outcome) => {
                self.receiver.arm()?;
                Ok(Some(outcome))
            }
            None => Ok(None),
        }
    }

    /// Process every queued burst; returns how many were handled.
    pub fn drain(&mut self) -> Result<usize, TransportError> {
        let mut handled = 0;
        while self.poll()?.is_some() {
            handled += 1;
        }
        Ok(handled)
    }

    /// Bursts the interrupt dropped because the queue was full.
    #[inline]
    pub fn overflowed(&self) -> u32 {
        self.queue.dropped()
    }

    #[inline]
    pub fn receiver(&self) -> &R {
        &self.receiver
    }
}
