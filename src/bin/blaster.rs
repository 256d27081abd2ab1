//! Blaster firmware: trigger press → shot frame → IR.
//!
//! 1. Initialize the RMT transmit channel and the trigger interrupt
//! 2. Start the log drain task
//! 3. Serve shot requests from the transmit loop
//!
//! On the host the same transmit path runs against an in-memory medium and
//! a receive pipeline, and prints what the target would have seen.

use core::fmt::Write;

use laser_tag_ir::shot::ShotFrame;
use laser_tag_ir::transport::{IrTransmitter, TransportError};
use laser_tag_ir::{rt_error, rt_info, LinkStats, ShotCounter, TxChannel, TX_LOG_STREAM};

/// Console sink for the log drain.
struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        print!("{}", s);
        Ok(())
    }
}

/// Fire the next shot.
///
/// The sequence number is only consumed once the frame has gone out, so a
/// failed transmit does not open a gap the target would score as a miss.
fn fire<T: IrTransmitter>(tx: &mut TxChannel<T>, counter: &mut ShotCounter, stats: &LinkStats) {
    let frame = ShotFrame::new(counter.peek());
    let now = laser_tag_ir::clock::now_us();

    match tx.send(&frame.to_bytes()) {
        Ok(symbols) => {
            counter.next_frame();
            stats.record_sent();
            rt_info!(TX_LOG_STREAM, now, "shot seq={} ({} symbols)", frame.sequence(), symbols);
        }
        Err(e) => {
            stats.record_tx_error();
            rt_error!(TX_LOG_STREAM, now, "shot seq={} failed: {}", frame.sequence(), e);
        }
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    use laser_tag_ir::hal::{RmtTransmitter, TriggerInput};
    use laser_tag_ir::{IrConfig, NecEncoder, ShotRequests, TriggerConfig};

    static REQUESTS: ShotRequests = ShotRequests::new();
    static STATS: LinkStats = LinkStats::new();

    esp_idf_svc::sys::link_patches();
    println!("{}", env!("VERSION_STRING"));

    let config = IrConfig::default();
    let timing = match config.timing() {
        Ok(timing) => timing,
        Err(e) => {
            println!("Timing config rejected: {}", e);
            return;
        }
    };

    let transmitter = match RmtTransmitter::new(&config) {
        Ok(transmitter) => transmitter,
        Err(e) => {
            println!("RMT TX init failed: {}", TransportError::from(e));
            return;
        }
    };

    let _trigger = match TriggerInput::new(&TriggerConfig::default(), &REQUESTS) {
        Ok(trigger) => trigger,
        Err(e) => {
            println!("Trigger init failed: {}", TransportError::from(e));
            return;
        }
    };

    let drain = std::thread::Builder::new().stack_size(4096).spawn(|| loop {
        let _ = laser_tag_ir::log_drain::drain_global(&mut Console);
        let requests_dropped = REQUESTS.dropped();
        if requests_dropped > 0 {
            println!("WARN: trigger requests dropped {}", requests_dropped);
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    });
    if let Err(e) = drain {
        println!("Log drain not started: {}", e);
    }

    let mut tx: TxChannel<_> = TxChannel::new(transmitter, NecEncoder::new(&timing));
    let mut counter = ShotCounter::new();

    loop {
        if REQUESTS.take() {
            fire(&mut tx, &mut counter, &STATS);
        } else {
            // SAFETY: plain FreeRTOS delay from task context
            unsafe {
                esp_idf_svc::sys::vTaskDelay(1);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use laser_tag_ir::transport::LoopbackMedium;
    use laser_tag_ir::{
        BurstQueue, IrConfig, NecDecoder, NecEncoder, RxPipeline, ShotHandler, RX_LOG_STREAM,
    };

    println!("{} (host loopback)", env!("VERSION_STRING"));

    let config = IrConfig::default();
    let timing = match config.timing() {
        Ok(timing) => timing,
        Err(e) => {
            println!("Timing config rejected: {}", e);
            return;
        }
    };

    let blaster_stats = LinkStats::new();
    let target_stats = LinkStats::new();
    let queue: BurstQueue = BurstQueue::new();
    let medium = LoopbackMedium::with_burst_end_idle(&queue, config.burst_end_idle_ticks());

    let handler = ShotHandler::new(&target_stats, &RX_LOG_STREAM, |outcome| {
        println!("target: {:?}", outcome)
    });
    let mut rx = RxPipeline::new(
        &queue,
        medium.rx(),
        NecDecoder::new(&timing),
        handler,
        &target_stats,
        &RX_LOG_STREAM,
    );
    let mut tx: TxChannel<_> = TxChannel::new(medium.tx(), NecEncoder::new(&timing));
    let mut counter = ShotCounter::new();

    let mut run = || -> Result<(), TransportError> {
        rx.start()?;
        for _ in 0..3 {
            fire(&mut tx, &mut counter, &blaster_stats);
            rx.drain()?;
        }

        // Second shot arrives while the target still holds the first
        fire(&mut tx, &mut counter, &blaster_stats);
        fire(&mut tx, &mut counter, &blaster_stats);
        rx.drain()?;

        // Target now waits for the lost sequence
        fire(&mut tx, &mut counter, &blaster_stats);
        rx.drain()?;
        Ok(())
    };

    if let Err(e) = run() {
        println!("Loopback failed: {}", e);
    }

    let _ = laser_tag_ir::log_drain::drain_global(&mut Console);
    println!("blaster: {:?}", blaster_stats.snapshot());
    println!("target:  {:?}", target_stats.snapshot());
    println!("lost in window gap: {}", medium.lost());
}
