//! Target firmware: IR burst → decode → hit/miss.
//!
//! 1. Initialize the RMT receive channel (interrupt fills the burst queue)
//! 2. Start the log drain task, which also reports the score
//! 3. Run the receive pipeline, sleeping until the interrupt queues a burst
//!
//! On the host the pipeline is fed from an in-memory medium instead, with a
//! replayed and a noisy shot mixed in.

use core::fmt::Write;
use core::sync::atomic::{AtomicU32, Ordering};

use laser_tag_ir::shot::ShotOutcome;
use laser_tag_ir::transport::TransportError;
use laser_tag_ir::LinkStats;

/// Console sink for the log drain.
struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        print!("{}", s);
        Ok(())
    }
}

/// Hits not yet announced on the console.
static UNREPORTED_HITS: AtomicU32 = AtomicU32::new(0);

/// Feedback hook run by the shot handler with the receive window closed.
fn on_shot(outcome: ShotOutcome) {
    if outcome.is_hit() {
        UNREPORTED_HITS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Print pending log lines and the score if it changed.
fn report(stats: &LinkStats) {
    let _ = laser_tag_ir::log_drain::drain_global(&mut Console);
    if UNREPORTED_HITS.swap(0, Ordering::Relaxed) > 0 {
        let snap = stats.snapshot();
        println!(
            "HIT! hits={} misses={} rejected={}",
            snap.hits,
            snap.misses,
            snap.rejected()
        );
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    use laser_tag_ir::hal::RmtReceiver;
    use laser_tag_ir::{
        rt_error, BurstQueue, IrConfig, NecDecoder, RxPipeline, ShotHandler, RX_LOG_STREAM,
    };

    static QUEUE: BurstQueue = BurstQueue::new();
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

    let receiver = match RmtReceiver::new(&config, &QUEUE) {
        Ok(receiver) => receiver,
        Err(e) => {
            println!("RMT RX init failed: {}", TransportError::from(e));
            return;
        }
    };

    let drain = std::thread::Builder::new().stack_size(4096).spawn(|| loop {
        report(&STATS);
        std::thread::sleep(std::time::Duration::from_millis(20));
    });
    if let Err(e) = drain {
        println!("Log drain not started: {}", e);
    }

    let handler = ShotHandler::new(&STATS, &RX_LOG_STREAM, on_shot);
    let decoder = NecDecoder::new(&timing);
    let mut rx = RxPipeline::new(&QUEUE, receiver, decoder, handler, &STATS, &RX_LOG_STREAM);

    if let Err(e) = rx.start() {
        println!("Receive not started: {}", e);
        return;
    }

    loop {
        match rx.poll() {
            Ok(Some(_)) => {}
            Ok(None) => rx.receiver().wait_for_burst(),
            Err(e) => {
                rt_error!(RX_LOG_STREAM, laser_tag_ir::clock::now_us(), "re-arm failed: {}", e);
                // SAFETY: plain FreeRTOS delay from task context
                unsafe {
                    esp_idf_svc::sys::vTaskDelay(10);
                }
                let _ = rx.start();
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use laser_tag_ir::transport::{IrTransmitter, LoopbackMedium};
    use laser_tag_ir::{
        BurstQueue, IrConfig, NecDecoder, NecEncoder, RxPipeline, ShotFrame, ShotHandler, Symbol,
        TxChannel, RX_LOG_STREAM,
    };

    fn stretch_leader(symbol: Symbol) -> Symbol {
        // Leader burst long enough to leave the tolerance window
        if symbol.active > 5_000 {
            Symbol::new(symbol.active + 400, symbol.idle)
        } else {
            symbol
        }
    }

    println!("{} (host loopback)", env!("VERSION_STRING"));

    let config = IrConfig::default();
    let timing = match config.timing() {
        Ok(timing) => timing,
        Err(e) => {
            println!("Timing config rejected: {}", e);
            return;
        }
    };

    let stats = LinkStats::new();
    let queue: BurstQueue = BurstQueue::new();
    let medium = LoopbackMedium::with_burst_end_idle(&queue, config.burst_end_idle_ticks());

    let handler = ShotHandler::new(&stats, &RX_LOG_STREAM, on_shot);
    let decoder = NecDecoder::new(&timing);
    let mut rx = RxPipeline::new(&queue, medium.rx(), decoder, handler, &stats, &RX_LOG_STREAM);
    let mut tx: TxChannel<_> = TxChannel::new(medium.tx(), NecEncoder::new(&timing));

    let mut run = || -> Result<(), TransportError> {
        rx.start()?;

        for sequence in [1, 2, 2, 3] {
            tx.send(&ShotFrame::new(sequence).to_bytes())?;
            rx.drain()?;
            report(&stats);
        }

        medium.set_distortion(Some(stretch_leader));
        tx.send(&ShotFrame::new(4).to_bytes())?;
        medium.set_distortion(None);
        rx.drain()?;

        // Empty frame, then a payload that is not a shot
        tx.transmitter_mut().transmit(&[timing.leader(), timing.ending()])?;
        rx.drain()?;
        tx.send(&[0xAA])?;
        rx.drain()?;
        Ok(())
    };

    if let Err(e) = run() {
        println!("Loopback failed: {}", e);
    }

    report(&stats);
    println!("target: {:?}", stats.snapshot());
}
