//! End-to-end tests: transmit channel → loopback medium → receive pipeline

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use laser_tag_ir::config::IrConfig;
use laser_tag_ir::decoder::{DecodeError, NecDecoder};
use laser_tag_ir::encoder::NecEncoder;
use laser_tag_ir::logging::LogStream;
use laser_tag_ir::queue::BurstQueue;
use laser_tag_ir::shot::{ShotCounter, ShotFrame, ShotHandler, ShotOutcome};
use laser_tag_ir::stats::LinkStats;
use laser_tag_ir::symbol::Symbol;
use laser_tag_ir::timing::TimingTable;
use laser_tag_ir::transport::{
    BurstOutcome, IrReceiver, IrTransmitter, LoopbackMedium, RxPipeline, TransportError,
    TxChannel, MAX_PAYLOAD_BYTES,
};

const T: TimingTable = TimingTable::STANDARD;

fn decoder() -> NecDecoder {
    NecDecoder::new(&T)
}

/// Receiver whose window is always open.
struct OpenRx;

impl IrReceiver for OpenRx {
    fn arm(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[test]
fn test_frame_delivered_once() {
    let queue = BurstQueue::<4>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let medium = LoopbackMedium::new(&queue);

    let mut received: Vec<Vec<u8>> = Vec::new();
    let mut tx: TxChannel<_, 16> = TxChannel::new(medium.tx(), NecEncoder::new(&T));
    {
        let handler = |bytes: &[u8]| received.push(bytes.to_vec());
        let mut rx = RxPipeline::new(&queue, medium.rx(), decoder(), handler, &stats, &log);
        rx.start().unwrap();

        // 58 symbols in 16-symbol blocks still arrive as one burst
        assert_eq!(tx.send(b"LT\x00\x00\x00\x00\x01"), Ok(58));
        assert_eq!(rx.poll(), Ok(Some(BurstOutcome::Frame { bytes: 7 })));
        assert_eq!(rx.poll(), Ok(None));
    }

    assert_eq!(received, vec![b"LT\x00\x00\x00\x00\x01".to_vec()]);
    let snap = stats.snapshot();
    assert_eq!(snap.bursts, 1);
    assert_eq!(snap.frames, 1);
    assert!(medium.is_armed());
}

#[test]
fn test_largest_payload_fits_one_burst() {
    let queue = BurstQueue::<2>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let medium = LoopbackMedium::new(&queue);

    let payload: Vec<u8> = (0..MAX_PAYLOAD_BYTES as u8).collect();
    let mut got = Vec::new();
    let mut tx: TxChannel<_> = TxChannel::new(medium.tx(), NecEncoder::new(&T));
    {
        let handler = |b: &[u8]| got = b.to_vec();
        let mut rx = RxPipeline::new(&queue, medium.rx(), decoder(), handler, &stats, &log);
        rx.start().unwrap();
        tx.send(&payload).unwrap();
        assert_eq!(rx.drain(), Ok(1));
    }
    assert_eq!(got, payload);

    assert_eq!(
        tx.send(&[0u8; MAX_PAYLOAD_BYTES + 1]),
        Err(TransportError::PayloadTooLarge {
            len: MAX_PAYLOAD_BYTES + 1,
            max: MAX_PAYLOAD_BYTES
        })
    );
}

#[test]
fn test_empty_frame_skips_handler() {
    let queue = BurstQueue::<2>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let medium = LoopbackMedium::new(&queue);

    let mut calls = 0;
    let mut tx: TxChannel<_> = TxChannel::new(medium.tx(), NecEncoder::new(&T));
    {
        let handler = |_: &[u8]| calls += 1;
        let mut rx = RxPipeline::new(&queue, medium.rx(), decoder(), handler, &stats, &log);
        rx.start().unwrap();
        assert_eq!(tx.send(&[]), Ok(2));
        assert_eq!(rx.poll(), Ok(Some(BurstOutcome::Empty)));
    }

    assert_eq!(calls, 0);
    assert_eq!(stats.snapshot().empty_frames, 1);
}

#[test]
fn test_window_closed_during_handling_loses_shot() {
    let queue = BurstQueue::<4>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let medium = LoopbackMedium::new(&queue);

    let mut outcomes = Vec::new();
    let mut counter = ShotCounter::new();
    let mut tx: TxChannel<_> = TxChannel::new(medium.tx(), NecEncoder::new(&T));
    {
        let handler = ShotHandler::new(&stats, &log, |o| outcomes.push(o));
        let mut rx = RxPipeline::new(&queue, medium.rx(), decoder(), handler, &stats, &log);
        rx.start().unwrap();

        // Shot 1 captured; shot 2 arrives before the consumer re-arms
        tx.send(&counter.next_frame().to_bytes()).unwrap();
        tx.send(&counter.next_frame().to_bytes()).unwrap();
        assert_eq!(medium.lost(), 1);
        assert_eq!(rx.drain(), Ok(1));

        // Shot 3 is then out of order
        tx.send(&counter.next_frame().to_bytes()).unwrap();
        assert_eq!(rx.drain(), Ok(1));
    }

    assert_eq!(
        outcomes,
        vec![
            ShotOutcome::Hit { sequence: 1 },
            ShotOutcome::Miss { expected: 2, received: 3 },
        ]
    );
}

#[test]
fn test_noise_rejected_and_counted() {
    fn jitter_bit_idle(symbol: Symbol) -> Symbol {
        // Bit-1 gaps pushed past the margin
        if symbol.idle == 1690 {
            Symbol::new(symbol.active, 1950)
        } else {
            symbol
        }
    }

    let queue = BurstQueue::<4>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let medium = LoopbackMedium::new(&queue);
    medium.set_distortion(Some(jitter_bit_idle));

    let mut calls = 0;
    let mut tx: TxChannel<_> = TxChannel::new(medium.tx(), NecEncoder::new(&T));
    {
        let handler = |_: &[u8]| calls += 1;
        let mut rx = RxPipeline::new(&queue, medium.rx(), decoder(), handler, &stats, &log);
        rx.start().unwrap();

        tx.send(&[0x01]).unwrap();
        assert_eq!(
            rx.poll(),
            Ok(Some(BurstOutcome::Rejected(DecodeError::BadBit { index: 1 })))
        );

        // All-zero payload carries no bit-1 symbols
        tx.send(&[0x00]).unwrap();
        assert_eq!(rx.poll(), Ok(Some(BurstOutcome::Frame { bytes: 1 })));
    }

    assert_eq!(calls, 1);
    let snap = stats.snapshot();
    assert_eq!(snap.timing_errors, 1);
    assert_eq!(snap.frames, 1);
    assert_eq!(snap.bursts, 2);
}

#[test]
fn test_stray_symbols_rejected() {
    let queue = BurstQueue::<4>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let medium = LoopbackMedium::new(&queue);

    let mut rx = RxPipeline::new(&queue, medium.rx(), decoder(), |_: &[u8]| {}, &stats, &log);
    rx.start().unwrap();

    // Remote-control style burst: wrong leader
    medium
        .tx()
        .transmit(&[Symbol::new(4500, 4500), Symbol::new(560, 0x7FFF)])
        .unwrap();
    assert_eq!(rx.poll(), Ok(Some(BurstOutcome::Rejected(DecodeError::BadLeader))));

    // Single glitch
    medium.tx().transmit(&[Symbol::new(600, 0x7FFF)]).unwrap();
    assert_eq!(
        rx.poll(),
        Ok(Some(BurstOutcome::Rejected(DecodeError::TooShort { symbols: 1 })))
    );

    assert_eq!(stats.snapshot().framing_errors, 2);
}

#[test]
fn test_queue_overflow_visible_through_pipeline() {
    let queue = BurstQueue::<2>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();

    // Interrupt side keeps filling while the consumer is stalled
    for _ in 0..3 {
        queue.push(&[T.leader(), Symbol::new(560, 0)]);
    }

    let mut armed = 0;
    struct CountingRx<'a>(&'a mut u32);
    impl IrReceiver for CountingRx<'_> {
        fn arm(&mut self) -> Result<(), TransportError> {
            *self.0 += 1;
            Ok(())
        }
    }

    {
        let receiver = CountingRx(&mut armed);
        let mut rx = RxPipeline::new(&queue, receiver, decoder(), |_: &[u8]| {}, &stats, &log);
        assert_eq!(rx.overflowed(), 1);
        assert_eq!(rx.drain(), Ok(2));
    }

    // Re-armed once per handled burst
    assert_eq!(armed, 2);
    assert_eq!(stats.snapshot().empty_frames, 2);
}

#[test]
fn test_rearm_failure_reported() {
    struct BrokenRx;
    impl IrReceiver for BrokenRx {
        fn arm(&mut self) -> Result<(), TransportError> {
            Err(TransportError::Hardware(0x103))
        }
    }

    let queue = BurstQueue::<2>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    queue.push(&[T.leader(), Symbol::new(560, 0)]);

    let mut rx = RxPipeline::new(&queue, BrokenRx, decoder(), |_: &[u8]| {}, &stats, &log);
    assert_eq!(rx.poll(), Err(TransportError::Hardware(0x103)));
    // The burst itself was consumed and counted
    assert!(queue.is_empty());
    assert_eq!(stats.snapshot().bursts, 1);
}

#[test]
fn test_pipelines_on_separate_threads_keep_their_own_logs() {
    const BURSTS: u32 = 20_000;

    let logs: Arc<[LogStream; 2]> = Arc::new([LogStream::new(), LogStream::new()]);
    let done = Arc::new(AtomicBool::new(false));

    let workers: Vec<_> = (0..2)
        .map(|i| {
            let logs = Arc::clone(&logs);
            thread::spawn(move || {
                let queue = BurstQueue::<2>::new();
                let stats = LinkStats::new();
                let log = &logs[i];
                let mut rx = RxPipeline::new(&queue, OpenRx, decoder(), |_: &[u8]| {}, &stats, log);

                // Every burst is rejected and logged once
                for _ in 0..BURSTS {
                    queue.push(&[Symbol::new(4500, 4500), Symbol::new(560, 0x7FFF)]);
                    assert_eq!(
                        rx.poll(),
                        Ok(Some(BurstOutcome::Rejected(DecodeError::BadLeader)))
                    );
                }
                stats.snapshot().framing_errors
            })
        })
        .collect();

    let drainer = {
        let logs = Arc::clone(&logs);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut drained = [0u32; 2];
            loop {
                let finished = done.load(Ordering::Acquire);
                for (count, log) in drained.iter_mut().zip(logs.iter()) {
                    while let Some(entry) = log.drain() {
                        assert_eq!(entry.message(), "burst rejected: D02: bad leader code");
                        *count += 1;
                    }
                }
                if finished {
                    return drained;
                }
                thread::yield_now();
            }
        })
    };

    for worker in workers {
        assert_eq!(worker.join().unwrap(), BURSTS);
    }
    done.store(true, Ordering::Release);
    let drained = drainer.join().unwrap();

    for (count, log) in drained.iter().zip(logs.iter()) {
        assert_eq!(count + log.dropped(), BURSTS);
    }
}

#[test]
fn test_link_at_three_megahertz() {
    let config = IrConfig {
        resolution_hz: 3_000_000,
        ..Default::default()
    };
    let timing = config.timing().unwrap();
    assert_eq!(config.burst_end_idle_ticks(), 0x7FFF);

    let queue = BurstQueue::<4>::new();
    let stats = LinkStats::new();
    let log: LogStream = LogStream::new();
    let medium = LoopbackMedium::with_burst_end_idle(&queue, config.burst_end_idle_ticks());

    let mut outcomes = Vec::new();
    let mut tx: TxChannel<_> = TxChannel::new(medium.tx(), NecEncoder::new(&timing));
    {
        let handler = ShotHandler::new(&stats, &log, |o| outcomes.push(o));
        let decoder = NecDecoder::new(&timing);
        let mut rx = RxPipeline::new(&queue, medium.rx(), decoder, handler, &stats, &log);
        rx.start().unwrap();

        tx.send(&ShotFrame::new(1).to_bytes()).unwrap();
        assert_eq!(rx.drain(), Ok(1));
    }

    assert_eq!(outcomes, vec![ShotOutcome::Hit { sequence: 1 }]);
    assert_eq!(medium.delivered(), 1);
}
