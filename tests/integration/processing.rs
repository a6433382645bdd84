//! Processor dispatch and the process clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ponte::prelude::*;
use ponte::{midi_msg_channel, MidiMsg, SharedProcessor};

use crate::helpers::*;

fn counting_processor() -> (SharedProcessor, Arc<AtomicU32>) {
    let frames_seen = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&frames_seen);
    let processor = shared(move |frames: Frames| {
        counter.fetch_add(frames, Ordering::Relaxed);
    });
    (processor, frames_seen)
}

#[test]
fn test_processor_runs_only_while_active() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");
    let (processor, frames_seen) = counting_processor();
    bridge.set_processor(Some(processor));

    server.run_cycles(3);
    assert_eq!(frames_seen.load(Ordering::Relaxed), 0);

    assert!(bridge.activate());
    server.run_cycles(3);
    assert_eq!(frames_seen.load(Ordering::Relaxed), 3 * TEST_BUFFER_SIZE);

    assert!(bridge.deactivate());
    server.run_cycles(3);
    assert_eq!(frames_seen.load(Ordering::Relaxed), 3 * TEST_BUFFER_SIZE);
}

#[test]
fn test_processor_can_be_replaced_and_removed() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");
    assert!(bridge.processor().is_none());
    assert!(bridge.activate());

    let (first, first_seen) = counting_processor();
    let (second, second_seen) = counting_processor();
    bridge.set_processor(Some(first));
    server.run_cycle();
    bridge.set_processor(Some(second));
    server.run_cycle();
    bridge.set_processor(None);
    server.run_cycle();

    assert_eq!(first_seen.load(Ordering::Relaxed), TEST_BUFFER_SIZE);
    assert_eq!(second_seen.load(Ordering::Relaxed), TEST_BUFFER_SIZE);
}

#[test]
fn test_locked_processor_skips_block() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");
    let (processor, frames_seen) = counting_processor();
    bridge.set_processor(Some(processor.clone()));
    assert!(bridge.activate());

    let guard = processor.lock();
    server.run_cycle();
    drop(guard);
    server.run_cycle();

    assert_eq!(bridge.skipped_blocks(), 1);
    assert_eq!(frames_seen.load(Ordering::Relaxed), TEST_BUFFER_SIZE);
}

#[test]
fn test_processor_survives_reconnect() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");
    let (processor, frames_seen) = counting_processor();
    bridge.set_processor(Some(processor));

    assert!(bridge.disconnect_from_server());
    assert!(bridge.connect_to_server("App"));
    assert!(bridge.activate());
    server.run_cycle();
    assert_eq!(frames_seen.load(Ordering::Relaxed), TEST_BUFFER_SIZE);
}

#[test]
fn test_process_clock() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");
    assert_eq!(bridge.sample_rate(), Some(TEST_SAMPLE_RATE));
    assert_eq!(bridge.buffer_size(), Some(TEST_BUFFER_SIZE));
    assert_eq!(bridge.frame_time(), Some(0));

    server.run_cycles(375);
    assert_eq!(bridge.frame_time(), Some(375 * TEST_BUFFER_SIZE));
    assert_eq!(bridge.last_frame_time(), Some(374 * TEST_BUFFER_SIZE));
    // 374 * 256 frames at 48 kHz
    let time_ms = bridge.time_ms().unwrap();
    assert!((time_ms - 1994.666).abs() < 0.001);
    assert!((0.0..=100.0).contains(&bridge.cpu_load()));
}

#[test]
fn test_midi_messages_from_processor() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");
    let (mut producer, mut consumer) = midi_msg_channel(16);

    let mut block = 0u8;
    bridge.set_processor(Some(shared(move |_frames: Frames| {
        producer.push(MidiMsg::note_on(0, 60 + block, 100, 0));
        block += 1;
    })));
    assert!(bridge.activate());
    server.run_cycles(3);

    let notes: Vec<u8> = consumer.drain().iter().map(|msg| msg.bytes()[1]).collect();
    assert_eq!(notes, vec![60, 61, 62]);
    assert_eq!(consumer.pending(), 0);
}
