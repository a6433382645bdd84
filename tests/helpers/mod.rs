//! Fixtures for ponte integration tests.
//!
//! Every test runs against its own [`LoopbackServer`], so nothing depends on a
//! system audio stack and process cycles are driven explicitly.

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use ponte::prelude::*;

pub const TEST_SAMPLE_RATE: u32 = 48_000;

pub const TEST_BUFFER_SIZE: Frames = 256;

/// Loopback server with 2 audio and 1 MIDI port in each direction.
pub fn test_server() -> LoopbackServer {
    LoopbackServer::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .buffer_size(TEST_BUFFER_SIZE)
        .build()
}

/// Bridge connected as `name`, subscribed before connecting.
pub fn connected(server: &LoopbackServer, name: &str) -> (Bridge, Receiver<Notification>) {
    let bridge = Bridge::new(server.clone());
    let events = bridge.subscribe();
    assert!(bridge.connect_to_server(name), "connect as {} failed", name);
    (bridge, events)
}

/// Every notification delivered so far.
pub fn drain(server: &LoopbackServer, events: &Receiver<Notification>) -> Vec<Notification> {
    server.sync();
    events.try_iter().collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}
