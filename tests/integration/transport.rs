//! Transport control and position queries.

use ponte::prelude::*;

use crate::helpers::*;

#[test]
fn test_start_and_stop() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");
    assert_eq!(bridge.transport_state(), TransportState::Stopped);

    assert!(bridge.start_transport());
    assert_eq!(bridge.transport_state(), TransportState::Starting);
    server.run_cycles(4);
    assert_eq!(bridge.transport_state(), TransportState::Rolling);
    assert_eq!(bridge.query_transport_position().frame, 4 * TEST_BUFFER_SIZE);

    assert!(bridge.stop_transport());
    server.run_cycles(2);
    let position = bridge.query_transport_position();
    assert_eq!(position.state, TransportState::Stopped);
    assert_eq!(position.frame, 4 * TEST_BUFFER_SIZE);
    assert_eq!(position.frame_rate, Some(TEST_SAMPLE_RATE));
}

#[test]
fn test_transport_is_shared_between_clients() {
    let server = test_server();
    let (app, _) = connected(&server, "App");
    let (app2, _) = connected(&server, "App2");

    assert!(app.start_transport());
    server.run_cycle();
    assert_eq!(app2.transport_state(), TransportState::Rolling);
    assert!(app2.stop_transport());
    assert_eq!(app.transport_state(), TransportState::Stopped);
}

#[test]
fn test_reposition_to_frame() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");

    assert!(bridge.request_transport_reposition(&TransportPosition::at_frame(96_000)));
    let position = bridge.query_transport_position();
    assert_eq!(position.frame, 96_000);
    assert_eq!(position.seconds(), Some(2.0));
    assert_eq!(position.bbt, None);
}

#[test]
fn test_musical_position_advances() {
    // 480 frames per block, 50 blocks = 24000 frames = one beat at 120 bpm
    let server = LoopbackServer::builder()
        .sample_rate(48_000)
        .buffer_size(480)
        .build();
    let (bridge, _) = connected(&server, "App");

    let start = TransportPosition::at_frame(48_000).with_bbt(Bbt::new(2, 1, 0));
    assert!(bridge.request_transport_reposition(&start));
    let bbt = bridge.query_transport_position().bbt.unwrap();
    assert_eq!((bbt.bar, bbt.beat, bbt.tick), (2, 1, 0));

    assert!(bridge.start_transport());
    server.run_cycles(50);
    let position = bridge.query_transport_position();
    assert_eq!(position.frame, 72_000);
    let bbt = position.bbt.unwrap();
    assert_eq!((bbt.bar, bbt.beat, bbt.tick), (2, 2, 0));
    assert_eq!(bbt.beats_per_minute, 120.0);
}

#[test]
fn test_invalid_bbt_is_rejected() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");

    let bad_bar = TransportPosition::at_frame(0).with_bbt(Bbt::new(0, 1, 0));
    let bad_beat = TransportPosition::at_frame(0).with_bbt(Bbt::new(1, 5, 0));
    let bad_tick = TransportPosition::at_frame(0).with_bbt(Bbt::new(1, 1, 1920));
    assert!(!bridge.request_transport_reposition(&bad_bar));
    assert!(!bridge.request_transport_reposition(&bad_beat));
    assert!(!bridge.request_transport_reposition(&bad_tick));
    assert_eq!(bridge.query_transport_position().frame, 0);
}
