//! Server-originated notifications and subscriber fan-out.

use ponte::prelude::*;

use crate::helpers::*;

#[test]
fn test_server_events() {
    let server = test_server();
    let (bridge, events) = connected(&server, "App");
    drain(&server, &events);

    server.set_sample_rate(44_100);
    server.set_buffer_size(512);
    server.set_buffer_size(512);
    server.set_freewheel(true);
    server.set_freewheel(false);
    server.report_xrun();

    assert_eq!(
        drain(&server, &events),
        vec![
            Notification::SampleRateChanged(44_100),
            Notification::BufferSizeChanged(512),
            Notification::StartedFreewheeling,
            Notification::StoppedFreewheeling,
            Notification::XrunOccurred,
        ]
    );
    assert_eq!(bridge.sample_rate(), Some(44_100));
    assert_eq!(bridge.buffer_size(), Some(512));
}

#[test]
fn test_client_registration_events() {
    let server = test_server();
    let (_app, events) = connected(&server, "App");
    let (app2, _) = connected(&server, "App2");

    assert!(app2.disconnect_from_server());
    assert_eq!(
        drain(&server, &events),
        vec![
            Notification::Connected,
            Notification::ClientRegistered("App2".to_string()),
            Notification::ClientUnregistered("App2".to_string()),
        ]
    );
}

#[test]
fn test_port_registration_event() {
    let server = test_server();
    let (app, events) = connected(&server, "App");
    let (app2, _) = connected(&server, "App2");
    drain(&server, &events);

    let input = app2.register_audio_in_port("in1");
    let received = drain(&server, &events);
    assert_eq!(received, vec![Notification::PortRegistered(input.port().clone())]);
    match &received[0] {
        Notification::PortRegistered(port) => assert_eq!(port.full_name(), "App2:in1"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(app.port_by_name("App2:in1"), *input);
}

#[test]
fn test_port_rename() {
    let server = test_server();
    let (bridge, events) = connected(&server, "App");
    let out = bridge.register_audio_out_port("out1");
    drain(&server, &events);

    server.rename_port("App:out1", "main").unwrap();
    let received = drain(&server, &events);
    assert_eq!(received.len(), 1);
    match &received[0] {
        Notification::PortRenamed {
            port,
            old_name,
            new_name,
        } => {
            assert_eq!(port, out.port());
            assert_eq!(port.full_name(), "App:main");
            assert_eq!(old_name, "App:out1");
            assert_eq!(new_name, "App:main");
        }
        other => panic!("unexpected {:?}", other),
    }

    assert!(bridge.port_by_name("App:main").is_valid());
    assert!(!bridge.port_by_name("App:out1").is_valid());
    // Snapshots taken before the rename keep the old name
    assert_eq!(out.full_name(), "App:out1");
}

#[test]
fn test_rename_rejections() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");
    bridge.register_audio_out_port("out1");
    bridge.register_audio_out_port("out2");

    assert!(server.rename_port("App:nothing", "x").is_err());
    assert!(server.rename_port("App:out1", "out2").is_err());
    assert!(server.rename_port("App:out1", "").is_err());
    assert!(server.rename_port("App:out1", "out1").is_ok());
}

#[test]
fn test_every_subscriber_receives() {
    let server = test_server();
    let bridge = Bridge::new(server.clone());
    let first = bridge.subscribe();
    let second = bridge.subscribe();

    assert!(bridge.connect_to_server("App"));
    assert!(bridge.activate());
    assert_eq!(drain(&server, &first), drain(&server, &second));
    assert_eq!(
        drain(&server, &bridge.subscribe()),
        Vec::<Notification>::new()
    );
}

#[test]
fn test_dropped_subscriber_does_not_block_others() {
    let server = test_server();
    let bridge = Bridge::new(server.clone());
    let kept = bridge.subscribe();
    drop(bridge.subscribe());

    assert!(bridge.connect_to_server("App"));
    assert_eq!(drain(&server, &kept), vec![Notification::Connected]);
}

#[test]
fn test_full_subscriber_misses_notifications() {
    let server = test_server();
    let bridge = Bridge::builder()
        .server(server.clone())
        .notification_capacity(2)
        .build()
        .unwrap();
    let events = bridge.subscribe();

    assert!(bridge.connect_to_server("App"));
    assert!(bridge.activate());
    assert!(bridge.deactivate());
    assert!(bridge.activate());

    assert_eq!(
        drain(&server, &events),
        vec![Notification::Connected, Notification::Activated]
    );
    assert!(bridge.deactivate());
    assert_eq!(drain(&server, &events), vec![Notification::Deactivated]);
}

#[test]
fn test_zero_capacity_is_rejected() {
    let result = Bridge::builder()
        .server(test_server())
        .notification_capacity(0)
        .build();
    assert!(result.is_err());
    assert!(Bridge::builder().build().is_err());
}

#[test]
fn test_no_notifications_after_disconnect() {
    let server = test_server();
    let (bridge, events) = connected(&server, "App");
    let (_other, _) = connected(&server, "Other");
    assert!(bridge.disconnect_from_server());
    drain(&server, &events);

    server.report_xrun();
    server.set_sample_rate(96_000);
    assert!(drain(&server, &events).is_empty());
}
