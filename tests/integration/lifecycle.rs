//! Connection lifecycle.

use ponte::prelude::*;

use crate::helpers::*;

#[test]
fn test_connect_and_disconnect() {
    init_tracing();
    let server = test_server();
    let (bridge, events) = connected(&server, "App");

    assert!(bridge.is_valid());
    assert_eq!(bridge.client_name().as_deref(), Some("App"));
    assert_eq!(server.clients(), vec!["App".to_string()]);

    assert!(bridge.disconnect_from_server());
    assert!(!bridge.is_valid());
    assert_eq!(bridge.client_name(), None);
    assert!(server.clients().is_empty());

    assert_eq!(
        drain(&server, &events),
        vec![Notification::Connected, Notification::Disconnected]
    );
}

#[test]
fn test_second_connect_is_refused() {
    let server = test_server();
    let (bridge, _events) = connected(&server, "App");

    assert!(!bridge.connect_to_server("Other"));
    assert_eq!(bridge.client_name().as_deref(), Some("App"));
    assert_eq!(server.clients().len(), 1);
}

#[test]
fn test_disconnect_when_not_connected() {
    let server = test_server();
    let bridge = Bridge::new(server.clone());
    let events = bridge.subscribe();

    assert!(!bridge.disconnect_from_server());
    assert!(drain(&server, &events).is_empty());
}

#[test]
fn test_invalid_client_name_is_refused() {
    let server = test_server();
    let bridge = Bridge::new(server.clone());

    assert!(!bridge.connect_to_server(""));
    assert!(!bridge.connect_to_server(&"x".repeat(200)));
    assert!(!bridge.is_valid());
}

#[test]
fn test_duplicate_name_is_renamed() {
    let server = test_server();
    let (_first, _) = connected(&server, "App");
    let (second, _) = connected(&server, "App");

    let granted = second.client_name().unwrap();
    assert_ne!(granted, "App");
    assert!(granted.starts_with("App"));
}

#[test]
fn test_exact_name_collision_fails() {
    let server = test_server();
    let (_first, _) = connected(&server, "App");
    let second = Bridge::builder()
        .server(server.clone())
        .use_exact_name()
        .build()
        .unwrap();

    assert!(!second.connect_to_server("App"));
    assert!(!second.is_valid());
}

#[test]
fn test_activate_and_deactivate() {
    let server = test_server();
    let (bridge, events) = connected(&server, "App");

    assert!(bridge.activate());
    assert!(bridge.deactivate());
    assert_eq!(
        drain(&server, &events),
        vec![
            Notification::Connected,
            Notification::Activated,
            Notification::Deactivated
        ]
    );
}

#[test]
fn test_operations_without_connection_are_neutral() {
    let server = test_server();
    let bridge = Bridge::new(server);

    assert!(!bridge.activate());
    assert!(!bridge.deactivate());
    assert!(!bridge.register_audio_out_port("out1").is_valid());
    assert!(bridge.client_list().is_empty());
    assert!(!bridge.port_by_name("system:capture_1").is_valid());
    assert!(!bridge.start_transport());
    assert_eq!(bridge.transport_state(), TransportState::Unknown);
    assert_eq!(bridge.sample_rate(), None);
    assert_eq!(bridge.buffer_size(), None);
    assert_eq!(bridge.cpu_load(), 0.0);
    assert_eq!(bridge.time_ms(), None);
    assert!(!bridge.is_realtime());
}

#[test]
fn test_realtime_flag() {
    let server = LoopbackServer::builder().realtime(true).build();
    let bridge = Bridge::new(server.clone());
    assert!(!bridge.is_realtime());

    assert!(bridge.connect_to_server("App"));
    assert!(bridge.is_realtime());

    let (plain, _) = connected(&test_server(), "App");
    assert!(!plain.is_realtime());
}

#[test]
fn test_server_shutdown() {
    let server = test_server();
    let (bridge, events) = connected(&server, "App");
    let out = bridge.register_audio_out_port("out1");
    assert!(bridge.activate());
    drain(&server, &events);

    server.shutdown("test over");
    let received = drain(&server, &events);
    assert_eq!(
        received,
        vec![Notification::Disconnected, Notification::ServerShutdown]
    );

    assert!(!server.is_running());
    assert!(!bridge.is_valid());
    assert!(!bridge.unregister_port(&out));
    assert!(!bridge.disconnect_from_server());
    assert!(!bridge.connect_to_server("App"));
}

#[test]
fn test_reconnect_after_disconnect() {
    let server = test_server();
    let (bridge, events) = connected(&server, "App");

    assert!(bridge.disconnect_from_server());
    assert!(bridge.connect_to_server("App"));
    assert_eq!(bridge.client_name().as_deref(), Some("App"));
    assert_eq!(
        drain(&server, &events),
        vec![
            Notification::Connected,
            Notification::Disconnected,
            Notification::Connected
        ]
    );
}

#[test]
fn test_drop_closes_the_client() {
    let server = test_server();
    {
        let (_bridge, _) = connected(&server, "App");
        assert_eq!(server.clients().len(), 1);
    }
    assert!(server.clients().is_empty());
}
