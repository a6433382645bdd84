//! Ports, connections and graph queries.

use std::time::Duration;

use ponte::prelude::*;
use proptest::prelude::*;

use crate::helpers::*;

#[test]
fn test_register_ports() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");

    let out = bridge.register_audio_out_port("out1");
    let midi_in = bridge.register_midi_in_port("midi_in");
    assert!(out.is_valid());
    assert_eq!(out.full_name(), "App:out1");
    assert_eq!(out.name(), "out1");
    assert_eq!(out.client_name(), "App");
    assert!(out.is_output() && out.is_audio() && !out.is_physical());
    assert!(midi_in.is_input() && midi_in.is_midi());

    assert_eq!(bridge.port_by_name("App:out1"), *out);
}

#[test]
fn test_register_port_rejections() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");

    assert!(bridge.register_audio_out_port("out1").is_valid());
    assert!(!bridge.register_audio_out_port("out1").is_valid());
    assert!(!bridge.register_audio_in_port("").is_valid());
    assert!(!bridge.register_audio_in_port(&"p".repeat(300)).is_valid());
}

#[test]
fn test_physical_ports_and_lookup() {
    let server = test_server();
    let (bridge, _) = connected(&server, "App");

    let capture = bridge.port_by_name("system:capture_1");
    assert!(capture.is_valid());
    assert!(capture.is_physical() && capture.is_output() && capture.is_audio());
    assert!(bridge.port_by_name("system:playback_2").is_input());
    assert!(bridge.port_by_name("system:midi_capture_1").is_midi());

    assert!(!bridge.port_by_name("nobody:nothing").is_valid());
    assert!(!bridge.port_by_id(9_999).is_valid());
    assert_eq!(bridge.port_by_id(1), capture);
}

#[test]
fn test_client_list_and_port_counts() {
    let server = test_server();
    let (app, _) = connected(&server, "App");
    let (app2, _) = connected(&server, "App2");
    app.register_audio_out_port("out1");
    app.register_audio_out_port("out2");
    app2.register_audio_in_port("in1");

    assert_eq!(app.client_list(), vec!["system", "App", "App2"]);
    assert_eq!(app.number_of_input_ports("system"), 3);
    assert_eq!(app.number_of_output_ports("system"), 3);
    assert_eq!(app.number_of_output_ports("App"), 2);
    assert_eq!(app.number_of_input_ports("App"), 0);
    assert_eq!(app2.number_of_input_ports("App2"), 1);
    assert!(app.ports_for_client("Nobody").is_empty());
}

#[test]
fn test_connect_two_clients() {
    init_tracing();
    let server = test_server();
    let (app, events) = connected(&server, "App");
    let (app2, _) = connected(&server, "App2");
    let out = app.register_audio_out_port("out1");
    let input = app2.register_audio_in_port("in1");

    assert!(app.connect(&out, &input));
    let expected = Notification::PortsConnected(out.port().clone(), input.port().clone());
    let received = std::iter::from_fn(|| events.recv_timeout(Duration::from_secs(2)).ok())
        .find(|event| *event == expected);
    assert!(received.is_some(), "PortsConnected never arrived");

    assert_eq!(
        server.connections(),
        vec![("App:out1".to_string(), "App2:in1".to_string())]
    );
    let seen = drain(&server, &events);
    assert!(seen.contains(&Notification::GraphOrderChanged));
}

#[test]
fn test_connect_rejections() {
    let server = test_server();
    let (app, _) = connected(&server, "App");
    let out = app.register_audio_out_port("out1");
    let out2 = app.register_audio_out_port("out2");
    let playback = app.port_by_name("system:playback_1").into_audio().unwrap();

    assert!(!app.connect(&out, &out2));
    assert!(!app.connect(&playback, &out));
    assert!(app.connect(&out, &playback));
    assert!(!app.connect(&out, &playback));
    assert!(!app.connect(&out, &AudioPort::default()));

    assert!(app.disconnect(&out, &playback));
    assert!(!app.disconnect(&out, &playback));
    assert!(server.connections().is_empty());
}

#[test]
fn test_midi_connection() {
    let server = test_server();
    let (app, events) = connected(&server, "App");
    let capture = app.port_by_name("system:midi_capture_1").into_midi().unwrap();
    let midi_in = app.register_midi_in_port("midi_in");

    assert!(app.port_by_name("system:capture_1").into_midi().is_none());
    assert!(app.connect(&capture, &midi_in));
    assert!(drain(&server, &events).contains(&Notification::PortsConnected(
        capture.port().clone(),
        midi_in.port().clone()
    )));
}

#[test]
fn test_unregister_port() {
    let server = test_server();
    let (app, events) = connected(&server, "App");
    let (app2, _) = connected(&server, "App2");
    let out = app.register_audio_out_port("out1");
    drain(&server, &events);

    assert!(!app2.unregister_port(&out));
    assert!(app.unregister_port(&out));
    assert!(!app.unregister_port(&out));
    assert!(!app.unregister_port(&Port::invalid()));
    assert!(!app.port_by_name("App:out1").is_valid());

    let received = drain(&server, &events);
    assert_eq!(received, vec![Notification::PortUnregistered(out.port().clone())]);
}

#[test]
fn test_peer_disconnect_is_reported() {
    let server = test_server();
    let (app, events) = connected(&server, "App");
    let (app2, _) = connected(&server, "App2");
    let out = app.register_audio_out_port("out1");
    let input = app2.register_audio_in_port("in1");
    assert!(app.connect(&out, &input));
    drain(&server, &events);

    assert!(app2.disconnect_from_server());
    let received = drain(&server, &events);

    let index_of = |expected: Notification| {
        received
            .iter()
            .position(|event| *event == expected)
            .unwrap_or_else(|| panic!("{:?} not received", expected))
    };
    let disconnected =
        index_of(Notification::PortsDisconnected(out.port().clone(), input.port().clone()));
    let unregistered = index_of(Notification::PortUnregistered(input.port().clone()));
    let gone = index_of(Notification::ClientUnregistered("App2".to_string()));
    assert!(disconnected < unregistered && unregistered < gone);
    assert!(server.connections().is_empty());
    assert_eq!(app.client_list(), vec!["system", "App"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_port_counts_match_registrations(inputs in 0usize..5, outputs in 0usize..5) {
        let server = test_server();
        let (bridge, _) = connected(&server, "Prop");
        for n in 0..inputs {
            let port = bridge.register_audio_in_port(&format!("in{}", n));
            prop_assert!(port.is_valid());
        }
        for n in 0..outputs {
            let port = bridge.register_midi_out_port(&format!("out{}", n));
            prop_assert!(port.is_valid());
        }

        prop_assert_eq!(bridge.number_of_input_ports("Prop"), inputs);
        prop_assert_eq!(bridge.number_of_output_ports("Prop"), outputs);
        prop_assert_eq!(bridge.ports_for_client("Prop").len(), inputs + outputs);

        let clients = bridge.client_list();
        let mut distinct = clients.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(distinct.len(), clients.len());
        prop_assert_eq!(clients.contains(&"Prop".to_string()), inputs + outputs > 0);
    }
}
