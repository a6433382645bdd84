//! jack crate handlers forwarding to [`ServerCallbacks`].

use std::sync::Arc;

use ponte_core::lockfree::AtomicFrames;
use ponte_core::{PortId, PortInfo, PortLookup, ServerCallbacks};

use crate::convert::port_info;

/// Resolves port ids through the client a callback was invoked with.
struct ClientLookup<'a>(&'a jack::Client);

impl PortLookup for ClientLookup<'_> {
    fn port_by_id(&self, id: PortId) -> Option<PortInfo> {
        self.0.port_by_id(id).and_then(|port| port_info(&port))
    }
}

pub(crate) struct Notifications {
    callbacks: Arc<dyn ServerCallbacks>,
}

impl Notifications {
    pub(crate) fn new(callbacks: Arc<dyn ServerCallbacks>) -> Self {
        Self { callbacks }
    }
}

impl jack::NotificationHandler for Notifications {
    fn thread_init(&self, _: &jack::Client) {
        self.callbacks.thread_init();
    }

    unsafe fn shutdown(&mut self, status: jack::ClientStatus, reason: &str) {
        // libjack must not be called from here
        self.callbacks.info_shutdown(status.bits() as u32, reason);
        self.callbacks.shutdown();
    }

    fn freewheel(&mut self, _: &jack::Client, is_enabled: bool) {
        self.callbacks.freewheel(is_enabled);
    }

    fn sample_rate(&mut self, _: &jack::Client, srate: jack::Frames) -> jack::Control {
        self.callbacks.sample_rate(srate);
        jack::Control::Continue
    }

    fn client_registration(&mut self, _: &jack::Client, name: &str, is_registered: bool) {
        self.callbacks.client_registration(name, is_registered);
    }

    fn port_registration(
        &mut self,
        client: &jack::Client,
        port_id: jack::PortId,
        is_registered: bool,
    ) {
        self.callbacks
            .port_registration(&ClientLookup(client), port_id, is_registered);
    }

    fn port_rename(
        &mut self,
        client: &jack::Client,
        port_id: jack::PortId,
        old_name: &str,
        new_name: &str,
    ) -> jack::Control {
        self.callbacks
            .port_rename(&ClientLookup(client), port_id, old_name, new_name);
        jack::Control::Continue
    }

    fn ports_connected(
        &mut self,
        client: &jack::Client,
        port_id_a: jack::PortId,
        port_id_b: jack::PortId,
        are_connected: bool,
    ) {
        self.callbacks
            .port_connect(&ClientLookup(client), port_id_a, port_id_b, are_connected);
    }

    fn graph_reorder(&mut self, _: &jack::Client) -> jack::Control {
        self.callbacks.graph_order();
        jack::Control::Continue
    }

    fn xrun(&mut self, _: &jack::Client) -> jack::Control {
        self.callbacks.xrun();
        jack::Control::Continue
    }
}

pub(crate) struct Process {
    callbacks: Arc<dyn ServerCallbacks>,
    last_frame_time: Arc<AtomicFrames>,
}

impl Process {
    pub(crate) fn new(
        callbacks: Arc<dyn ServerCallbacks>,
        last_frame_time: Arc<AtomicFrames>,
    ) -> Self {
        Self {
            callbacks,
            last_frame_time,
        }
    }
}

impl jack::ProcessHandler for Process {
    fn process(&mut self, _: &jack::Client, ps: &jack::ProcessScope) -> jack::Control {
        self.last_frame_time.set(ps.last_frame_time());
        self.callbacks.process(ps.n_frames());
        jack::Control::Continue
    }

    fn buffer_size(&mut self, _: &jack::Client, size: jack::Frames) -> jack::Control {
        self.callbacks.buffer_size(size);
        jack::Control::Continue
    }
}
