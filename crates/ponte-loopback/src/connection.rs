use std::sync::Arc;

use ponte_core::{
    Frames, PortDirection, PortHandle, PortId, PortInfo, PortKind, PortLookup, Result,
    ServerConnection, TransportPosition,
};

use crate::engine::{ClientId, Engine};

/// One client's connection to a [`LoopbackServer`](crate::LoopbackServer).
pub struct LoopbackConnection {
    engine: Arc<Engine>,
    id: ClientId,
    name: String,
}

impl LoopbackConnection {
    pub(crate) fn new(engine: Arc<Engine>, id: ClientId, name: String) -> Self {
        Self { engine, id, name }
    }
}

impl PortLookup for LoopbackConnection {
    fn port_by_id(&self, id: PortId) -> Option<PortInfo> {
        self.engine.lookup_id(id)
    }
}

impl ServerConnection for LoopbackConnection {
    fn client_name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self) -> Result<()> {
        self.engine.set_active(self.id, true)
    }

    fn deactivate(&mut self) -> Result<()> {
        self.engine.set_active(self.id, false)
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.engine.close(self.id)
    }

    fn abandon(self: Box<Self>) {
        tracing::trace!("Abandoning loopback client '{}'", self.name);
    }

    fn register_port(
        &mut self,
        short_name: &str,
        kind: PortKind,
        direction: PortDirection,
    ) -> Result<PortInfo> {
        self.engine
            .register_port(self.id, short_name, kind, direction)
    }

    fn unregister_port(&mut self, handle: PortHandle) -> Result<()> {
        self.engine.unregister_port(self.id, handle)
    }

    fn connect_ports(&mut self, source: &str, destination: &str) -> Result<()> {
        self.engine.connect(self.id, source, destination)
    }

    fn disconnect_ports(&mut self, source: &str, destination: &str) -> Result<()> {
        self.engine.disconnect(self.id, source, destination)
    }

    fn port_names(&self) -> Result<Vec<String>> {
        self.engine.port_names(self.id)
    }

    fn port_by_name(&self, full_name: &str) -> Option<PortInfo> {
        self.engine.port_by_name(self.id, full_name)
    }

    fn start_transport(&mut self) -> Result<()> {
        self.engine.start_transport(self.id)
    }

    fn stop_transport(&mut self) -> Result<()> {
        self.engine.stop_transport(self.id)
    }

    fn query_transport(&self) -> Result<TransportPosition> {
        self.engine.query_transport(self.id)
    }

    fn reposition_transport(&mut self, position: &TransportPosition) -> Result<()> {
        self.engine.reposition_transport(self.id, position)
    }

    fn sample_rate(&self) -> Result<u32> {
        self.engine.sample_rate(self.id)
    }

    fn buffer_size(&self) -> Result<Frames> {
        self.engine.buffer_size(self.id)
    }

    fn cpu_load(&self) -> Result<f32> {
        self.engine.cpu_load(self.id)
    }

    fn is_realtime(&self) -> Result<bool> {
        self.engine.is_realtime(self.id)
    }

    fn frame_time(&self) -> Result<Frames> {
        self.engine.frame_time(self.id)
    }

    fn last_frame_time(&self) -> Result<Frames> {
        self.engine.last_frame_time(self.id)
    }
}
