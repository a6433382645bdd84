//! JACK server backend.

use std::sync::Arc;

use ponte_core::lockfree::AtomicFrames;
use ponte_core::{
    AudioServer, ClientOptions, Error, Frames, PortDirection, PortHandle, PortId, PortInfo,
    PortKind, PortLookup, Result, ServerCallbacks, ServerConnection, TransportPosition,
};

use crate::convert::{backend, client_options, port_info, position_from_jack, position_to_jack};
use crate::handlers::{Notifications, Process};

/// Opens clients on the running JACK server.
#[derive(Debug, Clone, Copy, Default)]
pub struct JackServer;

impl JackServer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioServer for JackServer {
    fn open(
        &self,
        name: &str,
        options: ClientOptions,
        callbacks: Arc<dyn ServerCallbacks>,
    ) -> Result<Box<dyn ServerConnection>> {
        let (client, status) = jack::Client::new(name, client_options(options))
            .map_err(|e| Error::ServerUnavailable(e.to_string()))?;
        let granted = client.name().to_string();
        tracing::debug!("Opened JACK client '{}' (status {:?})", granted, status);

        // Activated at open so every handler is installed with the client.
        // Processing is gated by the bridge.
        let last_frame_time = Arc::new(AtomicFrames::new(0));
        let client = client
            .activate_async(
                Notifications::new(Arc::clone(&callbacks)),
                Process::new(callbacks, Arc::clone(&last_frame_time)),
            )
            .map_err(backend)?;

        Ok(Box::new(JackConnection {
            client: Some(client),
            name: granted,
            owned: Vec::new(),
            last_frame_time,
        }))
    }
}

enum OwnedPort {
    AudioIn(jack::Port<jack::AudioIn>),
    AudioOut(jack::Port<jack::AudioOut>),
    MidiIn(jack::Port<jack::MidiIn>),
    MidiOut(jack::Port<jack::MidiOut>),
}

impl OwnedPort {
    fn register(
        client: &jack::Client,
        name: &str,
        kind: PortKind,
        direction: PortDirection,
    ) -> std::result::Result<(Self, Option<PortInfo>), jack::Error> {
        Ok(match (kind, direction) {
            (PortKind::Audio, PortDirection::Input) => {
                let port = client.register_port(name, jack::AudioIn::default())?;
                let info = port_info(&port);
                (Self::AudioIn(port), info)
            }
            (PortKind::Audio, PortDirection::Output) => {
                let port = client.register_port(name, jack::AudioOut::default())?;
                let info = port_info(&port);
                (Self::AudioOut(port), info)
            }
            (PortKind::Midi, PortDirection::Input) => {
                let port = client.register_port(name, jack::MidiIn::default())?;
                let info = port_info(&port);
                (Self::MidiIn(port), info)
            }
            (PortKind::Midi, PortDirection::Output) => {
                let port = client.register_port(name, jack::MidiOut::default())?;
                let info = port_info(&port);
                (Self::MidiOut(port), info)
            }
        })
    }

    fn handle(&self) -> PortHandle {
        let raw = match self {
            Self::AudioIn(port) => port.raw() as usize,
            Self::AudioOut(port) => port.raw() as usize,
            Self::MidiIn(port) => port.raw() as usize,
            Self::MidiOut(port) => port.raw() as usize,
        };
        PortHandle::new(raw as u64)
    }

    fn unregister(self, client: &jack::Client) -> std::result::Result<(), jack::Error> {
        match self {
            Self::AudioIn(port) => client.unregister_port(port),
            Self::AudioOut(port) => client.unregister_port(port),
            Self::MidiIn(port) => client.unregister_port(port),
            Self::MidiOut(port) => client.unregister_port(port),
        }
    }
}

/// A client on the JACK server.
pub struct JackConnection {
    /// `None` only while closing or abandoning.
    client: Option<jack::AsyncClient<Notifications, Process>>,
    name: String,
    owned: Vec<OwnedPort>,
    last_frame_time: Arc<AtomicFrames>,
}

impl JackConnection {
    fn client(&self) -> Result<&jack::Client> {
        self.client
            .as_ref()
            .map(|client| client.as_client())
            .ok_or(Error::ServerGone)
    }
}

impl PortLookup for JackConnection {
    fn port_by_id(&self, id: PortId) -> Option<PortInfo> {
        let client = self.client().ok()?;
        client.port_by_id(id).and_then(|port| port_info(&port))
    }
}

impl ServerConnection for JackConnection {
    fn client_name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self) -> Result<()> {
        self.client().map(|_| ())
    }

    fn deactivate(&mut self) -> Result<()> {
        self.client().map(|_| ())
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        self.owned.clear();
        let (client, _, _) = client.deactivate().map_err(backend)?;
        drop(client);
        tracing::debug!("Closed JACK client '{}'", self.name);
        Ok(())
    }

    fn abandon(mut self: Box<Self>) {
        // No libjack calls once the server is gone.
        if let Some(client) = self.client.take() {
            std::mem::forget(client);
        }
        std::mem::forget(std::mem::take(&mut self.owned));
        tracing::debug!("Abandoned JACK client '{}'", self.name);
    }

    fn register_port(
        &mut self,
        short_name: &str,
        kind: PortKind,
        direction: PortDirection,
    ) -> Result<PortInfo> {
        let (port, info) =
            OwnedPort::register(self.client()?, short_name, kind, direction).map_err(backend)?;
        let info = info.ok_or_else(|| {
            Error::Backend(format!("registered port {} could not be queried", short_name))
        })?;
        self.owned.push(port);
        Ok(info)
    }

    fn unregister_port(&mut self, handle: PortHandle) -> Result<()> {
        let index = self
            .owned
            .iter()
            .position(|port| port.handle() == handle)
            .ok_or_else(|| Error::NotOwner(format!("handle {:#x}", handle.raw())))?;
        let port = self.owned.remove(index);
        port.unregister(self.client()?).map_err(backend)
    }

    fn connect_ports(&mut self, source: &str, destination: &str) -> Result<()> {
        self.client()?
            .connect_ports_by_name(source, destination)
            .map_err(backend)
    }

    fn disconnect_ports(&mut self, source: &str, destination: &str) -> Result<()> {
        self.client()?
            .disconnect_ports_by_name(source, destination)
            .map_err(backend)
    }

    fn port_names(&self) -> Result<Vec<String>> {
        Ok(self.client()?.ports(None, None, jack::PortFlags::empty()))
    }

    fn port_by_name(&self, full_name: &str) -> Option<PortInfo> {
        let client = self.client().ok()?;
        client
            .port_by_name(full_name)
            .and_then(|port| port_info(&port))
    }

    fn start_transport(&mut self) -> Result<()> {
        self.client()?.transport().start().map_err(backend)
    }

    fn stop_transport(&mut self) -> Result<()> {
        self.client()?.transport().stop().map_err(backend)
    }

    fn query_transport(&self) -> Result<TransportPosition> {
        let status = self.client()?.transport().query().map_err(backend)?;
        Ok(position_from_jack(status.state, &status.pos))
    }

    fn reposition_transport(&mut self, position: &TransportPosition) -> Result<()> {
        let pos = position_to_jack(position)?;
        self.client()?.transport().reposition(&pos).map_err(backend)
    }

    fn sample_rate(&self) -> Result<u32> {
        Ok(self.client()?.sample_rate() as u32)
    }

    fn buffer_size(&self) -> Result<Frames> {
        Ok(self.client()?.buffer_size())
    }

    fn cpu_load(&self) -> Result<f32> {
        Ok(self.client()?.cpu_load())
    }

    fn is_realtime(&self) -> Result<bool> {
        let client = self.client()?;
        // SAFETY: `client` is a live, open client for the duration of the call.
        Ok(unsafe { jack::jack_sys::jack_is_realtime(client.raw()) } != 0)
    }

    fn frame_time(&self) -> Result<Frames> {
        Ok(self.client()?.frame_time())
    }

    fn last_frame_time(&self) -> Result<Frames> {
        self.client()?;
        Ok(self.last_frame_time.get())
    }
}
