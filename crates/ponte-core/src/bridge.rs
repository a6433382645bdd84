//! The client bridge.
//!
//! [`Bridge`] owns at most one connection to an audio server. Operations are
//! forwarded synchronously to the backend; failures are logged and reported as
//! neutral values (`false`, `None`, an invalid port, an empty list) so that no
//! public operation panics or returns an error.
//!
//! # Example
//!
//! ```ignore
//! use ponte::prelude::*;
//!
//! let bridge = Bridge::new(LoopbackServer::new());
//! let events = bridge.subscribe();
//!
//! assert!(bridge.connect_to_server("App"));
//! let out = bridge.register_audio_out_port("out1");
//! assert_eq!(out.full_name(), "App:out1");
//! bridge.activate();
//! ```

use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::callback::Session;
use crate::config::{validate_client_name, validate_port_name, BridgeConfig, ClientOptions};
use crate::notification::{Notification, NotificationBus};
use crate::port::{AudioPort, MidiPort, Port, PortDirection, PortId, PortKind, TypedPort};
use crate::processor::{ProcessorSlot, SharedProcessor};
use crate::server::{AudioServer, ServerCallbacks, ServerConnection};
use crate::transport::{Frames, TransportPosition, TransportState};
use crate::{Error, Result};

struct Link {
    connection: Box<dyn ServerConnection>,
    session: Arc<Session>,
}

/// Client-side bridge to an audio server.
///
/// All methods take `&self`; the bridge can be shared between threads behind an `Arc`.
pub struct Bridge {
    server: Arc<dyn AudioServer>,
    config: BridgeConfig,
    link: Mutex<Option<Link>>,
    bus: Arc<NotificationBus>,
    processor: Arc<ProcessorSlot>,
}

impl Bridge {
    /// Bridge with the default configuration.
    pub fn new<S: AudioServer + 'static>(server: S) -> Self {
        Self::from_parts(Arc::new(server), BridgeConfig::default())
    }

    pub fn with_config<S: AudioServer + 'static>(server: S, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(Arc::new(server), config))
    }

    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    fn from_parts(server: Arc<dyn AudioServer>, config: BridgeConfig) -> Self {
        Self {
            server,
            bus: Arc::new(NotificationBus::new(config.notification_capacity)),
            processor: Arc::new(ProcessorSlot::new()),
            link: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Open a connection as `name` and install every server callback.
    ///
    /// Returns `false` if already connected or the server refuses the client.
    pub fn connect_to_server(&self, name: &str) -> bool {
        let mut link = self.link.lock();
        Self::reap(&mut link);
        if let Some(existing) = link.as_ref() {
            tracing::debug!(
                "Already connected as '{}', ignoring connect as '{}'",
                existing.connection.client_name(),
                name
            );
            return false;
        }

        if let Err(e) = validate_client_name(name) {
            tracing::warn!("Cannot connect: {}", e);
            return false;
        }

        let session = Arc::new(Session::new(
            Arc::clone(&self.bus),
            Arc::clone(&self.processor),
        ));
        let callbacks: Arc<dyn ServerCallbacks> = session.clone();
        let connection = match self.server.open(name, self.config.options, callbacks) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("Failed to connect to audio server as '{}': {}", name, e);
                return false;
            }
        };

        tracing::info!("Connected to audio server as '{}'", connection.client_name());
        *link = Some(Link {
            connection,
            session,
        });
        drop(link);

        self.bus.emit(Notification::Connected);
        true
    }

    /// Deactivate and close the connection.
    ///
    /// Local state is cleared even if the server reports an error; the return
    /// value tells whether both steps succeeded. Returns `false` when not connected.
    pub fn disconnect_from_server(&self) -> bool {
        let mut link = self.link.lock();
        Self::reap(&mut link);
        let Some(Link {
            mut connection,
            session,
        }) = link.take()
        else {
            tracing::debug!("Disconnect requested while not connected");
            return false;
        };
        drop(link);

        session.close();
        let name = connection.client_name().to_string();
        let mut success = true;
        if let Err(e) = connection.deactivate() {
            tracing::warn!("Failed to deactivate '{}': {}", name, e);
            success = false;
        }
        if let Err(e) = connection.close() {
            tracing::warn!("Failed to close '{}': {}", name, e);
            success = false;
        }

        tracing::info!("Disconnected '{}' from audio server", name);
        self.bus.emit(Notification::Disconnected);
        success
    }

    /// `true` while a connection is held and the server has not shut down.
    pub fn is_valid(&self) -> bool {
        let mut link = self.link.lock();
        Self::reap(&mut link);
        link.is_some()
    }

    /// Start delivering process callbacks to the processor.
    pub fn activate(&self) -> bool {
        let activated = self.request("activate", |connection| connection.activate());
        if activated.is_none() {
            return false;
        }
        if let Some(link) = self.link.lock().as_ref() {
            link.session.set_processing(true);
        }
        tracing::debug!("Client activated");
        self.bus.emit(Notification::Activated);
        true
    }

    /// Stop delivering process callbacks to the processor.
    pub fn deactivate(&self) -> bool {
        let deactivated = self.request("deactivate", |connection| connection.deactivate());
        if deactivated.is_none() {
            return false;
        }
        if let Some(link) = self.link.lock().as_ref() {
            link.session.set_processing(false);
        }
        tracing::debug!("Client deactivated");
        self.bus.emit(Notification::Deactivated);
        true
    }

    /// Name granted by the server, which may differ from the requested one.
    pub fn client_name(&self) -> Option<String> {
        self.request("client_name", |connection| {
            Ok(connection.client_name().to_string())
        })
    }

    // ------------------------------------------------------------------------
    // Ports
    // ------------------------------------------------------------------------

    /// Register a port owned by this client. Returns an invalid port on failure.
    pub fn register_port(&self, name: &str, kind: PortKind, direction: PortDirection) -> Port {
        let info = self.request("register_port", |connection| {
            validate_port_name(connection.client_name(), name)?;
            connection.register_port(name, kind, direction)
        });
        match info {
            Some(info) => {
                tracing::debug!(
                    "Registered {:?} {:?} port {}",
                    kind,
                    direction,
                    info.full_name
                );
                Port::from(info)
            }
            None => Port::invalid(),
        }
    }

    pub fn register_audio_port(&self, name: &str, direction: PortDirection) -> AudioPort {
        AudioPort::wrap(self.register_port(name, PortKind::Audio, direction))
    }

    pub fn register_midi_port(&self, name: &str, direction: PortDirection) -> MidiPort {
        MidiPort::wrap(self.register_port(name, PortKind::Midi, direction))
    }

    pub fn register_audio_in_port(&self, name: &str) -> AudioPort {
        self.register_audio_port(name, PortDirection::Input)
    }

    pub fn register_audio_out_port(&self, name: &str) -> AudioPort {
        self.register_audio_port(name, PortDirection::Output)
    }

    pub fn register_midi_in_port(&self, name: &str) -> MidiPort {
        self.register_midi_port(name, PortDirection::Input)
    }

    pub fn register_midi_out_port(&self, name: &str) -> MidiPort {
        self.register_midi_port(name, PortDirection::Output)
    }

    /// Remove a port owned by this client.
    pub fn unregister_port(&self, port: &Port) -> bool {
        let Some(handle) = port.handle() else {
            return false;
        };
        self.request("unregister_port", |connection| {
            connection.unregister_port(handle)
        })
        .is_some()
    }

    /// Connect `source` to `destination`. Both must be of the same kind.
    ///
    /// The resulting [`Notification::PortsConnected`] arrives asynchronously.
    pub fn connect<P: TypedPort>(&self, source: &P, destination: &P) -> bool {
        if !source.is_valid() || !destination.is_valid() {
            return false;
        }
        self.request("connect", |connection| {
            connection.connect_ports(source.full_name(), destination.full_name())
        })
        .is_some()
    }

    pub fn disconnect<P: TypedPort>(&self, source: &P, destination: &P) -> bool {
        if !source.is_valid() || !destination.is_valid() {
            return false;
        }
        self.request("disconnect", |connection| {
            connection.disconnect_ports(source.full_name(), destination.full_name())
        })
        .is_some()
    }

    /// Distinct client names owning at least one port, in enumeration order.
    pub fn client_list(&self) -> Vec<String> {
        let names = self
            .request("client_list", |connection| connection.port_names())
            .unwrap_or_default();
        let mut clients: Vec<String> = Vec::new();
        for full_name in &names {
            let client = full_name
                .split_once(':')
                .map_or(full_name.as_str(), |(client, _)| client);
            if !clients.iter().any(|known| known == client) {
                clients.push(client.to_string());
            }
        }
        clients
    }

    /// Current snapshots of every port owned by `client_name`.
    pub fn ports_for_client(&self, client_name: &str) -> Vec<Port> {
        self.request("ports_for_client", |connection| {
            let ports = connection
                .port_names()?
                .iter()
                .filter_map(|full_name| connection.port_by_name(full_name))
                .filter(|info| info.client_name() == client_name)
                .map(Port::from)
                .collect();
            Ok(ports)
        })
        .unwrap_or_default()
    }

    pub fn number_of_input_ports(&self, client_name: &str) -> usize {
        self.ports_for_client(client_name)
            .iter()
            .filter(|port| port.is_input())
            .count()
    }

    pub fn number_of_output_ports(&self, client_name: &str) -> usize {
        self.ports_for_client(client_name)
            .iter()
            .filter(|port| port.is_output())
            .count()
    }

    /// Look up a port by full name. Invalid on miss.
    pub fn port_by_name(&self, full_name: &str) -> Port {
        self.request("port_by_name", |connection| {
            connection
                .port_by_name(full_name)
                .ok_or_else(|| Error::NoSuchPort(full_name.to_string()))
        })
        .into()
    }

    /// Look up a port by the server's numeric id. Invalid on miss.
    pub fn port_by_id(&self, id: PortId) -> Port {
        self.request("port_by_id", |connection| {
            connection
                .port_by_id(id)
                .ok_or_else(|| Error::NoSuchPort(format!("#{}", id)))
        })
        .into()
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    pub fn start_transport(&self) -> bool {
        self.request("start_transport", |connection| connection.start_transport())
            .is_some()
    }

    pub fn stop_transport(&self) -> bool {
        self.request("stop_transport", |connection| connection.stop_transport())
            .is_some()
    }

    /// [`TransportState::Unknown`] when not connected.
    pub fn transport_state(&self) -> TransportState {
        self.query_transport_position().state
    }

    /// Default position (state unknown, frame 0) when not connected.
    pub fn query_transport_position(&self) -> TransportPosition {
        self.request("query_transport", |connection| connection.query_transport())
            .unwrap_or_default()
    }

    /// Ask the server to move the transport. Takes effect asynchronously.
    pub fn request_transport_reposition(&self, position: &TransportPosition) -> bool {
        if let Some(bbt) = &position.bbt {
            if let Err(e) = bbt.validate() {
                tracing::warn!("Reposition rejected: {}", e);
                return false;
            }
        }
        self.request("reposition_transport", |connection| {
            connection.reposition_transport(position)
        })
        .is_some()
    }

    // ------------------------------------------------------------------------
    // Server info
    // ------------------------------------------------------------------------

    pub fn sample_rate(&self) -> Option<u32> {
        self.request("sample_rate", |connection| connection.sample_rate())
    }

    pub fn buffer_size(&self) -> Option<Frames> {
        self.request("buffer_size", |connection| connection.buffer_size())
    }

    /// DSP load in percent, 0.0 when not connected.
    pub fn cpu_load(&self) -> f32 {
        self.request("cpu_load", |connection| connection.cpu_load())
            .unwrap_or(0.0)
    }

    pub fn frame_time(&self) -> Option<Frames> {
        self.request("frame_time", |connection| connection.frame_time())
    }

    pub fn last_frame_time(&self) -> Option<Frames> {
        self.request("last_frame_time", |connection| connection.last_frame_time())
    }

    /// Start of the current or last process cycle, in milliseconds of server time.
    pub fn time_ms(&self) -> Option<f64> {
        let (frames, rate) = self.request("time_ms", |connection| {
            Ok((connection.last_frame_time()?, connection.sample_rate()?))
        })?;
        (rate > 0).then(|| frames as f64 * 1000.0 / rate as f64)
    }

    /// `false` when not connected.
    pub fn is_realtime(&self) -> bool {
        self.request("is_realtime", |connection| connection.is_realtime())
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------------
    // Processing and notifications
    // ------------------------------------------------------------------------

    /// Install the processor run once per block while active, or remove it with `None`.
    pub fn set_processor(&self, processor: Option<SharedProcessor>) {
        self.processor.set(processor);
    }

    pub fn processor(&self) -> Option<SharedProcessor> {
        self.processor.get()
    }

    /// Blocks skipped because the processor was locked elsewhere.
    pub fn skipped_blocks(&self) -> u64 {
        self.processor.skipped()
    }

    /// Receive every notification emitted from now on. Survives reconnects.
    pub fn subscribe(&self) -> Receiver<Notification> {
        self.bus.subscribe()
    }

    // ------------------------------------------------------------------------

    /// Drop a connection whose server has shut down, without calling it.
    fn reap(link: &mut Option<Link>) {
        if !link.as_ref().is_some_and(|l| l.session.is_gone()) {
            return;
        }
        if let Some(Link { connection, .. }) = link.take() {
            tracing::info!(
                "Releasing connection '{}' after server shutdown",
                connection.client_name()
            );
            connection.abandon();
        }
    }

    fn request<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut dyn ServerConnection) -> Result<T>,
    ) -> Option<T> {
        let mut link = self.link.lock();
        Self::reap(&mut link);
        let Some(Link { connection, .. }) = link.as_mut() else {
            tracing::debug!("{}: not connected", operation);
            return None;
        };
        match f(&mut **connection) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("{} failed: {}", operation, e);
                None
            }
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.link.get_mut().is_some() {
            self.disconnect_from_server();
        }
    }
}

/// Builder for [`Bridge`].
///
/// ```ignore
/// let bridge = Bridge::builder()
///     .server(LoopbackServer::new())
///     .use_exact_name()
///     .notification_capacity(256)
///     .build()?;
/// ```
#[derive(Default)]
pub struct BridgeBuilder {
    server: Option<Arc<dyn AudioServer>>,
    config: BridgeConfig,
}

impl BridgeBuilder {
    pub fn server<S: AudioServer + 'static>(mut self, server: S) -> Self {
        self.server = Some(Arc::new(server));
        self
    }

    /// Fail instead of starting a server when none is running.
    pub fn no_start_server(mut self) -> Self {
        self.config.options.no_start_server = true;
        self
    }

    /// Fail instead of accepting a server-chosen name on collision.
    pub fn use_exact_name(mut self) -> Self {
        self.config.options.use_exact_name = true;
        self
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.config.options = options;
        self
    }

    /// Default: 1024
    pub fn notification_capacity(mut self, capacity: usize) -> Self {
        self.config.notification_capacity = Some(capacity);
        self
    }

    pub fn unbounded_notifications(mut self) -> Self {
        self.config.notification_capacity = None;
        self
    }

    pub fn build(self) -> Result<Bridge> {
        self.config.validate()?;
        let server = self
            .server
            .ok_or_else(|| Error::InvalidConfig("no audio server backend set".to_string()))?;
        Ok(Bridge::from_parts(server, self.config))
    }
}
