//! Audio server backend contract.
//!
//! A backend opens client connections ([`AudioServer`]), performs requests on
//! them ([`ServerConnection`]), and invokes [`ServerCallbacks`] from its own
//! threads. All callbacks are supplied at open time and stay installed until
//! the connection is closed or abandoned.

use std::sync::Arc;

use crate::config::ClientOptions;
use crate::port::{PortDirection, PortHandle, PortId, PortInfo, PortKind};
use crate::transport::{Frames, TransportPosition};
use crate::Result;

/// Resolves server port ids while a callback is being delivered.
pub trait PortLookup {
    fn port_by_id(&self, id: PortId) -> Option<PortInfo>;
}

/// Which half of the graph a latency recomputation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMode {
    Capture,
    Playback,
}

/// Entry point of a backend.
pub trait AudioServer: Send + Sync {
    /// Open a client connection named `name`, installing `callbacks` for its lifetime.
    ///
    /// The granted name may differ from `name` unless `options.use_exact_name` is set.
    fn open(
        &self,
        name: &str,
        options: ClientOptions,
        callbacks: Arc<dyn ServerCallbacks>,
    ) -> Result<Box<dyn ServerConnection>>;
}

/// A live client connection.
pub trait ServerConnection: PortLookup + Send {
    /// Name granted by the server.
    fn client_name(&self) -> &str;

    fn activate(&mut self) -> Result<()>;
    fn deactivate(&mut self) -> Result<()>;

    /// Close the connection, unregistering the client and its ports.
    fn close(self: Box<Self>) -> Result<()>;

    /// Release local resources without contacting the server. Used after the
    /// server has shut down.
    fn abandon(self: Box<Self>);

    fn register_port(
        &mut self,
        short_name: &str,
        kind: PortKind,
        direction: PortDirection,
    ) -> Result<PortInfo>;
    fn unregister_port(&mut self, handle: PortHandle) -> Result<()>;

    /// Connect two ports by full name, source first.
    fn connect_ports(&mut self, source: &str, destination: &str) -> Result<()>;
    fn disconnect_ports(&mut self, source: &str, destination: &str) -> Result<()>;

    /// Full names of every port in the graph.
    fn port_names(&self) -> Result<Vec<String>>;
    fn port_by_name(&self, full_name: &str) -> Option<PortInfo>;

    fn start_transport(&mut self) -> Result<()>;
    fn stop_transport(&mut self) -> Result<()>;
    fn query_transport(&self) -> Result<TransportPosition>;
    fn reposition_transport(&mut self, position: &TransportPosition) -> Result<()>;

    fn sample_rate(&self) -> Result<u32>;
    fn buffer_size(&self) -> Result<Frames>;
    /// DSP load in percent.
    fn cpu_load(&self) -> Result<f32>;
    /// Whether the server runs its process thread with realtime scheduling.
    fn is_realtime(&self) -> Result<bool>;
    /// Estimated current time in frames.
    fn frame_time(&self) -> Result<Frames>;
    /// Frame time at the start of the current or most recent process cycle.
    fn last_frame_time(&self) -> Result<Frames>;
}

/// Callbacks a backend delivers for one connection.
///
/// `process` runs on the realtime thread; everything else runs on
/// non-realtime server threads.
pub trait ServerCallbacks: Send + Sync {
    /// Once per server thread that will call into this client.
    fn thread_init(&self) {}

    fn process(&self, frames: Frames);

    fn freewheel(&self, starting: bool);
    fn client_registration(&self, name: &str, registered: bool);
    fn port_registration(&self, lookup: &dyn PortLookup, id: PortId, registered: bool);
    fn port_connect(&self, lookup: &dyn PortLookup, a: PortId, b: PortId, connected: bool);
    fn port_rename(&self, lookup: &dyn PortLookup, id: PortId, old_name: &str, new_name: &str);
    fn graph_order(&self);

    fn latency(&self, _mode: LatencyMode) {}

    fn buffer_size(&self, frames: Frames);
    fn sample_rate(&self, rate: u32);
    fn xrun(&self);

    /// The server is going away. No further calls into the connection are allowed.
    fn shutdown(&self);
    /// Like [`shutdown`](Self::shutdown), with the server's status code and reason.
    fn info_shutdown(&self, code: u32, reason: &str);
}
