//! Loopback server handle and builder.

use std::sync::Arc;

use ponte_core::{
    AudioServer, ClientOptions, Frames, Result, ServerCallbacks, ServerConnection,
};

use crate::connection::LoopbackConnection;
use crate::engine::{Engine, SystemPorts};

/// Deterministic in-process audio server.
///
/// Clones share the same server. Callbacks other than `process` are delivered
/// asynchronously on the `loopback-notifier` thread; use [`sync`](Self::sync)
/// to wait for them. Process cycles only run when [`run_cycle`](Self::run_cycle)
/// is called, on the calling thread.
///
/// ```ignore
/// let server = LoopbackServer::builder().sample_rate(44_100).build();
/// let bridge = Bridge::new(server.clone());
/// bridge.connect_to_server("App");
/// bridge.activate();
/// server.run_cycles(4);
/// ```
#[derive(Clone)]
pub struct LoopbackServer {
    engine: Arc<Engine>,
}

impl LoopbackServer {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> LoopbackServerBuilder {
        LoopbackServerBuilder::default()
    }

    /// Run one process cycle of `buffer_size` frames for every active client.
    pub fn run_cycle(&self) {
        self.engine.run_cycle();
    }

    pub fn run_cycles(&self, cycles: usize) {
        for _ in 0..cycles {
            self.engine.run_cycle();
        }
    }

    /// Wait until every callback queued so far has been delivered.
    ///
    /// Must not be called from inside a callback.
    pub fn sync(&self) {
        self.engine.sync();
    }

    pub fn set_sample_rate(&self, rate: u32) {
        self.engine.set_sample_rate(rate);
    }

    pub fn set_buffer_size(&self, frames: Frames) {
        self.engine.set_buffer_size(frames);
    }

    pub fn set_freewheel(&self, freewheel: bool) {
        self.engine.set_freewheel(freewheel);
    }

    pub fn is_freewheeling(&self) -> bool {
        self.engine.is_freewheeling()
    }

    /// Notify every client of an xrun.
    pub fn report_xrun(&self) {
        self.engine.report_xrun();
    }

    /// Rename the port `full_name` within its client.
    pub fn rename_port(&self, full_name: &str, new_short_name: &str) -> Result<()> {
        self.engine.rename_port(full_name, new_short_name)
    }

    /// Stop the server. Every client receives `info_shutdown` and `shutdown`;
    /// afterwards requests fail with `ServerGone` and new clients are refused.
    pub fn shutdown(&self, reason: &str) {
        self.engine.shutdown(reason);
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Names of the open clients, in opening order.
    pub fn clients(&self) -> Vec<String> {
        self.engine.clients()
    }

    /// Current edges as (source, destination) full names.
    pub fn connections(&self) -> Vec<(String, String)> {
        self.engine.connections()
    }
}

impl Default for LoopbackServer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioServer for LoopbackServer {
    fn open(
        &self,
        name: &str,
        options: ClientOptions,
        callbacks: Arc<dyn ServerCallbacks>,
    ) -> Result<Box<dyn ServerConnection>> {
        let (id, granted) = self.engine.open(name, options, callbacks)?;
        Ok(Box::new(LoopbackConnection::new(
            Arc::clone(&self.engine),
            id,
            granted,
        )))
    }
}

/// Builder for [`LoopbackServer`].
pub struct LoopbackServerBuilder {
    sample_rate: u32,
    buffer_size: Frames,
    realtime: bool,
    system: SystemPorts,
}

impl Default for LoopbackServerBuilder {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            buffer_size: 256,
            realtime: false,
            system: SystemPorts {
                audio_capture: 2,
                audio_playback: 2,
                midi_capture: 1,
                midi_playback: 1,
            },
        }
    }
}

impl LoopbackServerBuilder {
    /// Default: 48000
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Default: 256
    pub fn buffer_size(mut self, frames: Frames) -> Self {
        self.buffer_size = frames;
        self
    }

    /// Whether clients see the server as running with realtime scheduling.
    ///
    /// Default: false
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Physical audio ports of the `system` client. Default: 2 capture, 2 playback
    pub fn system_audio_ports(mut self, capture: usize, playback: usize) -> Self {
        self.system.audio_capture = capture;
        self.system.audio_playback = playback;
        self
    }

    /// Physical MIDI ports of the `system` client. Default: 1 capture, 1 playback
    pub fn system_midi_ports(mut self, capture: usize, playback: usize) -> Self {
        self.system.midi_capture = capture;
        self.system.midi_playback = playback;
        self
    }

    pub fn build(self) -> LoopbackServer {
        tracing::debug!(
            "Loopback server: {} Hz, {} frames",
            self.sample_rate,
            self.buffer_size
        );
        LoopbackServer {
            engine: Engine::new(
                self.sample_rate.max(1),
                self.buffer_size.max(1),
                self.realtime,
                self.system,
            ),
        }
    }
}
