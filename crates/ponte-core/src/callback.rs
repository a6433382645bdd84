//! Per-connection callback session.
//!
//! One [`Session`] is created for every successful open and handed to the
//! backend as its [`ServerCallbacks`]. It translates raw callbacks into
//! [`Notification`]s and runs the processor on the realtime thread.

use std::sync::Arc;

use crate::lockfree::AtomicFlag;
use crate::notification::{Notification, NotificationBus};
use crate::port::{Port, PortId};
use crate::processor::ProcessorSlot;
use crate::server::{LatencyMode, PortLookup, ServerCallbacks};
use crate::transport::Frames;

pub(crate) struct Session {
    bus: Arc<NotificationBus>,
    processor: Arc<ProcessorSlot>,
    /// Set between activate and deactivate.
    processing: AtomicFlag,
    /// Set once the bridge has started closing the connection locally.
    closed: AtomicFlag,
    /// Set once the server has announced shutdown.
    gone: AtomicFlag,
}

impl Session {
    pub(crate) fn new(bus: Arc<NotificationBus>, processor: Arc<ProcessorSlot>) -> Self {
        Self {
            bus,
            processor,
            processing: AtomicFlag::new(false),
            closed: AtomicFlag::new(false),
            gone: AtomicFlag::new(false),
        }
    }

    pub(crate) fn set_processing(&self, processing: bool) {
        self.processing.set(processing);
    }

    pub(crate) fn close(&self) {
        self.processing.set(false);
        self.closed.set(true);
    }

    pub(crate) fn is_gone(&self) -> bool {
        self.gone.get()
    }

    fn emit(&self, notification: Notification) {
        if self.closed.get() {
            return;
        }
        self.bus.emit(notification);
    }

    fn resolve(lookup: &dyn PortLookup, id: PortId) -> Option<Port> {
        lookup.port_by_id(id).map(Port::from)
    }

    fn server_gone(&self, reason: Option<(u32, &str)>) {
        self.processing.set(false);
        if self.closed.get() || self.gone.swap(true) {
            return;
        }
        match reason {
            Some((code, reason)) => {
                tracing::warn!("Audio server shut down (status {:#x}): {}", code, reason)
            }
            None => tracing::warn!("Audio server shut down"),
        }
        self.bus.emit(Notification::Disconnected);
        self.bus.emit(Notification::ServerShutdown);
    }
}

impl ServerCallbacks for Session {
    fn thread_init(&self) {
        tracing::trace!("Server thread started: {:?}", std::thread::current().name());
    }

    #[inline]
    fn process(&self, frames: Frames) {
        if self.processing.get() && !self.closed.get() && !self.gone.get() {
            self.processor.run(frames);
        }
    }

    fn freewheel(&self, starting: bool) {
        self.emit(if starting {
            Notification::StartedFreewheeling
        } else {
            Notification::StoppedFreewheeling
        });
    }

    fn client_registration(&self, name: &str, registered: bool) {
        let name = name.to_string();
        self.emit(if registered {
            Notification::ClientRegistered(name)
        } else {
            Notification::ClientUnregistered(name)
        });
    }

    fn port_registration(&self, lookup: &dyn PortLookup, id: PortId, registered: bool) {
        let Some(port) = Self::resolve(lookup, id) else {
            tracing::trace!("Port {} not resolvable, registration event suppressed", id);
            return;
        };
        self.emit(if registered {
            Notification::PortRegistered(port)
        } else {
            Notification::PortUnregistered(port)
        });
    }

    fn port_connect(&self, lookup: &dyn PortLookup, a: PortId, b: PortId, connected: bool) {
        let (Some(source), Some(destination)) = (Self::resolve(lookup, a), Self::resolve(lookup, b))
        else {
            tracing::trace!("Ports {} -> {} not resolvable, connect event suppressed", a, b);
            return;
        };
        self.emit(if connected {
            Notification::PortsConnected(source, destination)
        } else {
            Notification::PortsDisconnected(source, destination)
        });
    }

    fn port_rename(&self, lookup: &dyn PortLookup, id: PortId, old_name: &str, new_name: &str) {
        let Some(port) = Self::resolve(lookup, id) else {
            return;
        };
        self.emit(Notification::PortRenamed {
            port,
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        });
    }

    fn graph_order(&self) {
        self.emit(Notification::GraphOrderChanged);
    }

    fn latency(&self, mode: LatencyMode) {
        tracing::trace!("Latency recompute requested: {:?}", mode);
    }

    fn buffer_size(&self, frames: Frames) {
        self.emit(Notification::BufferSizeChanged(frames));
    }

    fn sample_rate(&self, rate: u32) {
        self.emit(Notification::SampleRateChanged(rate));
    }

    fn xrun(&self) {
        self.emit(Notification::XrunOccurred);
    }

    fn shutdown(&self) {
        self.server_gone(None);
    }

    fn info_shutdown(&self, code: u32, reason: &str) {
        self.server_gone(Some((code, reason)));
    }
}
