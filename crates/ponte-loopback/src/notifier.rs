//! Asynchronous callback delivery.
//!
//! Every non-realtime callback is queued as a [`Delivery`] and dispatched in
//! queue order on the `loopback-notifier` thread, so callbacks never run on
//! the thread that changed the graph.

use std::sync::{Arc, Weak};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use ponte_core::{LatencyMode, PortId, PortInfo, PortLookup, ServerCallbacks};

use crate::engine::Engine;

/// Status code passed to `info_shutdown` when the server stops on request.
pub(crate) const SHUTDOWN_STATUS: u32 = 0x20;

#[derive(Debug, Clone)]
pub(crate) enum Event {
    ThreadInit,
    Freewheel(bool),
    ClientRegistration { name: String, registered: bool },
    PortRegistration { id: PortId, registered: bool },
    PortConnect { a: PortId, b: PortId, connected: bool },
    PortRename { id: PortId, old_name: String, new_name: String },
    GraphOrder,
    Latency(LatencyMode),
    BufferSize(u32),
    SampleRate(u32),
    Xrun,
    Shutdown { reason: String },
}

pub(crate) enum Delivery {
    Notify {
        target: Arc<dyn ServerCallbacks>,
        event: Event,
        /// Ports already removed from the graph that this event refers to.
        retired: Arc<[PortInfo]>,
    },
    /// Acknowledged once every earlier delivery has been dispatched.
    Barrier(Sender<()>),
}

/// Resolves ids against the live graph, then against the delivery's retired ports.
struct DeliveryLookup<'a> {
    engine: &'a Engine,
    retired: &'a [PortInfo],
}

impl PortLookup for DeliveryLookup<'_> {
    fn port_by_id(&self, id: PortId) -> Option<PortInfo> {
        self.engine.lookup_id(id).or_else(|| {
            self.retired
                .iter()
                .find(|info| info.handle.raw() == u64::from(id))
                .cloned()
        })
    }
}

pub(crate) fn spawn(engine: Weak<Engine>) -> std::io::Result<Sender<Delivery>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("loopback-notifier".to_string())
        .spawn(move || run(rx, engine))?;
    Ok(tx)
}

fn run(rx: Receiver<Delivery>, engine: Weak<Engine>) {
    tracing::debug!("Loopback notifier thread started");
    while let Ok(delivery) = rx.recv() {
        match delivery {
            Delivery::Notify {
                target,
                event,
                retired,
            } => {
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                let lookup = DeliveryLookup {
                    engine: &engine,
                    retired: &retired,
                };
                dispatch(target.as_ref(), &lookup, event);
            }
            Delivery::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("Loopback notifier thread stopped");
}

fn dispatch(target: &dyn ServerCallbacks, lookup: &dyn PortLookup, event: Event) {
    match event {
        Event::ThreadInit => target.thread_init(),
        Event::Freewheel(starting) => target.freewheel(starting),
        Event::ClientRegistration { name, registered } => {
            target.client_registration(&name, registered)
        }
        Event::PortRegistration { id, registered } => {
            target.port_registration(lookup, id, registered)
        }
        Event::PortConnect { a, b, connected } => target.port_connect(lookup, a, b, connected),
        Event::PortRename {
            id,
            old_name,
            new_name,
        } => target.port_rename(lookup, id, &old_name, &new_name),
        Event::GraphOrder => target.graph_order(),
        Event::Latency(mode) => target.latency(mode),
        Event::BufferSize(frames) => target.buffer_size(frames),
        Event::SampleRate(rate) => target.sample_rate(rate),
        Event::Xrun => target.xrun(),
        Event::Shutdown { reason } => {
            target.info_shutdown(SHUTDOWN_STATUS, &reason);
            target.shutdown();
        }
    }
}
