//! Application-level notifications and their fan-out.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;

use crate::port::Port;

/// Everything the bridge reports about the connection and the server's graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Connected,
    Disconnected,
    Activated,
    Deactivated,

    ClientRegistered(String),
    ClientUnregistered(String),

    PortRegistered(Port),
    PortUnregistered(Port),
    /// Source, destination.
    PortsConnected(Port, Port),
    /// Source, destination.
    PortsDisconnected(Port, Port),
    PortRenamed {
        port: Port,
        old_name: String,
        new_name: String,
    },

    GraphOrderChanged,
    StartedFreewheeling,
    StoppedFreewheeling,
    /// The server went away. Always preceded by [`Notification::Disconnected`].
    ServerShutdown,
    SampleRateChanged(u32),
    BufferSizeChanged(u32),
    XrunOccurred,
}

/// Fans every notification out to all live subscribers.
///
/// Emission never blocks: a full bounded subscriber misses the notification.
pub(crate) struct NotificationBus {
    subscribers: RwLock<Vec<Sender<Notification>>>,
    capacity: Option<usize>,
}

impl NotificationBus {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            capacity,
        }
    }

    pub(crate) fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = match self.capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        self.subscribers.write().push(tx);
        rx
    }

    pub(crate) fn emit(&self, notification: Notification) {
        let mut closed = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for tx in subscribers.iter() {
                match tx.try_send(notification.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(dropped)) => {
                        tracing::warn!("Notification channel full, dropping {:?}", dropped);
                    }
                    Err(TrySendError::Disconnected(_)) => closed.push(tx.clone()),
                }
            }
        }

        if !closed.is_empty() {
            self.subscribers
                .write()
                .retain(|tx| !closed.iter().any(|gone| gone.same_channel(tx)));
            tracing::trace!("Pruned {} closed notification subscribers", closed.len());
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
