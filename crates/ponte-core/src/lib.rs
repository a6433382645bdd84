//! Core of the ponte audio server bridge.
//!
//! Provides the port and transport data model, the backend contract
//! ([`AudioServer`], [`ServerConnection`], [`ServerCallbacks`]), notification
//! fan-out, the realtime processor slot, and the [`Bridge`] itself.
//!
//! Backends live in their own crates (`ponte-loopback`, `ponte-jack`).

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{BridgeConfig, ClientOptions, CLIENT_NAME_SIZE, PORT_NAME_SIZE};

pub mod port;
pub use port::{
    AudioPort, MidiPort, Port, PortDirection, PortHandle, PortId, PortInfo, PortKind, TypedPort,
};

pub mod transport;
pub use transport::{Bbt, Frames, TransportPosition, TransportState};

pub mod lockfree;

pub mod processor;
pub use processor::{Processor, SharedProcessor};

pub mod notification;
pub use notification::Notification;

pub mod server;
pub use server::{AudioServer, LatencyMode, PortLookup, ServerCallbacks, ServerConnection};

pub(crate) mod callback;

mod bridge;
pub use bridge::{Bridge, BridgeBuilder};

pub mod midi;
pub use midi::{
    default_midi_msg_channel, midi_msg_channel, MidiMsg, MidiMsgConsumer, MidiMsgProducer,
};
