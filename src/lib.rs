//! # Ponte - client bridge to a JACK-style audio server
//!
//! Ponte is an umbrella crate over:
//! - **ponte-core** - port and transport model, notifications, the [`Bridge`]
//! - **ponte-loopback** - deterministic in-process server (feature `loopback`)
//! - **ponte-jack** - JACK Audio Connection Kit backend (feature `jack`)
//!
//! ## Quick Start
//!
//! ```ignore
//! use ponte::prelude::*;
//!
//! let server = LoopbackServer::new();
//! let bridge = Bridge::new(server.clone());
//! let events = bridge.subscribe();
//!
//! bridge.connect_to_server("App");
//! let out = bridge.register_audio_out_port("out1");
//! let playback = bridge.port_by_name("system:playback_1").into_audio().unwrap();
//! bridge.connect(&out, &playback);
//!
//! bridge.set_processor(Some(shared(|frames: Frames| {
//!     // fill `frames` samples
//! })));
//! bridge.activate();
//! server.run_cycles(4);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - loopback server
//! - `jack` - JACK backend (links libjack)
//! - `full` - every backend

/// Re-export of ponte-core for direct access
pub use ponte_core as core;

pub use ponte_core::{
    // Bridge
    Bridge,
    BridgeBuilder,
    BridgeConfig,
    ClientOptions,

    // Errors
    Error,
    Result,

    // Ports
    AudioPort,
    MidiPort,
    Port,
    PortDirection,
    PortHandle,
    PortId,
    PortInfo,
    PortKind,
    TypedPort,

    // Transport
    Bbt,
    Frames,
    TransportPosition,
    TransportState,

    // Processing and notifications
    Notification,
    Processor,
    SharedProcessor,

    // Backend contract
    AudioServer,
    LatencyMode,
    PortLookup,
    ServerCallbacks,
    ServerConnection,

    // MIDI
    default_midi_msg_channel,
    midi_msg_channel,
    MidiMsg,
    MidiMsgConsumer,
    MidiMsgProducer,
};

pub use ponte_core::processor::shared;

#[cfg(feature = "loopback")]
pub use ponte_loopback::{LoopbackConnection, LoopbackServer, LoopbackServerBuilder};

#[cfg(feature = "jack")]
pub use ponte_jack::{JackConnection, JackServer};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        shared, AudioPort, Bbt, Bridge, Frames, MidiPort, Notification, Port, PortDirection,
        PortKind, Processor, TransportPosition, TransportState, TypedPort,
    };

    #[cfg(feature = "loopback")]
    pub use crate::LoopbackServer;

    #[cfg(feature = "jack")]
    pub use crate::JackServer;
}
