//! In-process audio server backend for ponte.
//!
//! [`LoopbackServer`] implements the server contract without any system audio
//! stack: a port graph with physical `system` ports, transport, an explicitly
//! driven process clock, and asynchronous callback delivery. It is used for
//! tests and offline tools, and to exercise code written against a real server.

mod connection;
mod engine;
mod notifier;
mod server;
mod transport;

pub use connection::LoopbackConnection;
pub use server::{LoopbackServer, LoopbackServerBuilder};
