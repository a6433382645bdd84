//! JACK Audio Connection Kit backend for ponte.
//!
//! [`JackServer`] opens clients through the `jack` crate. Every notification
//! and process handler is installed when the client is opened; the latency
//! callback is not available through the `jack` crate and is never delivered.

mod convert;
mod handlers;
mod server;

pub use server::{JackConnection, JackServer};
