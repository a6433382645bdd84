//! Error types for ponte-core.

use thiserror::Error;

/// Error type returned by server backends.
///
/// The [`Bridge`](crate::Bridge) never hands these to callers; it logs them and
/// reports a neutral value instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Audio server unavailable: {0}")]
    ServerUnavailable(String),

    #[error("Audio server has shut down")]
    ServerGone,

    #[error("Client name '{0}' is already in use")]
    NameTaken(String),

    #[error("Invalid client name '{name}': {reason}")]
    InvalidClientName { name: String, reason: &'static str },

    #[error("Invalid port name '{name}': {reason}")]
    InvalidPortName { name: String, reason: &'static str },

    #[error("Port already exists: {0}")]
    PortExists(String),

    #[error("No such port: {0}")]
    NoSuchPort(String),

    #[error("Port {0} is not owned by this client")]
    NotOwner(String),

    #[error("Port type mismatch: {from} -> {to}")]
    TypeMismatch { from: String, to: String },

    #[error("Invalid connection direction: {from} -> {to}")]
    InvalidDirection { from: String, to: String },

    #[error("Ports already connected: {from} -> {to}")]
    AlreadyConnected { from: String, to: String },

    #[error("Ports not connected: {from} -> {to}")]
    NotConnected { from: String, to: String },

    #[error("Invalid BBT position: {0}")]
    InvalidBbt(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
