//! Bridge configuration.

use crate::{Error, Result};

/// Maximum client name size in bytes, including the terminator the server reserves.
pub const CLIENT_NAME_SIZE: usize = 64;

/// Maximum full port name (`client:port`) size in bytes, including the terminator.
pub const PORT_NAME_SIZE: usize = 256;

/// Options passed to the server when opening a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Do not start a server if none is running.
    pub no_start_server: bool,
    /// Fail instead of letting the server pick a unique name on collision.
    pub use_exact_name: bool,
}

/// Configuration for a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub options: ClientOptions,
    /// Capacity of each subscriber channel. `None` means unbounded.
    pub notification_capacity: Option<usize>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            options: ClientOptions::default(),
            notification_capacity: Some(1024),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.notification_capacity == Some(0) {
            return Err(Error::InvalidConfig(
                "notification_capacity must be at least 1 (use None for unbounded)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Check a requested client name against the server's naming rules.
pub fn validate_client_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidClientName {
            name: name.to_string(),
            reason,
        })
    };
    if name.is_empty() {
        return invalid("empty");
    }
    if name.len() >= CLIENT_NAME_SIZE {
        return invalid("too long");
    }
    if name.contains(':') {
        return invalid("contains ':'");
    }
    Ok(())
}

/// Check a port short name and the full name it produces for `client`.
pub fn validate_port_name(client: &str, short_name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidPortName {
            name: short_name.to_string(),
            reason,
        })
    };
    if short_name.is_empty() {
        return invalid("empty");
    }
    if client.len() + 1 + short_name.len() >= PORT_NAME_SIZE {
        return invalid("full name too long");
    }
    Ok(())
}
