//! Port handles.
//!
//! A [`Port`] is a snapshot of one endpoint in the server's graph. Snapshots are
//! cheap to clone and stay readable after the port is gone; re-query the bridge
//! to observe current state. [`AudioPort`] and [`MidiPort`] are typed wrappers so
//! that only ports of the same kind can be connected.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Numeric id the server uses in registration and connection callbacks.
pub type PortId = u32;

/// Raw port identity assigned by the server, stable while the port exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortHandle(u64);

impl PortHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Audio,
    Midi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

/// Everything the server reports about a port at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub handle: PortHandle,
    /// `client:port`
    pub full_name: String,
    pub kind: PortKind,
    pub direction: PortDirection,
    pub is_physical: bool,
}

impl PortInfo {
    pub fn new(
        handle: PortHandle,
        full_name: impl Into<String>,
        kind: PortKind,
        direction: PortDirection,
    ) -> Self {
        Self {
            handle,
            full_name: full_name.into(),
            kind,
            direction,
            is_physical: false,
        }
    }

    pub fn physical(mut self) -> Self {
        self.is_physical = true;
        self
    }

    /// Client part of the full name. Client names never contain `:`.
    pub fn client_name(&self) -> &str {
        self.full_name
            .split_once(':')
            .map(|(client, _)| client)
            .unwrap_or("")
    }

    /// Port part of the full name.
    pub fn short_name(&self) -> &str {
        self.full_name
            .split_once(':')
            .map(|(_, port)| port)
            .unwrap_or(&self.full_name)
    }
}

/// Snapshot of a port, or an invalid handle.
///
/// Accessors on an invalid port return empty strings and `false`. An invalid
/// port is not equal to any port, including another invalid one.
#[derive(Debug, Clone, Default)]
pub struct Port {
    info: Option<Arc<PortInfo>>,
}

impl Port {
    pub fn invalid() -> Self {
        Self { info: None }
    }

    pub fn is_valid(&self) -> bool {
        self.info.is_some()
    }

    pub fn info(&self) -> Option<&PortInfo> {
        self.info.as_deref()
    }

    pub fn handle(&self) -> Option<PortHandle> {
        self.info.as_ref().map(|info| info.handle)
    }

    /// Short name, e.g. `out1`.
    pub fn name(&self) -> &str {
        self.info.as_ref().map_or("", |info| info.short_name())
    }

    /// Full name, e.g. `App:out1`.
    pub fn full_name(&self) -> &str {
        self.info.as_ref().map_or("", |info| info.full_name.as_str())
    }

    pub fn client_name(&self) -> &str {
        self.info.as_ref().map_or("", |info| info.client_name())
    }

    pub fn kind(&self) -> Option<PortKind> {
        self.info.as_ref().map(|info| info.kind)
    }

    pub fn direction(&self) -> Option<PortDirection> {
        self.info.as_ref().map(|info| info.direction)
    }

    pub fn is_input(&self) -> bool {
        self.direction() == Some(PortDirection::Input)
    }

    pub fn is_output(&self) -> bool {
        self.direction() == Some(PortDirection::Output)
    }

    pub fn is_audio(&self) -> bool {
        self.kind() == Some(PortKind::Audio)
    }

    pub fn is_midi(&self) -> bool {
        self.kind() == Some(PortKind::Midi)
    }

    pub fn is_physical(&self) -> bool {
        self.info.as_ref().is_some_and(|info| info.is_physical)
    }

    /// Typed view, if this is a valid audio port.
    pub fn into_audio(self) -> Option<AudioPort> {
        AudioPort::from_port(self)
    }

    /// Typed view, if this is a valid MIDI port.
    pub fn into_midi(self) -> Option<MidiPort> {
        MidiPort::from_port(self)
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        match (&self.info, &other.info) {
            (Some(a), Some(b)) => a.handle == b.handle,
            _ => false,
        }
    }
}

impl From<PortInfo> for Port {
    fn from(info: PortInfo) -> Self {
        Self {
            info: Some(Arc::new(info)),
        }
    }
}

impl From<Option<PortInfo>> for Port {
    fn from(info: Option<PortInfo>) -> Self {
        info.map(Port::from).unwrap_or_default()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.info {
            Some(info) => write!(f, "{}", info.full_name),
            None => write!(f, "<invalid port>"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::AudioPort {}
    impl Sealed for super::MidiPort {}
}

/// A port handle whose kind is fixed by its type.
///
/// Connecting two ports requires both to be the same `TypedPort` type.
pub trait TypedPort: sealed::Sealed + Deref<Target = Port> + Sized {
    const KIND: PortKind;

    /// Wrap `port`, or `None` if it is invalid or of another kind.
    fn from_port(port: Port) -> Option<Self>;

    /// Wrap `port` without checking. Used for registration results, which may be invalid.
    fn wrap(port: Port) -> Self;

    fn port(&self) -> &Port;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioPort(Port);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MidiPort(Port);

macro_rules! typed_port {
    ($ty:ident, $kind:expr) => {
        impl TypedPort for $ty {
            const KIND: PortKind = $kind;

            fn from_port(port: Port) -> Option<Self> {
                (port.kind() == Some($kind)).then(|| Self(port))
            }

            fn wrap(port: Port) -> Self {
                Self(port)
            }

            fn port(&self) -> &Port {
                &self.0
            }
        }

        impl Deref for $ty {
            type Target = Port;

            fn deref(&self) -> &Port {
                &self.0
            }
        }

        impl From<$ty> for Port {
            fn from(port: $ty) -> Port {
                port.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

typed_port!(AudioPort, PortKind::Audio);
typed_port!(MidiPort, PortKind::Midi);
