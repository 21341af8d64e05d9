//! # Connection States
//!
//! Per-wrapper lifecycle. A wrapper connects once; after a disconnect it stays
//! degraded until it is released, and `Released` is terminal.
//!
//! ```text
//! Unbound ──request──→ Connecting ──connected──→ Connected
//!                          │                        │
//!                          └──disconnected──┐  disconnected
//!                                           ↓       ↓
//!                                         Disconnected
//! any non-terminal state ──release──→ Released
//! ```

use std::fmt;

/// Connection lifecycle states for a wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Wrapper built, no connection requested yet
    #[default]
    Unbound,
    /// Connection requested, waiting for the host to confirm
    Connecting,
    /// Handle published, worker mailbox captured, callbacks run
    Connected,
    /// Worker went away; the wrapper is permanently degraded
    Disconnected,
    /// Explicitly released
    Released,
}

/// Events that drive connection state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Request,
    Connected,
    Disconnected,
    Release,
}

impl ConnectionState {
    /// Target state for `event`, or `None` if the transition is not allowed
    pub fn transition(self, event: ConnectionEvent) -> Option<ConnectionState> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self, event) {
            (S::Unbound, E::Request) => Some(S::Connecting),
            (S::Connecting, E::Connected) => Some(S::Connected),
            (S::Connecting | S::Connected, E::Disconnected) => Some(S::Disconnected),
            (S::Released, E::Release) => None,
            (_, E::Release) => Some(S::Released),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => write!(f, "unbound"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Released => write!(f, "released"),
        }
    }
}

impl ConnectionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Release => "release",
        }
    }
}
