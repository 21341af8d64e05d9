//! # Connection Manager Boundary
//!
//! The traits the connection lifecycle consumes from its host environment.
//! [`crate::host::LocalConnectionManager`] is the in-process implementation.

use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::registry::WorkerKey;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Identifies one granted connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives asynchronous connection events from a [`ConnectionManager`]
pub trait ConnectionListener<P>: Send + Sync {
    /// The worker's mailbox is ready and bound to this connection
    fn on_connected(&self, mailbox: Mailbox<P>);

    /// The worker went away; may be called zero or more times
    fn on_disconnected(&self);
}

/// Host-side connection management
pub trait ConnectionManager<P>: Send + Sync {
    /// Ask for a connection to the worker type `target`.
    ///
    /// Rejection is reported synchronously; success is confirmed later through
    /// `listener.on_connected`, never on the calling thread.
    fn request_connection(
        &self,
        target: WorkerKey,
        listener: Arc<dyn ConnectionListener<P>>,
    ) -> Result<ConnectionId>;

    /// Tear the connection down. Unknown ids are ignored.
    fn release_connection(&self, id: ConnectionId);
}

/// A running worker as seen by a connection manager
pub trait ServiceBinding<P>: Send + Sync {
    fn key(&self) -> WorkerKey;

    /// The worker's mailbox, waiting at most `timeout` for its loop to be ready
    fn bind(&self, timeout: Duration) -> Result<Mailbox<P>>;

    /// Shut the worker down
    fn terminate(&self);

    /// Wait for the worker's threads to exit after `terminate`
    fn join(&self) {}
}
