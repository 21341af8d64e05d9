//! A connection manager driven by hand, for deterministic lifecycle tests

use courier_core::connection::{ConnectionId, ConnectionListener, ConnectionManager};
use courier_core::error::{CourierError, Result};
use courier_core::registry::WorkerKey;
use parking_lot::Mutex;
use std::sync::Arc;

/// Grants every request (or rejects them all) but never confirms on its own
pub struct ManualManager<P> {
    reject: bool,
    listeners: Mutex<Vec<(ConnectionId, Arc<dyn ConnectionListener<P>>)>>,
    released: Mutex<Vec<ConnectionId>>,
}

impl<P> ManualManager<P> {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            reject: false,
            listeners: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            reject: true,
            listeners: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
        })
    }

    /// The most recently granted listener
    pub fn listener(&self) -> Option<Arc<dyn ConnectionListener<P>>> {
        self.listeners.lock().last().map(|(_, listener)| Arc::clone(listener))
    }

    pub fn requests(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn released(&self) -> Vec<ConnectionId> {
        self.released.lock().clone()
    }
}

impl<P> ConnectionManager<P> for ManualManager<P> {
    fn request_connection(
        &self,
        target: WorkerKey,
        listener: Arc<dyn ConnectionListener<P>>,
    ) -> Result<ConnectionId> {
        if self.reject {
            return Err(CourierError::bind_failure(target.name()));
        }
        let id = ConnectionId::new();
        self.listeners.lock().push((id, listener));
        Ok(id)
    }

    fn release_connection(&self, id: ConnectionId) {
        self.released.lock().push(id);
    }
}
