//! # Worker Hosting
//!
//! A worker is a long-lived, one-per-type service. [`WorkerHost`] gives a
//! worker its instance registry entry and its own mailbox loop, and hands out
//! the worker's mailbox only once that loop is ready.
//!
//! ```rust
//! use courier_core::config::CourierConfig;
//! use courier_core::mailbox::Message;
//! use courier_core::registry::InstanceRegistry;
//! use courier_core::worker::{Worker, WorkerHost};
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! impl Worker for Echo {
//!     type Payload = String;
//!
//!     fn handle_message(&self, message: Message<String>) {
//!         message.reply(message.payload.clone());
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = InstanceRegistry::new();
//! let host = WorkerHost::start(Arc::new(Echo), registry.clone(), &CourierConfig::default())?;
//! assert!(registry.lookup::<Echo>().is_some());
//!
//! host.send("hello".to_string());
//! host.shutdown();
//! assert!(registry.lookup::<Echo>().is_none());
//! # Ok(())
//! # }
//! ```

use crate::config::CourierConfig;
use crate::connection::ServiceBinding;
use crate::error::Result;
use crate::mailbox::{Mailbox, MailboxLoop, Message};
use crate::registry::{InstanceRegistry, WorkerKey};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A long-lived service reachable through its mailbox
pub trait Worker: Any + Send + Sync {
    /// Payload type carried by messages to and from this worker
    type Payload: Send + 'static;

    /// Handle one message on the worker's mailbox loop thread
    fn handle_message(&self, message: Message<Self::Payload>);

    /// Called once after the worker's mailbox loop has been started
    fn on_start(&self) {}

    /// Called once when the worker host shuts down
    fn on_stop(&self) {}
}

/// Owns a worker's registry entry and mailbox loop
pub struct WorkerHost<W: Worker> {
    worker: Arc<W>,
    registry: InstanceRegistry,
    mailbox_loop: MailboxLoop<W::Payload>,
    stopped: AtomicBool,
}

impl<W: Worker> WorkerHost<W> {
    /// Register `worker` and start its mailbox loop.
    ///
    /// The registry entry exists before the loop is started, so a wrapper
    /// that can bind to the worker can always look it up.
    pub fn start(worker: Arc<W>, registry: InstanceRegistry, config: &CourierConfig) -> Result<Arc<Self>> {
        let key = Self::worker_key();
        registry.register(Arc::clone(&worker));

        let dispatch = Arc::clone(&worker);
        let thread_name = config.thread_name(&format!("{}-worker", key.short_name()));
        let mailbox_loop = match MailboxLoop::start(
            thread_name,
            move |message: Message<W::Payload>| dispatch.handle_message(message),
        ) {
            Ok(mailbox_loop) => mailbox_loop,
            Err(err) => {
                registry.deregister(&worker);
                return Err(err);
            }
        };

        worker.on_start();
        info!(worker_type = %key, "Worker started");

        Ok(Arc::new(Self {
            worker,
            registry,
            mailbox_loop,
            stopped: AtomicBool::new(false),
        }))
    }

    pub fn worker_key() -> WorkerKey {
        WorkerKey::of::<W>()
    }

    pub fn worker(&self) -> Arc<W> {
        Arc::clone(&self.worker)
    }

    /// The worker's mailbox; blocks until its loop is ready
    pub fn mailbox(&self) -> Result<Mailbox<W::Payload>> {
        self.mailbox_loop.mailbox()
    }

    pub fn mailbox_timeout(&self, timeout: Duration) -> Result<Mailbox<W::Payload>> {
        self.mailbox_loop.mailbox_timeout(timeout)
    }

    /// Post a message to the worker's own loop
    pub fn post(&self, message: Message<W::Payload>) {
        self.mailbox_loop.post(message);
    }

    pub fn send(&self, payload: W::Payload) {
        self.post(Message::new(payload));
    }

    /// Stop the loop and remove the worker's registry entry. Idempotent.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.mailbox_loop.stop();
        self.registry.deregister(&self.worker);
        self.worker.on_stop();
        info!(worker_type = %Self::worker_key(), "Worker stopped");
    }

    /// Wait for the worker's loop thread to exit
    pub fn join(&self) {
        self.mailbox_loop.join();
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && self.mailbox_loop.is_running()
    }
}

impl<W: Worker> ServiceBinding<W::Payload> for WorkerHost<W> {
    fn key(&self) -> WorkerKey {
        Self::worker_key()
    }

    fn bind(&self, timeout: Duration) -> Result<Mailbox<W::Payload>> {
        self.mailbox_timeout(timeout)
    }

    fn terminate(&self) {
        self.shutdown();
    }

    fn join(&self) {
        WorkerHost::join(self);
    }
}

impl<W: Worker> fmt::Debug for WorkerHost<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHost")
            .field("worker_type", &Self::worker_key().name())
            .field("mailbox_loop", &self.mailbox_loop)
            .field("stopped", &self.stopped.load(Ordering::SeqCst))
            .finish()
    }
}
