#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Courier Core
//!
//! Coordination layer for long-running workers and the clients that talk to
//! them through mailboxes.
//!
//! ## Overview
//!
//! Every worker and every client-side wrapper runs its own mailbox loop on a
//! dedicated thread. The crate makes the awkward moments of that arrangement
//! safe: nothing can be sent to a loop before its queue exists, a client can
//! block until a worker handle is published from another thread, and release
//! tears everything down in a fixed order without leaving threads behind.
//!
//! ## Module Organization
//!
//! - [`mailbox`] - Mailbox loops, addresses and message envelopes
//! - [`handle`] - Write-once published handles with blocking reads
//! - [`registry`] - Worker type → live instance registry
//! - [`connection`] - Wrapper connection lifecycle and host boundary traits
//! - [`worker`] - Worker trait and hosting
//! - [`host`] - In-process connection manager
//! - [`scope`] - Explicit release groups
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use courier_core::config::CourierConfig;
//! use courier_core::connection::{ServiceWrapper, WrapperCallbacks};
//! use courier_core::host::LocalConnectionManager;
//! use courier_core::mailbox::Message;
//! use courier_core::registry::InstanceRegistry;
//! use courier_core::worker::Worker;
//! use std::sync::Arc;
//!
//! struct Counter;
//!
//! impl Worker for Counter {
//!     type Payload = u32;
//!     fn handle_message(&self, message: Message<u32>) {
//!         message.reply(message.payload + 1);
//!     }
//! }
//!
//! struct CounterClient;
//!
//! impl WrapperCallbacks<Counter> for CounterClient {
//!     fn handle_message(&self, _wrapper: &ServiceWrapper<Counter>, message: Message<u32>) {
//!         assert_eq!(message.payload, 2);
//!     }
//!     fn do_registration(&self, _wrapper: &ServiceWrapper<Counter>) {}
//!     fn on_initialized(&self, wrapper: &ServiceWrapper<Counter>) {
//!         wrapper.send(1);
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = InstanceRegistry::new();
//! let manager = Arc::new(LocalConnectionManager::<u32>::new(CourierConfig::default()));
//! manager.register_worker(registry.clone(), || Counter);
//!
//! let wrapper = ServiceWrapper::<Counter>::builder(manager.clone())
//!     .with_registry(registry)
//!     .connect(Arc::new(CounterClient))?;
//! let counter: Arc<Counter> = wrapper.service()?;
//! # let _ = counter;
//!
//! wrapper.release_and_join();
//! manager.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handle;
pub mod host;
pub mod logging;
pub mod mailbox;
pub mod registry;
pub mod scope;
pub mod worker;

pub use config::CourierConfig;
pub use connection::{
    ConnectionId, ConnectionListener, ConnectionManager, ConnectionState, ServiceBinding,
    ServiceWrapper, WrapperBuilder, WrapperCallbacks,
};
pub use error::{CourierError, Result};
pub use handle::PublishedHandle;
pub use host::LocalConnectionManager;
pub use mailbox::{Mailbox, MailboxLoop, Message, MessageHandler};
pub use registry::{InstanceRegistry, WorkerKey};
pub use scope::{Releasable, ReleaseGroup};
pub use worker::{Worker, WorkerHost};
