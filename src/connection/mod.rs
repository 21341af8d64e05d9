//! # Connection Lifecycle
//!
//! Binding a client-side [`ServiceWrapper`] to a worker and tearing it down.
//!
//! ## Overview
//!
//! A wrapper asks a [`ConnectionManager`] for a connection to its worker type.
//! When the manager confirms, the wrapper publishes the worker instance from
//! the [`crate::registry::InstanceRegistry`], captures the worker's mailbox and
//! then runs its registration and initialization callbacks, strictly in that
//! order and exactly once. Release stops the wrapper's own loop before the
//! connection is dropped.
//!
//! ## Usage
//!
//! ```rust
//! use courier_core::config::CourierConfig;
//! use courier_core::connection::{ServiceWrapper, WrapperCallbacks};
//! use courier_core::host::LocalConnectionManager;
//! use courier_core::mailbox::Message;
//! use courier_core::registry::InstanceRegistry;
//! use courier_core::worker::{Worker, WorkerHost};
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! impl Worker for Clock {
//!     type Payload = u64;
//!     fn handle_message(&self, message: Message<u64>) {
//!         message.reply(42);
//!     }
//! }
//!
//! struct ClockClient;
//!
//! impl WrapperCallbacks<Clock> for ClockClient {
//!     fn handle_message(&self, _wrapper: &ServiceWrapper<Clock>, message: Message<u64>) {
//!         println!("time is {}", message.payload);
//!     }
//!     fn do_registration(&self, _wrapper: &ServiceWrapper<Clock>) {}
//!     fn on_initialized(&self, wrapper: &ServiceWrapper<Clock>) {
//!         wrapper.send(0);
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = InstanceRegistry::new();
//! let config = CourierConfig::default();
//! let manager = Arc::new(LocalConnectionManager::<u64>::new(config.clone()));
//! manager.publish(WorkerHost::start(Arc::new(Clock), registry.clone(), &config)?);
//!
//! let wrapper = ServiceWrapper::<Clock>::builder(manager.clone())
//!     .with_registry(registry)
//!     .with_config(config)
//!     .connect(Arc::new(ClockClient))?;
//!
//! let _clock: Arc<Clock> = wrapper.service()?;
//! wrapper.release_and_join();
//! manager.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod state;
pub mod wrapper;

pub use manager::{ConnectionId, ConnectionListener, ConnectionManager, ServiceBinding};
pub use state::{ConnectionEvent, ConnectionState};
pub use wrapper::{ServiceWrapper, WrapperBuilder, WrapperCallbacks};
