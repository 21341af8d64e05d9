//! # Service Wrapper
//!
//! Client-side proxy bound to one worker for its whole lifetime.
//!
//! ## Lifecycle
//!
//! ```text
//! connect()
//!   ├─ start own mailbox loop
//!   ├─ Unbound → Connecting, request connection (rejection fails construction)
//!   └─ return wrapper
//!
//! on_connected(mailbox)            [connection dispatch thread]
//!   1. registry lookup → publish handle (wakes service() callers)
//!   2. capture worker mailbox           → Connected
//!   3. callbacks.do_registration
//!   4. callbacks.on_initialized
//!
//! release()
//!   callbacks.on_release → stop own loop → release connection → drop worker mailbox
//! ```
//!
//! Release waits for an in-flight on-connected sequence to finish, so
//! registration never runs against a released wrapper.
//!
//! The handle is write-once: a disconnect drops the worker mailbox but keeps
//! the handle, and a new wrapper is needed to reconnect.

use super::manager::{ConnectionId, ConnectionListener, ConnectionManager};
use super::state::{ConnectionEvent, ConnectionState};
use crate::config::CourierConfig;
use crate::error::Result;
use crate::handle::PublishedHandle;
use crate::logging::log_connection_operation;
use crate::mailbox::{Mailbox, MailboxLoop, Message};
use crate::registry::{InstanceRegistry, WorkerKey};
use crate::worker::Worker;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Hooks a wrapper implementation provides
///
/// Every hook receives the wrapper itself, so implementations can send to the
/// worker, reach the worker instance, or hand out the wrapper's own mailbox.
pub trait WrapperCallbacks<W: Worker>: Send + Sync + 'static {
    /// Handle a message delivered to the wrapper's own mailbox loop
    fn handle_message(&self, wrapper: &ServiceWrapper<W>, message: Message<W::Payload>);

    /// Announce the wrapper to the worker. Runs once, after the handle and
    /// the worker mailbox are valid and before `on_initialized`.
    fn do_registration(&self, wrapper: &ServiceWrapper<W>);

    /// Everything is ready. Runs once, after `do_registration`.
    fn on_initialized(&self, wrapper: &ServiceWrapper<W>);

    /// The worker went away
    fn on_service_disconnected(&self, _wrapper: &ServiceWrapper<W>) {}

    /// Undo registrations before the wrapper releases its connection.
    /// Runs once, while the worker mailbox is still usable.
    fn on_release(&self, _wrapper: &ServiceWrapper<W>) {}
}

struct Lifecycle {
    state: ConnectionState,
    connection_id: Option<ConnectionId>,
}

struct WrapperShared<W: Worker> {
    key: WorkerKey,
    registry: InstanceRegistry,
    config: CourierConfig,
    manager: Arc<dyn ConnectionManager<W::Payload>>,
    callbacks: Arc<dyn WrapperCallbacks<W>>,
    mailbox_loop: MailboxLoop<W::Payload>,
    service: PublishedHandle<Arc<W>>,
    worker_mailbox: RwLock<Option<Mailbox<W::Payload>>>,
    lifecycle: Mutex<Lifecycle>,
    /// Held across lifecycle callback sequences; reentrant so a callback may release
    callback_guard: ReentrantMutex<()>,
}

/// Client-side proxy for the worker `W`; clones share the same connection
pub struct ServiceWrapper<W: Worker> {
    shared: Arc<WrapperShared<W>>,
}

/// Builder for [`ServiceWrapper`]
pub struct WrapperBuilder<W: Worker> {
    manager: Arc<dyn ConnectionManager<W::Payload>>,
    registry: InstanceRegistry,
    config: CourierConfig,
}

impl<W: Worker> WrapperBuilder<W> {
    /// Start from the process-wide registry and default configuration
    pub fn new(manager: Arc<dyn ConnectionManager<W::Payload>>) -> Self {
        Self {
            manager,
            registry: InstanceRegistry::global().clone(),
            config: CourierConfig::default(),
        }
    }

    pub fn with_registry(mut self, registry: InstanceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: CourierConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the wrapper and request its connection
    pub fn connect(self, callbacks: Arc<dyn WrapperCallbacks<W>>) -> Result<ServiceWrapper<W>> {
        ServiceWrapper::connect(callbacks, self.manager, self.registry, self.config)
    }
}

impl<W: Worker> ServiceWrapper<W> {
    pub fn builder(manager: Arc<dyn ConnectionManager<W::Payload>>) -> WrapperBuilder<W> {
        WrapperBuilder::new(manager)
    }

    /// Start the wrapper's mailbox loop and request a connection to `W`.
    ///
    /// Fails with `BindFailure` if the host rejects the request, or
    /// `ThreadSpawn` if the loop cannot be started. On failure the loop thread
    /// has already exited and no wrapper is returned.
    pub fn connect(
        callbacks: Arc<dyn WrapperCallbacks<W>>,
        manager: Arc<dyn ConnectionManager<W::Payload>>,
        registry: InstanceRegistry,
        config: CourierConfig,
    ) -> Result<Self> {
        let key = WorkerKey::of::<W>();

        // Weak back-reference, filled in once the shared state exists
        let owner: Arc<OnceLock<Weak<WrapperShared<W>>>> = Arc::new(OnceLock::new());
        let mailbox_loop = {
            let owner = Arc::clone(&owner);
            MailboxLoop::start(
                config.thread_name(&format!("{}-wrapper", key.short_name())),
                move |message: Message<W::Payload>| {
                    let Some(shared) = owner.get().and_then(Weak::upgrade) else {
                        return;
                    };
                    let wrapper = ServiceWrapper { shared };
                    wrapper.shared.callbacks.handle_message(&wrapper, message);
                },
            )?
        };

        let shared = Arc::new(WrapperShared {
            key,
            registry,
            config,
            manager,
            callbacks,
            mailbox_loop,
            service: PublishedHandle::new(),
            worker_mailbox: RwLock::new(None),
            lifecycle: Mutex::new(Lifecycle {
                state: ConnectionState::Unbound,
                connection_id: None,
            }),
            callback_guard: ReentrantMutex::new(()),
        });
        let _ = owner.set(Arc::downgrade(&shared));
        let wrapper = ServiceWrapper { shared };

        wrapper.transition(ConnectionEvent::Request);
        let listener: Arc<dyn ConnectionListener<W::Payload>> = Arc::new(ConnectionBridge {
            shared: Arc::downgrade(&wrapper.shared),
        });

        match wrapper.shared.manager.request_connection(key, listener) {
            Ok(id) => {
                let released = {
                    let mut lifecycle = wrapper.shared.lifecycle.lock();
                    lifecycle.connection_id = Some(id);
                    lifecycle.state.is_terminal()
                };
                // Released from inside a callback before the id was known
                if released {
                    wrapper.shared.manager.release_connection(id);
                }
                debug!(worker_type = %key, connection_id = %id, "Connection requested");
                Ok(wrapper)
            }
            Err(err) => {
                warn!(worker_type = %key, error = %err, "Connection request rejected");
                wrapper.transition(ConnectionEvent::Release);
                wrapper.shared.service.close();
                wrapper.shared.mailbox_loop.shutdown();
                Err(err)
            }
        }
    }

    /// The bound worker instance; blocks until the connection is established.
    ///
    /// Fails with `HandleClosed` if the wrapper was released or disconnected
    /// before it ever connected.
    pub fn service(&self) -> Result<Arc<W>> {
        self.shared.service.get()
    }

    pub fn service_timeout(&self, timeout: Duration) -> Result<Arc<W>> {
        self.shared.service.get_timeout(timeout)
    }

    /// `service_timeout` bounded by the configured handle wait timeout
    pub fn service_default_timeout(&self) -> Result<Arc<W>> {
        self.shared
            .service
            .get_timeout(self.shared.config.handle_wait_timeout())
    }

    pub fn try_service(&self) -> Option<Arc<W>> {
        self.shared.service.try_get()
    }

    /// Wake threads blocked in `service()` with `InterruptedWait`
    pub fn abort_service_waiters(&self) {
        self.shared.service.abort_waiters();
    }

    /// The wrapper's own mailbox; hand it to the worker to receive messages
    pub fn mailbox(&self) -> Result<Mailbox<W::Payload>> {
        self.shared.mailbox_loop.mailbox()
    }

    /// The worker's mailbox while connected
    pub fn worker_mailbox(&self) -> Option<Mailbox<W::Payload>> {
        self.shared.worker_mailbox.read().clone()
    }

    /// Send `message` to the worker with `reply_to` set to this wrapper.
    ///
    /// Dropped silently while not connected.
    pub fn post(&self, message: Message<W::Payload>) {
        let Some(worker_mailbox) = self.worker_mailbox() else {
            trace!(worker_type = %self.shared.key, "Dropping message, wrapper not connected");
            return;
        };
        let message = match self.shared.mailbox_loop.try_mailbox() {
            Some(own) => message.with_reply_to(own),
            None => match self.mailbox() {
                Ok(own) => message.with_reply_to(own),
                Err(_) => message,
            },
        };
        worker_mailbox.post(message);
    }

    pub fn send(&self, payload: W::Payload) {
        self.post(Message::new(payload));
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lifecycle.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.shared.lifecycle.lock().connection_id
    }

    pub fn worker_key(&self) -> WorkerKey {
        self.shared.key
    }

    /// Whether the wrapper's own loop thread is still alive
    pub fn is_loop_running(&self) -> bool {
        self.shared.mailbox_loop.is_running()
    }

    /// Stop the wrapper's loop, then release the connection. Idempotent.
    pub fn release(&self) {
        let callbacks = self.shared.callback_guard.lock();
        let (from, connection_id) = {
            let mut lifecycle = self.shared.lifecycle.lock();
            let from = lifecycle.state;
            let Some(to) = from.transition(ConnectionEvent::Release) else {
                return;
            };
            lifecycle.state = to;
            (from, lifecycle.connection_id.take())
        };
        log_connection_operation(
            ConnectionEvent::Release.event_type(),
            self.shared.key.name(),
            connection_id.map(|id| id.to_string()).as_deref(),
            &from.to_string(),
            &ConnectionState::Released.to_string(),
        );

        self.shared.callbacks.on_release(self);

        // The loop stops taking work before the connection goes away
        self.shared.mailbox_loop.stop();
        if let Some(id) = connection_id {
            self.shared.manager.release_connection(id);
        }
        *self.shared.worker_mailbox.write() = None;
        self.shared.service.close();
        drop(callbacks);

        if self.shared.config.join_on_release {
            self.shared.mailbox_loop.join();
        }
    }

    /// Release and wait for the wrapper's loop thread to exit
    pub fn release_and_join(&self) {
        self.release();
        self.shared.mailbox_loop.join();
    }

    fn transition(&self, event: ConnectionEvent) -> Option<ConnectionState> {
        let (from, to) = {
            let mut lifecycle = self.shared.lifecycle.lock();
            let from = lifecycle.state;
            let to = from.transition(event)?;
            lifecycle.state = to;
            (from, to)
        };
        log_connection_operation(
            event.event_type(),
            self.shared.key.name(),
            None,
            &from.to_string(),
            &to.to_string(),
        );
        Some(to)
    }

    fn handle_connected(&self, mailbox: Mailbox<W::Payload>) {
        let _callbacks = self.shared.callback_guard.lock();
        let connection_id = {
            let mut lifecycle = self.shared.lifecycle.lock();
            if lifecycle.state != ConnectionState::Connecting {
                warn!(
                    worker_type = %self.shared.key,
                    state = %lifecycle.state,
                    "Ignoring connection confirmation"
                );
                return;
            }

            let Some(instance) = self.shared.registry.lookup::<W>() else {
                warn!(
                    worker_type = %self.shared.key,
                    "Connected but worker is not registered; staying in connecting state"
                );
                return;
            };

            // Order matters: handle, then mailbox, then state, then callbacks
            if let Err(err) = self.shared.service.set(instance) {
                warn!(worker_type = %self.shared.key, error = %err, "Service handle not published");
                return;
            }
            *self.shared.worker_mailbox.write() = Some(mailbox);
            lifecycle.state = ConnectionState::Connected;
            lifecycle.connection_id
        };

        log_connection_operation(
            ConnectionEvent::Connected.event_type(),
            self.shared.key.name(),
            connection_id.map(|id| id.to_string()).as_deref(),
            &ConnectionState::Connecting.to_string(),
            &ConnectionState::Connected.to_string(),
        );

        // A callback may release the wrapper; later callbacks are then skipped
        if self.is_connected() {
            self.shared.callbacks.do_registration(self);
        }
        if self.is_connected() {
            self.shared.callbacks.on_initialized(self);
        }
    }

    fn handle_disconnected(&self) {
        let _callbacks = self.shared.callback_guard.lock();
        if self.transition(ConnectionEvent::Disconnected).is_none() {
            return;
        }
        self.shared.callbacks.on_service_disconnected(self);
        *self.shared.worker_mailbox.write() = None;
        self.shared.service.close();
    }
}

impl<W: Worker> Clone for ServiceWrapper<W> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<W: Worker> fmt::Debug for ServiceWrapper<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceWrapper")
            .field("worker_type", &self.shared.key.name())
            .field("state", &self.state())
            .field("connection_id", &self.connection_id())
            .finish()
    }
}

/// Routes manager callbacks to a wrapper without keeping it alive
struct ConnectionBridge<W: Worker> {
    shared: Weak<WrapperShared<W>>,
}

impl<W: Worker> ConnectionListener<W::Payload> for ConnectionBridge<W> {
    fn on_connected(&self, mailbox: Mailbox<W::Payload>) {
        if let Some(shared) = self.shared.upgrade() {
            ServiceWrapper { shared }.handle_connected(mailbox);
        }
    }

    fn on_disconnected(&self) {
        if let Some(shared) = self.shared.upgrade() {
            ServiceWrapper { shared }.handle_disconnected();
        }
    }
}
