//! # In-Process Connection Manager
//!
//! [`LocalConnectionManager`] stands in for a platform component manager.
//! Workers are either published while running or registered with a launcher
//! that starts them on first connect. Connection confirmations are delivered
//! from a short-lived dispatch thread once the worker's mailbox is ready.
//!
//! ```text
//! request_connection(key) ──unknown key──→ Err(BindFailure)
//!          │
//!          ├─ record connection, return id
//!          └─ spawn dispatch thread
//!                ├─ binding for key (launch if needed)
//!                ├─ binding.bind(readiness timeout)   ← waits for worker loop
//!                └─ listener.on_connected(mailbox)    ← unless released meanwhile
//! ```
//!
//! A worker that cannot be started, or whose mailbox never becomes ready,
//! ends the connection with `on_disconnected` instead.

use crate::config::CourierConfig;
use crate::connection::{ConnectionId, ConnectionListener, ConnectionManager, ServiceBinding};
use crate::error::{CourierError, Result};
use crate::registry::{InstanceRegistry, WorkerKey};
use crate::worker::{Worker, WorkerHost};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

type Launcher<P> = Arc<dyn Fn() -> Result<Arc<dyn ServiceBinding<P>>> + Send + Sync>;

struct ConnectionRecord<P> {
    target: WorkerKey,
    listener: Arc<dyn ConnectionListener<P>>,
    connected: bool,
}

struct ManagerInner<P> {
    config: CourierConfig,
    bindings: DashMap<WorkerKey, Arc<dyn ServiceBinding<P>>>,
    launchers: DashMap<WorkerKey, Launcher<P>>,
    connections: DashMap<ConnectionId, ConnectionRecord<P>>,
    /// Serializes launches so a worker type is started at most once
    launch_lock: Mutex<()>,
}

/// In-process implementation of [`ConnectionManager`]
pub struct LocalConnectionManager<P> {
    inner: Arc<ManagerInner<P>>,
}

impl<P: Send + 'static> LocalConnectionManager<P> {
    pub fn new(config: CourierConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                bindings: DashMap::new(),
                launchers: DashMap::new(),
                connections: DashMap::new(),
                launch_lock: Mutex::new(()),
            }),
        }
    }

    /// Make a running worker available for binding
    pub fn publish<B>(&self, binding: Arc<B>)
    where
        B: ServiceBinding<P> + 'static,
    {
        let key = binding.key();
        self.inner.bindings.insert(key, binding);
        info!(worker_type = %key, "Worker published for binding");
    }

    /// Start the worker behind `key` on first connect
    pub fn register_launcher<F>(&self, key: WorkerKey, launcher: F)
    where
        F: Fn() -> Result<Arc<dyn ServiceBinding<P>>> + Send + Sync + 'static,
    {
        self.inner.launchers.insert(key, Arc::new(launcher));
        debug!(worker_type = %key, "Launcher registered");
    }

    /// Register a factory for `W`; the worker is built and hosted on first connect
    pub fn register_worker<W, F>(&self, registry: InstanceRegistry, factory: F)
    where
        W: Worker<Payload = P>,
        F: Fn() -> W + Send + Sync + 'static,
    {
        let config = self.inner.config.clone();
        self.register_launcher(WorkerKey::of::<W>(), move || {
            let host = WorkerHost::start(Arc::new(factory()), registry.clone(), &config)?;
            Ok(host as Arc<dyn ServiceBinding<P>>)
        });
    }

    /// Shut the worker down and notify every connection bound to it.
    ///
    /// Returns false when no running worker is known for `key`.
    pub fn terminate(&self, key: WorkerKey) -> bool {
        let Some((_, binding)) = self.inner.bindings.remove(&key) else {
            return false;
        };
        binding.terminate();

        let listeners: Vec<Arc<dyn ConnectionListener<P>>> = self
            .inner
            .connections
            .iter()
            .filter(|record| record.target == key)
            .map(|record| Arc::clone(&record.listener))
            .collect();
        info!(worker_type = %key, connections = listeners.len(), "Worker terminated");

        for listener in listeners {
            listener.on_disconnected();
        }
        binding.join();
        true
    }

    /// Terminate every running worker
    pub fn shutdown(&self) {
        let keys: Vec<WorkerKey> = self.inner.bindings.iter().map(|entry| *entry.key()).collect();
        for key in keys {
            self.terminate(key);
        }
    }

    /// Live connections to `key`
    pub fn connection_count(&self, key: WorkerKey) -> usize {
        self.inner
            .connections
            .iter()
            .filter(|record| record.target == key)
            .count()
    }

    /// Live connections that have seen `on_connected`
    pub fn connected_count(&self, key: WorkerKey) -> usize {
        self.inner
            .connections
            .iter()
            .filter(|record| record.target == key && record.connected)
            .count()
    }

    pub fn is_running(&self, key: WorkerKey) -> bool {
        self.inner.bindings.contains_key(&key)
    }
}

impl<P: Send + 'static> ManagerInner<P> {
    fn binding_for(&self, key: WorkerKey) -> Result<Arc<dyn ServiceBinding<P>>> {
        if let Some(binding) = self.bindings.get(&key) {
            return Ok(Arc::clone(binding.value()));
        }

        let _guard = self.launch_lock.lock();
        if let Some(binding) = self.bindings.get(&key) {
            return Ok(Arc::clone(binding.value()));
        }
        let launcher = self
            .launchers
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CourierError::bind_failure(key.name()))?;

        let binding = launcher()?;
        self.bindings.insert(key, Arc::clone(&binding));
        info!(worker_type = %key, "Worker launched on connect");
        Ok(binding)
    }

    fn dispatch(&self, id: ConnectionId) {
        let Some(target) = self.connections.get(&id).map(|record| record.target) else {
            debug!(connection_id = %id, "Connection released before dispatch");
            return;
        };

        let binding = match self.binding_for(target) {
            Ok(binding) => binding,
            Err(err) => {
                error!(connection_id = %id, worker_type = %target, error = %err, "Worker could not be started");
                self.abandon(id);
                return;
            }
        };

        let mailbox = match binding.bind(self.config.readiness_timeout()) {
            Ok(mailbox) => mailbox,
            Err(err) => {
                error!(connection_id = %id, worker_type = %target, error = %err, "Worker mailbox never became ready");
                self.abandon(id);
                return;
            }
        };

        // Clone the listener out so the callback runs without a map guard held
        let listener = match self.connections.get_mut(&id) {
            Some(mut record) => {
                record.connected = true;
                Arc::clone(&record.listener)
            }
            None => {
                debug!(connection_id = %id, "Connection released while binding");
                return;
            }
        };
        listener.on_connected(mailbox);
    }

    /// Drop a connection that can never complete and tell its listener
    fn abandon(&self, id: ConnectionId) {
        if let Some((_, record)) = self.connections.remove(&id) {
            record.listener.on_disconnected();
        }
    }
}

impl<P: Send + 'static> ConnectionManager<P> for LocalConnectionManager<P> {
    fn request_connection(
        &self,
        target: WorkerKey,
        listener: Arc<dyn ConnectionListener<P>>,
    ) -> Result<ConnectionId> {
        if !self.inner.bindings.contains_key(&target) && !self.inner.launchers.contains_key(&target) {
            return Err(CourierError::bind_failure(target.name()));
        }

        let id = ConnectionId::new();
        self.inner.connections.insert(
            id,
            ConnectionRecord {
                target,
                listener,
                connected: false,
            },
        );

        let inner = Arc::clone(&self.inner);
        let thread_name = self.inner.config.thread_name("connect");
        if let Err(err) = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || inner.dispatch(id))
        {
            self.inner.connections.remove(&id);
            return Err(CourierError::thread_spawn(thread_name, &err));
        }

        debug!(connection_id = %id, worker_type = %target, "Connection granted");
        Ok(id)
    }

    fn release_connection(&self, id: ConnectionId) {
        if let Some((_, record)) = self.inner.connections.remove(&id) {
            debug!(connection_id = %id, worker_type = %record.target, "Connection released");
        }
    }
}

impl<P> fmt::Debug for LocalConnectionManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConnectionManager")
            .field("bindings", &self.inner.bindings.len())
            .field("launchers", &self.inner.launchers.len())
            .field("connections", &self.inner.connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::{Mailbox, Message};
    use crossbeam::channel::{self, Receiver, Sender};
    use std::time::Duration;

    struct Beacon;

    impl Worker for Beacon {
        type Payload = &'static str;

        fn handle_message(&self, message: Message<&'static str>) {
            message.reply("pong");
        }
    }

    enum Event {
        Connected(Mailbox<&'static str>),
        Disconnected,
    }

    struct ChannelListener(Sender<Event>);

    impl ConnectionListener<&'static str> for ChannelListener {
        fn on_connected(&self, mailbox: Mailbox<&'static str>) {
            let _ = self.0.send(Event::Connected(mailbox));
        }

        fn on_disconnected(&self) {
            let _ = self.0.send(Event::Disconnected);
        }
    }

    fn listener() -> (Arc<dyn ConnectionListener<&'static str>>, Receiver<Event>) {
        let (tx, rx) = channel::unbounded();
        (Arc::new(ChannelListener(tx)), rx)
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let manager = LocalConnectionManager::new(CourierConfig::default());
        let (listener, _rx) = listener();
        let err = manager
            .request_connection(WorkerKey::of::<Beacon>(), listener)
            .unwrap_err();
        assert!(matches!(err, CourierError::BindFailure { .. }));
    }

    #[test]
    fn test_published_worker_connects() {
        let config = CourierConfig::default();
        let registry = InstanceRegistry::new();
        let manager = LocalConnectionManager::new(config.clone());
        manager.publish(WorkerHost::start(Arc::new(Beacon), registry, &config).unwrap());

        let (listener, rx) = listener();
        let id = manager.request_connection(WorkerKey::of::<Beacon>(), listener).unwrap();
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            Event::Connected(mailbox) => assert!(!mailbox.is_closed()),
            Event::Disconnected => panic!("unexpected disconnect"),
        }
        assert_eq!(manager.connected_count(WorkerKey::of::<Beacon>()), 1);

        manager.release_connection(id);
        assert_eq!(manager.connection_count(WorkerKey::of::<Beacon>()), 0);
        manager.shutdown();
    }

    #[test]
    fn test_launcher_starts_worker_once() {
        let registry = InstanceRegistry::new();
        let manager = LocalConnectionManager::new(CourierConfig::default());
        manager.register_worker(registry.clone(), || Beacon);
        assert!(!manager.is_running(WorkerKey::of::<Beacon>()));

        let receivers: Vec<_> = (0..4)
            .map(|_| {
                let (listener, rx) = listener();
                manager.request_connection(WorkerKey::of::<Beacon>(), listener).unwrap();
                rx
            })
            .collect();
        for rx in receivers {
            assert!(matches!(
                rx.recv_timeout(Duration::from_secs(5)).unwrap(),
                Event::Connected(_)
            ));
        }

        assert!(manager.is_running(WorkerKey::of::<Beacon>()));
        assert!(registry.lookup::<Beacon>().is_some());
        manager.shutdown();
        assert!(registry.lookup::<Beacon>().is_none());
    }

    #[test]
    fn test_failed_launch_disconnects_listener() {
        let manager = LocalConnectionManager::<&'static str>::new(CourierConfig::default());
        manager.register_launcher(WorkerKey::of::<Beacon>(), || {
            Err(CourierError::configuration("beacon unavailable"))
        });

        let (listener, rx) = listener();
        manager.request_connection(WorkerKey::of::<Beacon>(), listener).unwrap();
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Event::Disconnected
        ));
        assert_eq!(manager.connection_count(WorkerKey::of::<Beacon>()), 0);
        assert!(!manager.is_running(WorkerKey::of::<Beacon>()));
    }

    #[test]
    fn test_terminate_notifies_connections() {
        let config = CourierConfig::default();
        let manager = LocalConnectionManager::new(config.clone());
        manager.publish(WorkerHost::start(Arc::new(Beacon), InstanceRegistry::new(), &config).unwrap());

        let (listener, rx) = listener();
        manager.request_connection(WorkerKey::of::<Beacon>(), listener).unwrap();
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Event::Connected(_)
        ));

        assert!(manager.terminate(WorkerKey::of::<Beacon>()));
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Event::Disconnected
        ));
        assert!(!manager.terminate(WorkerKey::of::<Beacon>()));
    }
}
