//! # Instance Registry
//!
//! Concurrent map from a worker's type to its single live instance.
//!
//! ## Overview
//!
//! Workers register themselves when they start; wrappers look them up once a
//! connection is confirmed. Registration is last-writer-wins, which models a
//! worker restarting and re-registering. Lookups never block.
//!
//! The registry is an ordinary value: tests and embedders create their own,
//! while [`InstanceRegistry::global`] provides a lazily created process-wide one.
//!
//! ## Usage
//!
//! ```rust
//! use courier_core::registry::InstanceRegistry;
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! let registry = InstanceRegistry::new();
//! assert!(registry.lookup::<Clock>().is_none());
//!
//! registry.register(Arc::new(Clock));
//! assert!(registry.lookup::<Clock>().is_some());
//! ```

use crate::logging::log_registry_operation;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Type identifier for a worker
#[derive(Debug, Clone, Copy)]
pub struct WorkerKey {
    type_id: TypeId,
    name: &'static str,
}

impl WorkerKey {
    /// Key for the worker type `W`
    pub fn of<W: Any>() -> Self {
        Self {
            type_id: TypeId::of::<W>(),
            name: std::any::type_name::<W>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name, for logging
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for WorkerKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for WorkerKey {}

impl Hash for WorkerKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for WorkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type Instance = Arc<dyn Any + Send + Sync>;

/// Registry statistics
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub total_instances: usize,
    pub worker_types: Vec<&'static str>,
}

/// Thread-safe map from worker type to live instance; clones share the map
#[derive(Clone, Default)]
pub struct InstanceRegistry {
    instances: Arc<DashMap<WorkerKey, Instance>>,
}

static GLOBAL_REGISTRY: OnceLock<InstanceRegistry> = OnceLock::new();

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> &'static InstanceRegistry {
        GLOBAL_REGISTRY.get_or_init(InstanceRegistry::new)
    }

    /// Associate `W` with `instance`, replacing any previous instance.
    ///
    /// Returns true when an earlier registration was superseded.
    pub fn register<W>(&self, instance: Arc<W>) -> bool
    where
        W: Any + Send + Sync,
    {
        self.register_instance(WorkerKey::of::<W>(), instance)
    }

    /// Untyped registration; `instance` must be of the type `key` names
    pub fn register_instance(&self, key: WorkerKey, instance: Instance) -> bool {
        let replaced = self.instances.insert(key, instance).is_some();
        log_registry_operation(
            "register",
            key.name(),
            if replaced { "replaced" } else { "registered" },
        );
        replaced
    }

    /// The currently registered instance of `W`, if any
    pub fn lookup<W>(&self) -> Option<Arc<W>>
    where
        W: Any + Send + Sync,
    {
        self.lookup_instance(&WorkerKey::of::<W>())
            .and_then(|instance| instance.downcast::<W>().ok())
    }

    /// Untyped lookup
    pub fn lookup_instance(&self, key: &WorkerKey) -> Option<Instance> {
        // Clone out of the shard guard before returning
        self.instances.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove the entry for `W` only if it still points at `instance`.
    ///
    /// A worker that restarted and re-registered is left untouched.
    pub fn deregister<W>(&self, instance: &Arc<W>) -> bool
    where
        W: Any + Send + Sync,
    {
        let key = WorkerKey::of::<W>();
        let target = Arc::as_ptr(instance) as *const ();
        let removed = self
            .instances
            .remove_if(&key, |_, current| Arc::as_ptr(current) as *const () == target)
            .is_some();
        log_registry_operation(
            "deregister",
            key.name(),
            if removed { "removed" } else { "superseded" },
        );
        removed
    }

    pub fn contains(&self, key: &WorkerKey) -> bool {
        self.instances.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let mut worker_types: Vec<&'static str> =
            self.instances.iter().map(|entry| entry.key().name()).collect();
        worker_types.sort_unstable();
        RegistryStats {
            total_instances: worker_types.len(),
            worker_types,
        }
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.instances.len())
            .finish()
    }
}
