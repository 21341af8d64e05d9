//! # Release Groups
//!
//! A client that owns several wrappers adopts them into a [`ReleaseGroup`]
//! and releases them all in one place when it is torn down.
//!
//! ```rust,no_run
//! use courier_core::scope::{Releasable, ReleaseGroup};
//!
//! struct Session;
//!
//! impl Releasable for Session {
//!     fn release(&self) {}
//! }
//!
//! let mut group = ReleaseGroup::new("settings-screen");
//! let session = group.adopt(Session);
//! // ... use session ...
//! group.release_all();
//! ```

use crate::connection::ServiceWrapper;
use crate::worker::Worker;
use std::sync::Arc;
use tracing::debug;

/// A resource that must be released explicitly
pub trait Releasable: Send + Sync {
    /// Release the resource. Must be idempotent.
    fn release(&self);
}

impl<W: Worker> Releasable for ServiceWrapper<W> {
    fn release(&self) {
        ServiceWrapper::release(self);
    }
}

/// Explicit collection of owned resources, released together
pub struct ReleaseGroup {
    name: String,
    resources: Vec<Arc<dyn Releasable>>,
    released: bool,
}

impl ReleaseGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            released: false,
        }
    }

    /// Take ownership of `resource` and return a shared handle to it
    pub fn adopt<R>(&mut self, resource: R) -> Arc<R>
    where
        R: Releasable + 'static,
    {
        let resource = Arc::new(resource);
        self.resources.push(Arc::clone(&resource) as Arc<dyn Releasable>);
        resource
    }

    /// Track an already shared resource
    pub fn track(&mut self, resource: Arc<dyn Releasable>) {
        self.resources.push(resource);
    }

    /// Release every resource, most recently adopted first. Runs once.
    pub fn release_all(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        debug!(group = %self.name, resources = self.resources.len(), "Releasing resource group");
        while let Some(resource) = self.resources.pop() {
            resource.release();
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ReleaseGroup {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Named {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Releasable for Named {
        fn release(&self) {
            self.log.lock().push(self.name);
        }
    }

    #[test]
    fn test_release_in_reverse_order_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut group = ReleaseGroup::new("test");
        group.adopt(Named { name: "first", log: Arc::clone(&log) });
        group.adopt(Named { name: "second", log: Arc::clone(&log) });
        assert_eq!(group.len(), 2);

        group.release_all();
        group.release_all();
        assert_eq!(*log.lock(), vec!["second", "first"]);
        assert!(group.is_released());
    }

    #[test]
    fn test_drop_releases() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let mut group = ReleaseGroup::new("scoped");
            let named = group.adopt(Named { name: "only", log: Arc::clone(&log) });
            assert_eq!(named.name, "only");
        }
        assert_eq!(*log.lock(), vec!["only"]);
    }
}
