//! # Published Handle
//!
//! A write-once slot for handing a value produced on one thread to any number
//! of readers on other threads.
//!
//! The slot and the condition variable share one mutex, so checking for the
//! value and going to sleep is a single atomic step with respect to `set`:
//! a reader either sees the value or is parked before the writer notifies.
//!
//! ```rust
//! use courier_core::handle::PublishedHandle;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let handle = Arc::new(PublishedHandle::new());
//! let reader = {
//!     let handle = Arc::clone(&handle);
//!     thread::spawn(move || handle.get())
//! };
//! handle.set(42_u32).unwrap();
//! assert_eq!(reader.join().unwrap().unwrap(), 42);
//! ```

use crate::error::{CourierError, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::time::{Duration, Instant};

struct Slot<T> {
    value: Option<T>,
    /// Bumped by `abort_waiters`; a waiter aborts when it observes a change
    abort_epoch: u64,
    closed: bool,
}

/// Write-once, multi-reader value slot with blocking reads
pub struct PublishedHandle<T> {
    slot: Mutex<Slot<T>>,
    published: Condvar,
}

impl<T: Clone> PublishedHandle<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                abort_epoch: 0,
                closed: false,
            }),
            published: Condvar::new(),
        }
    }

    /// Publish the value and wake every waiter.
    ///
    /// Only the first call succeeds; later calls leave the first value in place.
    pub fn set(&self, value: T) -> Result<()> {
        let mut slot = self.slot.lock();
        if slot.value.is_some() {
            return Err(CourierError::AlreadyPublished);
        }
        if slot.closed {
            return Err(CourierError::HandleClosed);
        }
        slot.value = Some(value);
        self.published.notify_all();
        Ok(())
    }

    /// Block until the value is published
    pub fn get(&self) -> Result<T> {
        let mut slot = self.slot.lock();
        let epoch = slot.abort_epoch;
        loop {
            if let Some(value) = slot.value.as_ref() {
                return Ok(value.clone());
            }
            if slot.closed {
                return Err(CourierError::HandleClosed);
            }
            if slot.abort_epoch != epoch {
                return Err(CourierError::interrupted("published handle wait aborted"));
            }
            self.published.wait(&mut slot);
        }
    }

    /// Block until the value is published or `timeout` elapses.
    ///
    /// A timeout too large to express as a deadline waits like `get`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        let mut slot = self.slot.lock();
        if let Some(value) = slot.value.as_ref() {
            return Ok(value.clone());
        }
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            drop(slot);
            return self.get();
        };
        let epoch = slot.abort_epoch;
        loop {
            if let Some(value) = slot.value.as_ref() {
                return Ok(value.clone());
            }
            if slot.closed {
                return Err(CourierError::HandleClosed);
            }
            if slot.abort_epoch != epoch {
                return Err(CourierError::interrupted("published handle wait aborted"));
            }
            if self.published.wait_until(&mut slot, deadline).timed_out() {
                return match slot.value.as_ref() {
                    Some(value) => Ok(value.clone()),
                    None => Err(CourierError::timeout(
                        "published handle wait",
                        u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    )),
                };
            }
        }
    }

    /// Return the value if it has been published, without blocking
    pub fn try_get(&self) -> Option<T> {
        self.slot.lock().value.clone()
    }

    pub fn is_published(&self) -> bool {
        self.slot.lock().value.is_some()
    }

    /// Wake every thread currently blocked in `get`/`get_timeout` with
    /// `InterruptedWait`. Readers arriving afterwards wait as usual.
    pub fn abort_waiters(&self) {
        let mut slot = self.slot.lock();
        slot.abort_epoch = slot.abort_epoch.wrapping_add(1);
        self.published.notify_all();
    }

    /// Give up on the handle ever being published.
    ///
    /// Current and future waiters get `HandleClosed` and later `set` calls
    /// are rejected. A handle that is already published keeps its value.
    pub fn close(&self) {
        let mut slot = self.slot.lock();
        if slot.value.is_none() {
            slot.closed = true;
            self.published.notify_all();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }
}

impl<T: Clone> Default for PublishedHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PublishedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishedHandle")
            .field("published", &self.slot.lock().value.is_some())
            .finish_non_exhaustive()
    }
}
