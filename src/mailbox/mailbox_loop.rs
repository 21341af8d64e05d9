//! # Mailbox Loop
//!
//! A dedicated thread that owns a FIFO queue and a dispatch callback.
//!
//! The queue is created on the loop's own thread and its address is published
//! through a [`PublishedHandle`]. Anything that wants to send to the loop goes
//! through that handle, so no message can reach a queue that does not exist yet.
//!
//! ```text
//! start() ──spawn──→ loop thread
//!                      ├─ create channel
//!                      ├─ ready.set(mailbox)   ← readiness, exactly once
//!                      └─ recv → handler.handle(message) ... until Stop
//! post()  ──ready.get()──→ mailbox.post()
//! stop()  ──flag + Stop command (drains what was queued before it)
//! ```

use super::address::{LoopCommand, Mailbox};
use super::message::Message;
use crate::error::{CourierError, Result};
use crate::handle::PublishedHandle;
use crate::logging::log_mailbox_operation;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, warn};

/// Dispatch callback invoked on the loop thread for every dequeued message
pub trait MessageHandler<P>: Send + 'static {
    fn handle(&mut self, message: Message<P>);
}

impl<P, F> MessageHandler<P> for F
where
    F: FnMut(Message<P>) + Send + 'static,
{
    fn handle(&mut self, message: Message<P>) {
        self(message)
    }
}

/// A thread servicing one mailbox
pub struct MailboxLoop<P> {
    name: Arc<str>,
    ready: Arc<PublishedHandle<Mailbox<P>>>,
    stopping: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl<P: Send + 'static> MailboxLoop<P> {
    /// Spawn the loop thread and return without waiting for readiness
    pub fn start<H>(name: impl Into<String>, handler: H) -> Result<Self>
    where
        H: MessageHandler<P>,
    {
        let name: Arc<str> = Arc::from(name.into());
        let ready = Arc::new(PublishedHandle::new());
        let stopping = Arc::new(AtomicBool::new(false));

        let thread = {
            let loop_name = Arc::clone(&name);
            let ready = Arc::clone(&ready);
            let stopping = Arc::clone(&stopping);
            thread::Builder::new()
                .name(name.to_string())
                .spawn(move || run_loop(loop_name, ready, stopping, handler))
                .map_err(|err| CourierError::thread_spawn(name.to_string(), &err))?
        };

        debug!(loop_name = %name, "Mailbox loop started");

        Ok(Self {
            name,
            ready,
            stopping,
            thread_id: thread.thread().id(),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Enqueue a message, waiting for readiness first if needed.
    ///
    /// Best-effort: dropped silently once the loop is stopping.
    pub fn post(&self, message: Message<P>) {
        if self.stopping.load(Ordering::SeqCst) {
            return;
        }
        match self.ready.get() {
            Ok(mailbox) => mailbox.post(message),
            Err(err) => debug!(loop_name = %self.name, error = %err, "Dropping message, loop never became ready"),
        }
    }

    /// The loop's address; blocks until the loop is ready
    pub fn mailbox(&self) -> Result<Mailbox<P>> {
        self.ready.get()
    }

    /// The loop's address, waiting at most `timeout` for readiness
    pub fn mailbox_timeout(&self, timeout: Duration) -> Result<Mailbox<P>> {
        self.ready.get_timeout(timeout)
    }

    /// The loop's address if it is already published
    pub fn try_mailbox(&self) -> Option<Mailbox<P>> {
        self.ready.try_get()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_published()
    }
}

impl<P> MailboxLoop<P> {
    /// Ask the loop to drain already-queued messages and exit.
    ///
    /// Idempotent, callable from any thread, never waits for the thread.
    pub fn stop(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        // Not published yet: the loop thread sees the flag right after publishing
        if let Some(mailbox) = self.ready.try_get() {
            mailbox.push_stop();
        }
        log_mailbox_operation("stop", &self.name, "requested", None);
    }

    /// Block until the loop thread has exited.
    ///
    /// No-op from the loop's own thread or once the thread has been joined.
    pub fn join(&self) {
        if thread::current().id() == self.thread_id {
            warn!(loop_name = %self.name, "Refusing to join mailbox loop from its own thread");
            return;
        }
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(loop_name = %self.name, "Mailbox loop thread panicked");
            }
        }
    }

    /// Stop the loop and wait for its thread to exit
    pub fn shutdown(&self) {
        self.stop();
        self.join();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Whether the loop thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Whether the caller is running on this loop's thread
    pub fn is_loop_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl<P> Drop for MailboxLoop<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<P> fmt::Debug for MailboxLoop<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxLoop")
            .field("name", &self.name)
            .field("ready", &self.ready.is_published())
            .field("stopping", &self.is_stopping())
            .finish()
    }
}

fn run_loop<P, H>(
    name: Arc<str>,
    ready: Arc<PublishedHandle<Mailbox<P>>>,
    stopping: Arc<AtomicBool>,
    mut handler: H,
) where
    H: MessageHandler<P>,
{
    let (sender, receiver) = crossbeam::channel::unbounded();
    let mailbox = Mailbox::new(sender, Arc::clone(&stopping), Arc::clone(&name));

    // This thread is the handle's only writer
    let _ = ready.set(mailbox.clone());
    log_mailbox_operation("ready", &name, "published", None);

    if stopping.load(Ordering::SeqCst) {
        mailbox.push_stop();
    }
    drop(ready);
    drop(mailbox);

    let mut dispatched: u64 = 0;
    for command in receiver.iter() {
        match command {
            LoopCommand::Deliver(message) => {
                handler.handle(message);
                dispatched += 1;
            }
            LoopCommand::Stop => break,
        }
    }

    debug!(loop_name = %name, dispatched = dispatched, "Mailbox loop exited");
}
