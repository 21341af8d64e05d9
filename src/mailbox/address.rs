//! # Mailbox Address
//!
//! The sending half of a mailbox loop. Addresses are cheap to clone and can be
//! shared with any thread once the owning loop has published them.

use super::message::Message;
use crossbeam::channel::Sender;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Commands consumed by a mailbox loop thread
pub(crate) enum LoopCommand<P> {
    Deliver(Message<P>),
    Stop,
}

/// Address used to enqueue messages onto a mailbox loop
pub struct Mailbox<P> {
    sender: Sender<LoopCommand<P>>,
    stopping: Arc<AtomicBool>,
    loop_name: Arc<str>,
}

impl<P> Mailbox<P> {
    pub(crate) fn new(
        sender: Sender<LoopCommand<P>>,
        stopping: Arc<AtomicBool>,
        loop_name: Arc<str>,
    ) -> Self {
        Self {
            sender,
            stopping,
            loop_name,
        }
    }

    /// Enqueue a message for dispatch on the owning loop's thread.
    ///
    /// Best-effort: if the loop is stopping or gone the message is dropped and
    /// the sender is not told.
    pub fn post(&self, message: Message<P>) {
        if self.stopping.load(Ordering::SeqCst) {
            trace!(
                loop_name = %self.loop_name,
                message_id = %message.message_id(),
                "Dropping message for stopping mailbox loop"
            );
            return;
        }
        if let Err(err) = self.sender.send(LoopCommand::Deliver(message)) {
            if let LoopCommand::Deliver(message) = err.into_inner() {
                trace!(
                    loop_name = %self.loop_name,
                    message_id = %message.message_id(),
                    "Dropping message for closed mailbox"
                );
            }
        }
    }

    /// Wrap `payload` in a message with no reply-to and post it
    pub fn send(&self, payload: P) {
        self.post(Message::new(payload));
    }

    /// Whether the owning loop has been asked to stop
    pub fn is_closed(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub fn loop_name(&self) -> &str {
        &self.loop_name
    }

    /// Whether both addresses point at the same mailbox loop
    pub fn same_mailbox(&self, other: &Mailbox<P>) -> bool {
        Arc::ptr_eq(&self.stopping, &other.stopping)
    }

    /// Enqueue the stop command, bypassing the stopping check
    pub(crate) fn push_stop(&self) {
        let _ = self.sender.send(LoopCommand::Stop);
    }
}

impl<P> Clone for Mailbox<P> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            stopping: Arc::clone(&self.stopping),
            loop_name: Arc::clone(&self.loop_name),
        }
    }
}

impl<P> fmt::Debug for Mailbox<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("loop_name", &self.loop_name)
            .field("closed", &self.is_closed())
            .finish()
    }
}
