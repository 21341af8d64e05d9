//! # Message Envelope
//!
//! Opaque payloads travel between mailbox loops inside a `Message`, which adds
//! the routing metadata the core needs: a correlation id and an optional
//! reply-to mailbox.

use super::address::Mailbox;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Opaque payload plus routing metadata
pub struct Message<P> {
    /// The application payload; never inspected by the core
    pub payload: P,
    /// Where replies should go, stamped by wrappers when sending to a worker
    pub reply_to: Option<Mailbox<P>>,
    /// Message metadata
    pub metadata: MessageMetadata,
}

/// Metadata for messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMetadata {
    /// Unique message id for tracing
    pub message_id: Uuid,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self {
            message_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}

impl<P> Message<P> {
    /// Create a new message with no reply-to address
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            reply_to: None,
            metadata: MessageMetadata::default(),
        }
    }

    /// Attach a reply-to address
    pub fn with_reply_to(mut self, reply_to: Mailbox<P>) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    pub fn message_id(&self) -> Uuid {
        self.metadata.message_id
    }

    /// Post `payload` to this message's reply-to mailbox.
    ///
    /// Returns false when the message carries no reply-to address. Delivery
    /// itself is best-effort, like every other post.
    pub fn reply(&self, payload: P) -> bool {
        match &self.reply_to {
            Some(reply_to) => {
                reply_to.post(Message::new(payload));
                true
            }
            None => false,
        }
    }

    /// Consume the message, returning only its payload
    pub fn into_payload(self) -> P {
        self.payload
    }
}

impl<P: fmt::Debug> fmt::Debug for Message<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("payload", &self.payload)
            .field("reply_to", &self.reply_to)
            .field("message_id", &self.metadata.message_id)
            .finish()
    }
}
