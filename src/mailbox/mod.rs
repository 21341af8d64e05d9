//! # Mailbox Infrastructure
//!
//! Thread-per-mailbox message loops with a startup barrier.
//!
//! ## Overview
//!
//! Every worker and every wrapper owns one [`MailboxLoop`]: a dedicated thread
//! with a FIFO queue and a dispatch callback. The loop creates its queue on its
//! own thread and only then publishes its [`Mailbox`] address, so a sender can
//! never observe a half-built queue.
//!
//! ## Guarantees
//!
//! - Messages from one sender to one mailbox are dispatched in send order
//! - Dispatch is strictly one-at-a-time on the loop thread
//! - Delivery is best-effort: posts to a stopped loop are dropped silently
//!
//! ## Usage
//!
//! ```rust
//! use courier_core::mailbox::{MailboxLoop, Message};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let echo = MailboxLoop::start("echo", |message: Message<String>| {
//!     message.reply(message.payload.to_uppercase());
//! })?;
//!
//! echo.post(Message::new("hello".to_string()));
//! echo.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod mailbox_loop;
pub mod message;

pub use address::Mailbox;
pub use mailbox_loop::{MailboxLoop, MessageHandler};
pub use message::{Message, MessageMetadata};
