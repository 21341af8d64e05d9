//! Sample workers and wrapper callbacks shared by the integration tests

use courier_core::connection::{ServiceWrapper, WrapperCallbacks};
use courier_core::mailbox::Message;
use courier_core::worker::Worker;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Records every payload it receives and acknowledges it to `reply_to`
#[derive(Default)]
pub struct Recorder {
    received: Mutex<Vec<String>>,
    started: AtomicUsize,
    stopped: AtomicUsize,
}

impl Recorder {
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Worker for Recorder {
    type Payload = String;

    fn handle_message(&self, message: Message<String>) {
        self.received.lock().push(message.payload.clone());
        message.reply(format!("ack:{}", message.payload));
    }

    fn on_start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wrapper callbacks that log every hook in call order
#[derive(Default)]
pub struct RecordingClient {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| e.as_str() == event).count()
    }

    fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }
}

impl WrapperCallbacks<Recorder> for RecordingClient {
    fn handle_message(&self, _wrapper: &ServiceWrapper<Recorder>, message: Message<String>) {
        self.push(format!("reply:{}", message.payload));
    }

    fn do_registration(&self, wrapper: &ServiceWrapper<Recorder>) {
        // Handle and worker mailbox must already be usable here
        let handle_ready = wrapper.try_service().is_some();
        let mailbox_ready = wrapper.worker_mailbox().is_some();
        self.push(format!("registered:{handle_ready}:{mailbox_ready}"));
    }

    fn on_initialized(&self, _wrapper: &ServiceWrapper<Recorder>) {
        self.push("initialized");
    }

    fn on_service_disconnected(&self, _wrapper: &ServiceWrapper<Recorder>) {
        self.push("disconnected");
    }

    fn on_release(&self, _wrapper: &ServiceWrapper<Recorder>) {
        self.push("released");
    }
}
