use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::OutboundMessage;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Per-observer queue depth. A full queue counts as a failed send.
pub const OBSERVER_QUEUE_DEPTH: usize = 64;

type Observers = HashMap<Uuid, mpsc::Sender<String>>;

/// Connected observers keyed by sender id.
///
/// Sends never block: a handle whose queue is full or whose receiver has gone is
/// dropped on the spot, and the observer only sees future messages if it reconnects.
#[derive(Clone, Default)]
pub struct ObserverHub {
    observers: Arc<Mutex<Observers>>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Observers> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a new observer and returns the receiving end of its queue.
    pub fn register(&self, id: Uuid) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(OBSERVER_QUEUE_DEPTH);
        let count = {
            let mut observers = self.lock();
            observers.insert(id, tx);
            observers.len()
        };
        log_info!("observer {} connected ({} total)", id, count);
        rx
    }

    pub fn unregister(&self, id: &Uuid) {
        if self.lock().remove(id).is_some() {
            log_info!("observer {} disconnected", id);
        }
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Sends to one observer. Returns whether the message was queued.
    pub fn send_to(&self, id: &Uuid, message: &OutboundMessage) -> bool {
        let Some(text) = encode(message) else {
            return false;
        };

        let mut observers = self.lock();
        let Some(tx) = observers.get(id) else {
            return false;
        };
        if tx.try_send(text).is_err() {
            observers.remove(id);
            log_debug!("dropped observer {} after failed send", id);
            return false;
        }
        true
    }

    /// Sends to every observer. Returns how many accepted the message.
    pub fn notify(&self, message: &OutboundMessage) -> usize {
        let Some(text) = encode(message) else {
            return 0;
        };

        let mut observers = self.lock();
        let mut dead = Vec::new();
        for (id, tx) in observers.iter() {
            if tx.try_send(text.clone()).is_err() {
                dead.push(*id);
            }
        }
        for id in &dead {
            observers.remove(id);
            log_debug!("dropped observer {} after failed send", id);
        }
        observers.len()
    }
}

fn encode(message: &OutboundMessage) -> Option<String> {
    match message.to_json() {
        Ok(text) => Some(text),
        Err(err) => {
            log_error!("failed to encode outbound message: {err}");
            None
        }
    }
}
