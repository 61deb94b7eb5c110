//! In-process event queue shared by every trigger.
//!
//! Fan-out is best effort: each subscriber gets its own copy of every event
//! published after it subscribed, and subscribers that have gone away are
//! pruned on the next publish.

use std::sync::{Mutex, mpsc};
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::event::Event;

/// A subscription to the queue.
///
/// Meant for a single consuming thread; hand events on through a channel if
/// more consumers are needed.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<Event>,
}

impl Subscription {
    fn new(receiver: mpsc::Receiver<Event>) -> Self {
        Self { receiver }
    }

    /// Block until the next event is available.
    pub fn recv(&self) -> Result<Event, mpsc::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<Event, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Event, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

#[derive(Debug, Default)]
pub struct Queue {
    subscribers: Mutex<Vec<mpsc::Sender<Event>>>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to every live subscriber.
    pub fn publish(&self, event: Event) -> CoreResult<()> {
        let mut subs = self.subscribers.lock().map_err(|_| CoreError::QueuePoisoned)?;

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(event.clone()).is_ok());

        tracing::debug!(event_id = %event.id, tag = %event.tag, subscribers = subs.len(), "event published");
        Ok(())
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still hands out a subscription; it just never
        // receives anything.
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => tracing::warn!("queue lock poisoned; subscription will stay empty"),
        }

        Subscription::new(rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}
