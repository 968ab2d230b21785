//! Publisher backends.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::core::{BatchEvent, EventSource, JobPublisher, Notification, SchedulerError};

/// In-process broadcast publisher. Every [`JobSubscriber`] created from it
/// (or from a clone) receives each event published after it subscribed.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<BatchEvent>,
}

impl BroadcastPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// New subscriber.
    pub fn subscribe(&self) -> JobSubscriber {
        JobSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

#[async_trait]
impl JobPublisher for BroadcastPublisher {
    async fn publish(&self, event: BatchEvent) -> Result<(), SchedulerError> {
        // No subscribers is not an error: nobody is listening right now and
        // discovery will pick the work up.
        if self.tx.send(event).is_err() {
            tracing::trace!("published event with no subscribers");
        }
        Ok(())
    }
}

/// Receiving end of a [`BroadcastPublisher`].
pub struct JobSubscriber {
    rx: broadcast::Receiver<BatchEvent>,
}

#[async_trait]
impl EventSource for JobSubscriber {
    async fn next(&mut self) -> Option<Notification> {
        match self.rx.recv().await {
            Ok(event) => Some(Notification::Event(event)),
            Err(broadcast::error::RecvError::Lagged(missed)) => Some(Notification::Missed(missed)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

/// Publisher that drops every event. Instances then rely on discovery alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl JobPublisher for NoopPublisher {
    async fn publish(&self, _event: BatchEvent) -> Result<(), SchedulerError> {
        Ok(())
    }
}
