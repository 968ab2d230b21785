//! Cross-instance notifications.
//!
//! Publishing is a latency optimization: an instance that misses a
//! notification still finds the work by querying the job queue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{JobId, UserKey};

/// Event broadcast to every scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// `user` has new pending work.
    Work {
        /// User with new work.
        user: UserKey,
    },
    /// Job `job_id` was cancelled; whichever instance runs it should stop.
    Cancel {
        /// Cancelled job.
        job_id: JobId,
    },
}

/// Best-effort, at-most-once notification channel.
#[async_trait]
pub trait JobPublisher: Send + Sync + 'static {
    /// Emit `event` to subscribed instances.
    async fn publish(&self, event: BatchEvent) -> Result<(), SchedulerError>;
}

/// Receiving side of a publisher.
#[async_trait]
pub trait EventSource: Send {
    /// Next notification, or `None` once the channel is closed.
    async fn next(&mut self) -> Option<Notification>;
}

/// What a subscriber observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// An event was delivered.
    Event(BatchEvent),
    /// Events were dropped; the consumer should rediscover pending work.
    Missed(u64),
}
