//! Batch job records and their status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::{JobId, UserKey};

/// Status of a job in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Persisted and queued, not yet picked up.
    Pending,
    /// Picked up by a dispatch and executing.
    Running,
    /// Finished successfully.
    Done,
    /// Finished with an error or timed out.
    Failed,
    /// Cancelled before or during execution.
    Cancelled,
}

impl JobStatus {
    /// Terminal states never change again.
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Cancelled)
                | (Self::Running, Self::Done | Self::Failed | Self::Cancelled)
        )
    }

    /// Stable lowercase name, as persisted.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-submitted batch job.
///
/// The scheduler never looks inside a job; only the queue, store and backend do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier.
    pub id: JobId,
    /// Owning user.
    pub user: UserKey,
    /// Opaque payload handed to the query executor.
    pub query: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Failure or cancellation detail.
    pub failed_reason: Option<String>,
    /// Creation time in milliseconds since epoch.
    pub created_at_ms: u128,
    /// Last status change in milliseconds since epoch.
    pub updated_at_ms: u128,
}

impl Job {
    /// New pending job for `user`.
    pub fn new(user: UserKey, query: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: JobId::new(),
            user,
            query: query.into(),
            status: JobStatus::Pending,
            failed_reason: None,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }
}
