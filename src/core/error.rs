//! Error types for scheduler and job lifecycle operations.

use thiserror::Error;

use crate::core::job::JobStatus;
use crate::util::serde::JobId;

/// Errors produced by scheduler components and job collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Queue is full for the target user.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// Capacity strategy could not report a value.
    #[error("capacity unavailable: {0}")]
    CapacityUnavailable(String),
    /// No job with this identifier exists.
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    /// A status change was rejected by the job state machine.
    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        /// Job being updated.
        job_id: JobId,
        /// Status currently stored.
        from: JobStatus,
        /// Status that was requested.
        to: JobStatus,
    },
    /// A dispatched unit of work failed.
    #[error("task failed: {0}")]
    TaskFailed(String),
    /// A dispatched unit of work was cancelled.
    #[error("task cancelled: {0}")]
    Cancelled(JobId),
    /// A request was rejected before reaching any backend.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Configuration could not be parsed or validated.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
