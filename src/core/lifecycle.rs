//! Storage contracts for the job lifecycle: the per-user job queue and the
//! job record store.
//!
//! Both may be shared by several scheduler instances, possibly in separate
//! processes. Implementations must make `dequeue_next` an atomic pop and
//! `update_status` an atomic compare-and-set on the job's status.

use async_trait::async_trait;

use crate::core::job::{Job, JobStatus};
use crate::core::SchedulerError;
use crate::util::serde::{JobId, UserKey};

/// Durable per-user FIFO of job references.
#[async_trait]
pub trait JobQueue: Send + Sync + 'static {
    /// Append `job_id` to the tail of `user`'s backlog.
    async fn enqueue(&self, user: &UserKey, job_id: JobId) -> Result<(), SchedulerError>;

    /// Atomically pop the head of `user`'s backlog.
    async fn dequeue_next(&self, user: &UserKey) -> Result<Option<JobId>, SchedulerError>;

    /// Number of jobs pending for `user`.
    async fn len(&self, user: &UserKey) -> Result<usize, SchedulerError>;

    /// Users with at least one pending job, oldest pending work first.
    async fn users_with_work(&self) -> Result<Vec<UserKey>, SchedulerError>;
}

/// Persistent job records.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Persist a new job.
    async fn insert(&self, job: Job) -> Result<(), SchedulerError>;

    /// Load a job by id.
    async fn get(&self, id: JobId) -> Result<Option<Job>, SchedulerError>;

    /// Move a job to `status` if its state machine allows it, returning the
    /// updated record. Fails with [`SchedulerError::InvalidTransition`]
    /// carrying the stored status otherwise.
    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<Job, SchedulerError>;

    /// All jobs of `user`, oldest first.
    async fn list_by_user(&self, user: &UserKey) -> Result<Vec<Job>, SchedulerError>;
}

/// Apply a checked status change to an in-memory record.
pub(crate) fn apply_transition(
    job: &mut Job,
    status: JobStatus,
    reason: Option<String>,
    now_ms: u128,
) -> Result<(), SchedulerError> {
    if !job.status.can_transition_to(status) {
        return Err(SchedulerError::InvalidTransition {
            job_id: job.id,
            from: job.status,
            to: status,
        });
    }
    job.status = status;
    job.updated_at_ms = now_ms;
    if reason.is_some() {
        job.failed_reason = reason;
    }
    Ok(())
}
