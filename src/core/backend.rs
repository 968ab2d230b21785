//! Job execution: the backend that drives one job through its lifecycle and
//! the task runner that feeds the scheduler from the job queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::canceller::JobCanceller;
use crate::core::executor::{QueryExecutor, TaskOutcome, TaskRunner};
use crate::core::job::JobStatus;
use crate::core::lifecycle::{JobQueue, JobStore};
use crate::core::SchedulerError;
use crate::util::serde::{JobId, UserKey};

/// Runs individual jobs: pending → running → done | failed | cancelled.
///
/// Every job runs under `timeout`, so a dispatch always completes even if the
/// executor hangs.
pub struct JobBackend {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn QueryExecutor>,
    canceller: Arc<JobCanceller>,
    timeout: Duration,
}

impl JobBackend {
    /// Create a backend.
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn QueryExecutor>,
        canceller: Arc<JobCanceller>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            executor,
            canceller,
            timeout,
        }
    }

    /// Execute job `job_id` and return the final stored status.
    ///
    /// A job already in a final state (cancelled while queued) is skipped.
    pub async fn run(&self, job_id: JobId) -> Result<JobStatus, SchedulerError> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or(SchedulerError::JobNotFound(job_id))?;
        if job.status.is_final() {
            debug!(%job_id, status = %job.status, "skipping finished job");
            return Ok(job.status);
        }

        let token = self.canceller.register(job_id);
        let job = match self.store.update_status(job_id, JobStatus::Running, None).await {
            Ok(job) => job,
            Err(SchedulerError::InvalidTransition { from, .. }) => {
                // Lost a race with a cancel between load and update.
                self.canceller.release(job_id);
                return Ok(from);
            }
            Err(e) => {
                self.canceller.release(job_id);
                return Err(e);
            }
        };
        info!(%job_id, user = %job.user, "job running");

        let (status, reason) = tokio::select! {
            res = tokio::time::timeout(self.timeout, self.executor.execute(&job, token.clone())) => {
                match res {
                    Ok(Ok(())) => (JobStatus::Done, None),
                    Ok(Err(e)) => (JobStatus::Failed, Some(format!("{e:#}"))),
                    Err(_) => (
                        JobStatus::Failed,
                        Some(format!("timed out after {:?}", self.timeout)),
                    ),
                }
            }
            () = token.cancelled() => (JobStatus::Cancelled, None),
        };
        self.canceller.release(job_id);
        self.finish(job_id, status, reason).await
    }

    async fn finish(
        &self,
        job_id: JobId,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<JobStatus, SchedulerError> {
        match self.store.update_status(job_id, status, reason.clone()).await {
            Ok(job) => {
                match job.status {
                    JobStatus::Failed => {
                        warn!(%job_id, reason = reason.as_deref().unwrap_or(""), "job failed");
                    }
                    other => info!(%job_id, status = %other, "job finished"),
                }
                Ok(job.status)
            }
            // Cancelled elsewhere while running; the stored status wins.
            Err(SchedulerError::InvalidTransition { from, .. }) => {
                info!(%job_id, status = %from, "job status already settled");
                Ok(from)
            }
            Err(e) => Err(e),
        }
    }
}

/// [`TaskRunner`] that pops the next job for a user from the queue and runs
/// it through the [`JobBackend`].
pub struct QueueTaskRunner {
    queue: Arc<dyn JobQueue>,
    backend: Arc<JobBackend>,
}

impl QueueTaskRunner {
    /// Create a runner over `queue` and `backend`.
    pub fn new(queue: Arc<dyn JobQueue>, backend: Arc<JobBackend>) -> Self {
        Self { queue, backend }
    }
}

#[async_trait]
impl TaskRunner for QueueTaskRunner {
    async fn run(&self, user: &UserKey) -> TaskOutcome {
        let result = match self.queue.dequeue_next(user).await {
            Ok(Some(job_id)) => match self.backend.run(job_id).await {
                Ok(JobStatus::Done) => Ok(()),
                Ok(JobStatus::Cancelled) => Err(SchedulerError::Cancelled(job_id)),
                Ok(status) => Err(SchedulerError::TaskFailed(format!(
                    "job {job_id} finished as {status}"
                ))),
                Err(e) => Err(e),
            },
            // Another instance popped it first.
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        // Checked after the job ends so work enqueued meanwhile keeps the
        // user in the rotation. On error the user is retired; the queue is
        // still the source of truth and discovery brings it back.
        let backlog_empty = match self.queue.len(user).await {
            Ok(pending) => pending == 0,
            Err(e) => {
                warn!(%user, error = %e, "could not read backlog length");
                true
            }
        };

        TaskOutcome {
            result,
            backlog_empty,
        }
    }
}
