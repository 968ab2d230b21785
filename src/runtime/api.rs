//! API-facing request/response models.

use serde::{Deserialize, Serialize};

use crate::core::{Job, JobService, JobStatus, SchedulerError, SchedulerStats, Spawn};
use crate::util::serde::{JobId, UserKey};

/// Job submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Submitting user.
    pub user: UserKey,
    /// Query to execute.
    pub query: String,
}

/// Job status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobView {
    /// Job identifier.
    pub job_id: JobId,
    /// Owning user.
    pub user: UserKey,
    /// Submitted query.
    pub query: String,
    /// Current status.
    pub status: JobStatus,
    /// Failure reason, if failed.
    pub failed_reason: Option<String>,
    /// Creation time (ms since epoch).
    pub created_at_ms: u128,
    /// Last update time (ms since epoch).
    pub updated_at_ms: u128,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            user: job.user,
            query: job.query,
            status: job.status,
            failed_reason: job.failed_reason,
            created_at_ms: job.created_at_ms,
            updated_at_ms: job.updated_at_ms,
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Users with pending work on this instance.
    pub active_users: usize,
    /// Dispatches in flight on this instance.
    pub in_flight: usize,
}

/// Submit a job. Rejects an empty query.
pub async fn submit_job<S>(
    service: &JobService<S>,
    req: JobSubmission,
) -> Result<JobView, SchedulerError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    if req.query.trim().is_empty() {
        return Err(SchedulerError::InvalidRequest("query must not be empty".into()));
    }
    service.create(req.user, req.query).await.map(JobView::from)
}

/// Look up a job.
pub async fn job_status<S>(service: &JobService<S>, job_id: JobId) -> Result<JobView, SchedulerError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    service.get(job_id).await.map(JobView::from)
}

/// Cancel a job and return its resulting view.
pub async fn cancel_job<S>(service: &JobService<S>, job_id: JobId) -> Result<JobView, SchedulerError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    service.cancel(job_id).await.map(JobView::from)
}

/// Health payload from scheduler counters.
pub fn health(stats: &SchedulerStats) -> Health {
    Health {
        ok: true,
        active_users: stats.active_users,
        in_flight: stats.in_flight,
    }
}
