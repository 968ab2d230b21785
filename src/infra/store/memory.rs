//! In-memory job store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::lifecycle::apply_transition;
use crate::core::{Job, JobStatus, JobStore, SchedulerError};
use crate::util::clock::now_ms;
use crate::util::serde::{JobId, UserKey};

/// Simple in-memory store for development, testing and single-host sharing.
///
/// Clones share the same records.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs in `status`.
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.lock().values().filter(|j| j.status == status).count()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<(), SchedulerError> {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&job.id) {
            return Err(SchedulerError::Backend(format!("job {} already exists", job.id)));
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, SchedulerError> {
        Ok(self.jobs.lock().get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<Job, SchedulerError> {
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&id).ok_or(SchedulerError::JobNotFound(id))?;
        apply_transition(job, status, reason, now_ms())?;
        Ok(job.clone())
    }

    async fn list_by_user(&self, user: &UserKey) -> Result<Vec<Job>, SchedulerError> {
        let mut jobs: Vec<Job> = self
            .jobs
            .lock()
            .values()
            .filter(|j| &j.user == user)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at_ms);
        Ok(jobs)
    }
}
