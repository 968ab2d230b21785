//! File-backed job store inspired by Yaque.
//!
//! Every insert and status change appends a full job snapshot as a JSON line;
//! reads replay the log (last snapshot per job wins). The log is compacted on
//! open and whenever stale snapshots outnumber live jobs. Like the file
//! queue, every operation works on the file under its lock, so handles in
//! several processes may share one directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::lifecycle::apply_transition;
use crate::core::{Job, JobStatus, JobStore, SchedulerError};
use crate::infra::jsonl::{JsonlLog, LogGuard};
use crate::util::clock::now_ms;
use crate::util::serde::{JobId, UserKey};

/// Snapshot lines tolerated beyond twice the live job count.
const COMPACT_SLACK: usize = 64;

/// File-backed job store using JSON lines for durability.
pub struct YaqueJobStore {
    log: Arc<JsonlLog>,
}

/// Latest snapshot per job plus the number of lines read.
fn replay(guard: &LogGuard<'_>) -> Result<(HashMap<JobId, Job>, usize), SchedulerError> {
    let snapshots: Vec<Job> = guard.read()?;
    let lines = snapshots.len();
    let jobs = snapshots.into_iter().map(|job| (job.id, job)).collect();
    Ok((jobs, lines))
}

fn compact(guard: &LogGuard<'_>, jobs: &HashMap<JobId, Job>) -> Result<(), SchedulerError> {
    let mut ordered: Vec<&Job> = jobs.values().collect();
    ordered.sort_by_key(|j| j.created_at_ms);
    guard.replace(ordered)
}

impl YaqueJobStore {
    /// Open (or create) the store persisted under `path/<stream>_jobs.jsonl`.
    pub fn new(path: impl AsRef<Path>, stream: impl Into<String>) -> Result<Self, SchedulerError> {
        let stream = stream.into();
        let log = JsonlLog::open(path.as_ref(), &format!("{stream}_jobs.jsonl"))?;
        let jobs = {
            let guard = log.exclusive()?;
            let (jobs, lines) = replay(&guard)?;
            if lines > jobs.len() {
                compact(&guard, &jobs)?;
            }
            jobs.len()
        };
        tracing::debug!(%stream, jobs, "opened job store");
        Ok(Self { log })
    }
}

#[async_trait]
impl JobStore for YaqueJobStore {
    async fn insert(&self, job: Job) -> Result<(), SchedulerError> {
        self.log
            .blocking(move |log| {
                let guard = log.exclusive()?;
                let (jobs, _) = replay(&guard)?;
                if jobs.contains_key(&job.id) {
                    return Err(SchedulerError::Backend(format!(
                        "job {} already exists",
                        job.id
                    )));
                }
                guard.append(&job)
            })
            .await
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, SchedulerError> {
        self.log
            .blocking(move |log| {
                let (mut jobs, _) = replay(&log.shared()?)?;
                Ok(jobs.remove(&id))
            })
            .await
    }

    async fn update_status(
        &self,
        id: JobId,
        status: JobStatus,
        reason: Option<String>,
    ) -> Result<Job, SchedulerError> {
        self.log
            .blocking(move |log| {
                let guard = log.exclusive()?;
                let (mut jobs, lines) = replay(&guard)?;
                let current = jobs.get_mut(&id).ok_or(SchedulerError::JobNotFound(id))?;
                apply_transition(current, status, reason, now_ms())?;
                let updated = current.clone();
                if lines + 1 > 2 * jobs.len() + COMPACT_SLACK {
                    compact(&guard, &jobs)?;
                } else {
                    guard.append(&updated)?;
                }
                Ok(updated)
            })
            .await
    }

    async fn list_by_user(&self, user: &UserKey) -> Result<Vec<Job>, SchedulerError> {
        let user = user.clone();
        self.log
            .blocking(move |log| {
                let (jobs, _) = replay(&log.shared()?)?;
                let mut jobs: Vec<Job> = jobs.into_values().filter(|j| j.user == user).collect();
                jobs.sort_by_key(|j| j.created_at_ms);
                Ok(jobs)
            })
            .await
    }
}
