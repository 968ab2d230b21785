//! File-backed job queue inspired by Yaque.
//!
//! Pending job references are kept as JSON lines, one record per job, so the
//! backlog survives process restarts. The file is the only copy of the
//! backlog: every operation locks it, reads it and writes back under the same
//! lock. Any number of handles, in one process or several, may share a
//! directory, and each queued job is popped by exactly one of them.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{JobQueue, SchedulerError};
use crate::infra::jsonl::JsonlLog;
use crate::util::serde::{JobId, UserKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueueRecord {
    seq: u64,
    user: UserKey,
    job_id: JobId,
}

/// File-backed queue using JSON lines for durability.
pub struct YaqueJobQueue {
    log: Arc<JsonlLog>,
    max_depth: usize,
}

impl YaqueJobQueue {
    /// Open (or create) the queue stored under `path/<stream>.jsonl`.
    pub fn new(
        path: impl AsRef<Path>,
        stream: impl Into<String>,
        max_depth: usize,
    ) -> Result<Self, SchedulerError> {
        let stream = stream.into();
        let log = JsonlLog::open(path.as_ref(), &format!("{stream}.jsonl"))?;
        let pending = log.shared()?.read::<QueueRecord>()?.len();
        tracing::debug!(%stream, pending, "opened job queue");
        Ok(Self { log, max_depth })
    }
}

#[async_trait]
impl JobQueue for YaqueJobQueue {
    async fn enqueue(&self, user: &UserKey, job_id: JobId) -> Result<(), SchedulerError> {
        let user = user.clone();
        let max_depth = self.max_depth;
        self.log
            .blocking(move |log| {
                let guard = log.exclusive()?;
                let records: Vec<QueueRecord> = guard.read()?;
                let depth = records.iter().filter(|r| r.user == user).count();
                if depth >= max_depth {
                    return Err(SchedulerError::QueueFull(format!(
                        "user {user} has {depth} pending jobs"
                    )));
                }
                let seq = records.iter().map(|r| r.seq + 1).max().unwrap_or(0);
                guard.append(&QueueRecord { seq, user, job_id })
            })
            .await
    }

    async fn dequeue_next(&self, user: &UserKey) -> Result<Option<JobId>, SchedulerError> {
        let user = user.clone();
        self.log
            .blocking(move |log| {
                let guard = log.exclusive()?;
                let mut records: Vec<QueueRecord> = guard.read()?;
                let Some(pos) = records.iter().position(|r| r.user == user) else {
                    return Ok(None);
                };
                let record = records.remove(pos);
                guard.replace(&records)?;
                Ok(Some(record.job_id))
            })
            .await
    }

    async fn len(&self, user: &UserKey) -> Result<usize, SchedulerError> {
        let user = user.clone();
        self.log
            .blocking(move |log| {
                let records: Vec<QueueRecord> = log.shared()?.read()?;
                Ok(records.iter().filter(|r| r.user == user).count())
            })
            .await
    }

    async fn users_with_work(&self) -> Result<Vec<UserKey>, SchedulerError> {
        self.log
            .blocking(|log| {
                let records: Vec<QueueRecord> = log.shared()?.read()?;
                let mut users: Vec<UserKey> = Vec::new();
                for record in records {
                    if !users.contains(&record.user) {
                        users.push(record.user);
                    }
                }
                Ok(users)
            })
            .await
    }
}
