//! In-memory per-user job queue.
//!
//! Cloning the queue yields another handle to the same backlog, which is how
//! several scheduler instances share one store in a single process.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{JobQueue, SchedulerError};
use crate::util::serde::{JobId, UserKey};

#[derive(Default)]
struct Backlogs {
    /// Global enqueue sequence, used to order users by their oldest job.
    seq: u64,
    users: HashMap<UserKey, VecDeque<(u64, JobId)>>,
}

/// In-memory queue storing per-user FIFOs behind one mutex.
#[derive(Clone)]
pub struct InMemoryJobQueue {
    max_depth: usize,
    backlogs: Arc<Mutex<Backlogs>>,
}

impl InMemoryJobQueue {
    /// Create a new queue holding at most `max_depth` jobs per user.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            backlogs: Arc::new(Mutex::new(Backlogs::default())),
        }
    }

    /// Maximum pending jobs per user.
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Pending jobs across all users.
    pub fn total_len(&self) -> usize {
        self.backlogs.lock().users.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, user: &UserKey, job_id: JobId) -> Result<(), SchedulerError> {
        let mut backlogs = self.backlogs.lock();
        let depth = backlogs.users.get(user).map_or(0, VecDeque::len);
        if depth >= self.max_depth {
            return Err(SchedulerError::QueueFull(format!(
                "user {user} has {depth} pending jobs"
            )));
        }
        backlogs.seq += 1;
        let seq = backlogs.seq;
        backlogs
            .users
            .entry(user.clone())
            .or_default()
            .push_back((seq, job_id));
        Ok(())
    }

    async fn dequeue_next(&self, user: &UserKey) -> Result<Option<JobId>, SchedulerError> {
        let mut backlogs = self.backlogs.lock();
        let Some(backlog) = backlogs.users.get_mut(user) else {
            return Ok(None);
        };
        let next = backlog.pop_front().map(|(_, id)| id);
        if backlog.is_empty() {
            backlogs.users.remove(user);
        }
        Ok(next)
    }

    async fn len(&self, user: &UserKey) -> Result<usize, SchedulerError> {
        Ok(self
            .backlogs
            .lock()
            .users
            .get(user)
            .map_or(0, VecDeque::len))
    }

    async fn users_with_work(&self) -> Result<Vec<UserKey>, SchedulerError> {
        let backlogs = self.backlogs.lock();
        let mut heads: Vec<(u64, &UserKey)> = backlogs
            .users
            .iter()
            .filter_map(|(user, backlog)| backlog.front().map(|(seq, _)| (*seq, user)))
            .collect();
        heads.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(heads.into_iter().map(|(_, user)| user.clone()).collect())
    }
}
