//! Best-effort cancellation of jobs running in this process.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::util::serde::JobId;

/// Registry of cancellation tokens for jobs executing locally.
///
/// Cancelling a job that is not running here (finished, unknown, or running
/// in another process) is a no-op.
#[derive(Default)]
pub struct JobCanceller {
    running: Mutex<HashMap<JobId, CancellationToken>>,
}

impl JobCanceller {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a job that is about to run and return its token.
    pub fn register(&self, job_id: JobId) -> CancellationToken {
        let token = CancellationToken::new();
        self.running.lock().insert(job_id, token.clone());
        token
    }

    /// Request cancellation. Returns whether a running job was signalled.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let token = self.running.lock().get(&job_id).cloned();
        match token {
            Some(token) => {
                debug!(%job_id, "cancelling running job");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget a job once it has finished.
    pub fn release(&self, job_id: JobId) {
        self.running.lock().remove(&job_id);
    }

    /// Whether the job is currently tracked as running here.
    pub fn is_running(&self, job_id: JobId) -> bool {
        self.running.lock().contains_key(&job_id)
    }
}
