//! Execution traits: the scheduler's task runner contract and the query
//! executor that performs the actual work of a job.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::job::Job;
use crate::core::{AppResult, SchedulerError};
use crate::util::serde::UserKey;

/// Result of one dispatch, reported back to the scheduler.
///
/// `backlog_empty` is the only signal the scheduler uses to retire a user.
/// Reporting it too early starves the user; never reporting it keeps the user
/// in the rotation forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Error of the unit that ran, if any.
    pub result: Result<(), SchedulerError>,
    /// Whether the user has no pending units left.
    pub backlog_empty: bool,
}

impl TaskOutcome {
    /// Unit finished without error.
    pub const fn completed(backlog_empty: bool) -> Self {
        Self {
            result: Ok(()),
            backlog_empty,
        }
    }

    /// Unit finished with `error`.
    pub const fn failed(error: SchedulerError, backlog_empty: bool) -> Self {
        Self {
            result: Err(error),
            backlog_empty,
        }
    }
}

/// Executes one pending unit for a user.
///
/// The scheduler awaits `run` exactly once per dispatch and treats its return
/// as the completion of that dispatch. The next dispatch is only launched
/// after `run` has been polled once, so work done before the first `.await`
/// (claiming the unit, recording the start) happens in rotation order.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_batch::core::{TaskOutcome, TaskRunner};
/// use prometheus_batch::util::UserKey;
///
/// struct Countdown(parking_lot::Mutex<u32>);
///
/// #[async_trait]
/// impl TaskRunner for Countdown {
///     async fn run(&self, _user: &UserKey) -> TaskOutcome {
///         let mut left = self.0.lock();
///         *left -= 1;
///         TaskOutcome::completed(*left == 0)
///     }
/// }
/// ```
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    /// Run the next unit for `user` and report the outcome.
    async fn run(&self, user: &UserKey) -> TaskOutcome;
}

/// Runs the payload of a single job.
///
/// Query semantics live entirely behind this trait. Implementations should
/// watch `cancel` and stop early when it fires; the backend also stops
/// awaiting the execution once the token is cancelled.
#[async_trait]
pub trait QueryExecutor: Send + Sync + 'static {
    /// Execute `job`, returning an error if the query failed.
    async fn execute(&self, job: &Job, cancel: CancellationToken) -> AppResult<()>;
}
