//! Job service: the entry point tying persistence, the per-user queue, the
//! scheduler and cross-instance notifications together.
//!
//! Several instances may share one store and queue. Each instance runs its own
//! [`Scheduler`]; whichever instance pops a job from the queue runs it. Events
//! from the publisher shorten the time until an instance notices new work, and
//! [`JobService::discover`] recovers everything the events missed.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::backend::{JobBackend, QueueTaskRunner};
use crate::core::canceller::JobCanceller;
use crate::core::capacity::CapacityStrategy;
use crate::core::executor::QueryExecutor;
use crate::core::job::{Job, JobStatus};
use crate::core::lifecycle::{JobQueue, JobStore};
use crate::core::publisher::{BatchEvent, EventSource, JobPublisher, Notification};
use crate::core::scheduler::{Drained, Scheduler, SchedulerStats, Spawn};
use crate::core::SchedulerError;
use crate::util::serde::{JobId, UserKey};

/// Shared collaborators of a [`JobService`].
pub struct JobServiceParts {
    /// Durable job records.
    pub store: Arc<dyn JobStore>,
    /// Per-user backlog of job ids.
    pub queue: Arc<dyn JobQueue>,
    /// Runs the query of a job.
    pub executor: Arc<dyn QueryExecutor>,
    /// Cross-instance notifications.
    pub publisher: Arc<dyn JobPublisher>,
}

/// Submits, tracks, cancels and runs batch jobs.
pub struct JobService<S> {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
    publisher: Arc<dyn JobPublisher>,
    canceller: Arc<JobCanceller>,
    scheduler: Scheduler<QueueTaskRunner, S>,
    spawner: S,
}

impl<S: Clone> Clone for JobService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            queue: Arc::clone(&self.queue),
            publisher: Arc::clone(&self.publisher),
            canceller: Arc::clone(&self.canceller),
            scheduler: self.scheduler.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl<S> JobService<S>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Wire a service. Every job runs under `job_timeout`.
    pub fn new(
        capacity: impl CapacityStrategy,
        parts: JobServiceParts,
        job_timeout: Duration,
        spawner: S,
    ) -> Self {
        let canceller = Arc::new(JobCanceller::new());
        let backend = Arc::new(JobBackend::new(
            Arc::clone(&parts.store),
            parts.executor,
            Arc::clone(&canceller),
            job_timeout,
        ));
        let runner = QueueTaskRunner::new(Arc::clone(&parts.queue), backend);
        let scheduler = Scheduler::new(capacity, runner, spawner.clone());
        Self {
            store: parts.store,
            queue: parts.queue,
            publisher: parts.publisher,
            canceller,
            scheduler,
            spawner,
        }
    }

    /// Underlying scheduler.
    pub fn scheduler(&self) -> &Scheduler<QueueTaskRunner, S> {
        &self.scheduler
    }

    /// Persist a pending job, queue it for its user and announce the work.
    ///
    /// The job is not run by this call; an instance picks it up after the
    /// announcement or during discovery.
    pub async fn create(
        &self,
        user: impl Into<UserKey>,
        query: impl Into<String>,
    ) -> Result<Job, SchedulerError> {
        let job = Job::new(user.into(), query);
        self.store.insert(job.clone()).await?;

        if let Err(e) = self.queue.enqueue(&job.user, job.id).await {
            // Do not leave a pending record nobody will ever run.
            let reason = format!("enqueue failed: {e}");
            if let Err(mark) = self
                .store
                .update_status(job.id, JobStatus::Cancelled, Some(reason))
                .await
            {
                warn!(job_id = %job.id, error = %mark, "could not cancel unqueued job");
            }
            return Err(e);
        }
        info!(job_id = %job.id, user = %job.user, "job created");

        self.announce(BatchEvent::Work {
            user: job.user.clone(),
        })
        .await;
        Ok(job)
    }

    /// Load a job.
    pub async fn get(&self, id: JobId) -> Result<Job, SchedulerError> {
        self.store
            .get(id)
            .await?
            .ok_or(SchedulerError::JobNotFound(id))
    }

    /// Jobs of `user`, oldest first.
    pub async fn list(&self, user: &UserKey) -> Result<Vec<Job>, SchedulerError> {
        self.store.list_by_user(user).await
    }

    /// Cancel a job. Pending jobs are skipped when dequeued; running jobs are
    /// signalled wherever they run. Jobs already finished are returned as is.
    pub async fn cancel(&self, id: JobId) -> Result<Job, SchedulerError> {
        let job = self.get(id).await?;
        if job.status.is_final() {
            debug!(job_id = %id, status = %job.status, "cancel of finished job ignored");
            return Ok(job);
        }

        let job = match self
            .store
            .update_status(id, JobStatus::Cancelled, None)
            .await
        {
            Ok(job) => job,
            // Finished between load and update.
            Err(SchedulerError::InvalidTransition { .. }) => return self.get(id).await,
            Err(e) => return Err(e),
        };
        info!(job_id = %id, "job cancelled");

        self.canceller.cancel(id);
        self.announce(BatchEvent::Cancel { job_id: id }).await;
        Ok(job)
    }

    /// Add one pending unit for `user` and start dispatching.
    pub fn register_user(&self, user: impl Into<UserKey>) {
        self.scheduler.register(user);
        self.scheduler.schedule();
    }

    /// Register every user the queue reports pending work for. Returns the
    /// number of users found.
    pub async fn discover(&self) -> Result<usize, SchedulerError> {
        let users = self.queue.users_with_work().await?;
        if users.is_empty() {
            return Ok(0);
        }
        for user in &users {
            self.scheduler.register(user.clone());
        }
        self.scheduler.schedule();
        debug!(users = users.len(), "discovered pending work");
        Ok(users.len())
    }

    /// React to one notification.
    pub async fn handle(&self, notification: Notification) {
        match notification {
            Notification::Event(BatchEvent::Work { user }) => self.register_user(user),
            Notification::Event(BatchEvent::Cancel { job_id }) => {
                self.canceller.cancel(job_id);
            }
            Notification::Missed(missed) => {
                warn!(missed, "missed notifications, rediscovering work");
                if let Err(e) = self.discover().await {
                    warn!(error = %e, "discovery failed");
                }
            }
        }
    }

    /// Consume notifications until `shutdown` fires or the source closes.
    pub async fn listen<E: EventSource>(&self, mut source: E, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                next = source.next() => match next {
                    Some(notification) => self.handle(notification).await,
                    None => break,
                },
            }
        }
        debug!("notification listener stopped");
    }

    /// Run [`listen`](Self::listen) in the background.
    pub fn spawn_listener<E>(&self, source: E, shutdown: CancellationToken)
    where
        E: EventSource + 'static,
    {
        let service = self.clone();
        self.spawner
            .spawn(async move { service.listen(source, shutdown).await });
    }

    /// Run [`discover`](Self::discover) every `every` until `shutdown` fires.
    pub fn spawn_discovery(&self, every: Duration, shutdown: CancellationToken) {
        let service = self.clone();
        self.spawner.spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = service.discover().await {
                            warn!(error = %e, "periodic discovery failed");
                        }
                    }
                }
            }
        });
    }

    /// Start an instance: listen to `source`, optionally rediscover every
    /// `discovery` period, and pick up the work already queued. Returns the
    /// number of users found by the initial discovery.
    pub async fn start<E>(
        &self,
        source: E,
        discovery: Option<Duration>,
        shutdown: CancellationToken,
    ) -> Result<usize, SchedulerError>
    where
        E: EventSource + 'static,
    {
        self.spawn_listener(source, shutdown.clone());
        if let Some(every) = discovery {
            self.spawn_discovery(every, shutdown);
        }
        let found = self.discover().await?;
        info!(users = found, "job service started");
        Ok(found)
    }

    /// Resolves when the scheduler next becomes idle.
    pub fn drained(&self) -> Drained {
        self.scheduler.drained()
    }

    /// Scheduler counters.
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    async fn announce(&self, event: BatchEvent) {
        // Best effort: discovery finds the work if the event is lost.
        if let Err(e) = self.publisher.publish(event).await {
            warn!(error = %e, "failed to publish batch event");
        }
    }
}
