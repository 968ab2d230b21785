//! Builders to construct a job service from configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{BatchConfig, CapacityConfig, QueueBackendConfig, StoreBackendConfig};
use crate::core::{
    CapacityStrategy, FixedCapacity, InfinityCapacity, JobPublisher, JobQueue, JobService,
    JobServiceParts, JobStore, OneCapacity, QueryExecutor, SchedulerError, Spawn,
};
use crate::infra::{InMemoryJobQueue, InMemoryJobStore, YaqueJobQueue, YaqueJobStore};

const STREAM: &str = "batch";

/// Capacity strategy for a capacity selection.
pub fn build_capacity(cfg: &CapacityConfig) -> Arc<dyn CapacityStrategy> {
    match *cfg {
        CapacityConfig::One => Arc::new(OneCapacity),
        CapacityConfig::Unbounded => Arc::new(InfinityCapacity),
        CapacityConfig::Fixed { slots } => Arc::new(FixedCapacity(slots)),
    }
}

/// Job queue for the configured backend.
pub fn build_queue(cfg: &BatchConfig) -> Result<Arc<dyn JobQueue>, SchedulerError> {
    Ok(match &cfg.queue {
        QueueBackendConfig::InMemory => Arc::new(InMemoryJobQueue::new(cfg.max_jobs_per_user)),
        QueueBackendConfig::File { path } => {
            Arc::new(YaqueJobQueue::new(path, STREAM, cfg.max_jobs_per_user)?)
        }
    })
}

/// Job store for the configured backend.
pub fn build_store(cfg: &BatchConfig) -> Result<Arc<dyn JobStore>, SchedulerError> {
    Ok(match &cfg.store {
        StoreBackendConfig::InMemory => Arc::new(InMemoryJobStore::new()),
        StoreBackendConfig::File { path } => Arc::new(YaqueJobStore::new(path, STREAM)?),
    })
}

/// Validate `cfg` and wire a [`JobService`] with its own queue and store.
///
/// Instances that must share in-memory backends should be assembled with
/// [`JobService::new`] directly.
pub fn build_service<S>(
    cfg: &BatchConfig,
    executor: Arc<dyn QueryExecutor>,
    publisher: Arc<dyn JobPublisher>,
    spawner: S,
) -> Result<JobService<S>, SchedulerError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate().map_err(SchedulerError::Config)?;
    let parts = JobServiceParts {
        store: build_store(cfg)?,
        queue: build_queue(cfg)?,
        executor,
        publisher,
    };
    tracing::info!(capacity = ?cfg.capacity, timeout_secs = cfg.job_timeout_secs, "building job service");
    Ok(JobService::new(
        build_capacity(&cfg.capacity),
        parts,
        Duration::from_secs(cfg.job_timeout_secs),
        spawner,
    ))
}
