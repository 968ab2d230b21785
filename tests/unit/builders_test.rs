//! Tests for builder modules

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use prometheus_batch::builders::{build_capacity, build_queue, build_service, build_store};
use prometheus_batch::config::{BatchConfig, CapacityConfig, QueueBackendConfig, StoreBackendConfig};
use prometheus_batch::core::{
    AppResult, Capacity, CapacityStrategy, Job, JobQueue, JobStatus, JobStore, QueryExecutor,
    SchedulerError, Spawn,
};
use prometheus_batch::infra::NoopPublisher;
use prometheus_batch::util::serde::{JobId, UserKey};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct TestSpawner;

impl Spawn for TestSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(fut);
    }
}

struct OkExecutor;

#[async_trait]
impl QueryExecutor for OkExecutor {
    async fn execute(&self, _job: &Job, _cancel: CancellationToken) -> AppResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_build_capacity() {
    let one = build_capacity(&CapacityConfig::One);
    assert_eq!(one.available_slots().await, Ok(Capacity::Slots(1)));
    let fixed = build_capacity(&CapacityConfig::Fixed { slots: 5 });
    assert_eq!(fixed.available_slots().await, Ok(Capacity::Slots(5)));
    let unbounded = build_capacity(&CapacityConfig::Unbounded);
    assert_eq!(unbounded.available_slots().await, Ok(Capacity::Unbounded));
}

#[tokio::test]
async fn test_build_in_memory_backends() {
    let cfg = BatchConfig {
        max_jobs_per_user: 1,
        ..BatchConfig::default()
    };
    let queue = build_queue(&cfg).unwrap();
    let user = UserKey::from("alice");
    queue.enqueue(&user, JobId::new()).await.unwrap();
    assert!(matches!(
        queue.enqueue(&user, JobId::new()).await,
        Err(SchedulerError::QueueFull(_))
    ));

    let store = build_store(&cfg).unwrap();
    assert!(store.list_by_user(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_build_file_backends() {
    let dir = std::env::temp_dir().join(format!("prometheus-batch-builders-{}", uuid::Uuid::new_v4()));
    let cfg = BatchConfig {
        queue: QueueBackendConfig::File { path: dir.clone() },
        store: StoreBackendConfig::File { path: dir.clone() },
        ..BatchConfig::default()
    };
    let queue = build_queue(&cfg).unwrap();
    let store = build_store(&cfg).unwrap();

    let job = Job::new(UserKey::from("alice"), "SELECT 1");
    store.insert(job.clone()).await.unwrap();
    queue.enqueue(&job.user, job.id).await.unwrap();
    assert!(dir.join("batch.jsonl").exists());
    assert!(dir.join("batch_jobs.jsonl").exists());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_build_service_rejects_invalid_config() {
    let cfg = BatchConfig {
        job_timeout_secs: 0,
        ..BatchConfig::default()
    };
    let result = build_service(&cfg, Arc::new(OkExecutor), Arc::new(NoopPublisher), TestSpawner);
    assert!(matches!(result, Err(SchedulerError::Config(_))));
}

#[tokio::test]
async fn test_build_service_runs_jobs() {
    let service = build_service(
        &BatchConfig::default(),
        Arc::new(OkExecutor),
        Arc::new(NoopPublisher),
        TestSpawner,
    )
    .unwrap();

    let job = service.create("alice", "SELECT 1").await.unwrap();
    let drained = service.drained();
    assert_eq!(service.discover().await.unwrap(), 1);
    drained.await;
    assert_eq!(service.get(job.id).await.unwrap().status, JobStatus::Done);
}
