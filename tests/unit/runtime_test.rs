//! Tests for tokio spawner utilities and API models

use std::time::Duration;

use async_trait::async_trait;
use prometheus_batch::core::{
    Job, JobStatus, OneCapacity, Scheduler, SchedulerStats, Spawn, TaskOutcome, TaskRunner,
};
use prometheus_batch::runtime::{health, JobView, TokioSpawner};
use prometheus_batch::util::serde::UserKey;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test]
async fn test_tokio_spawner_current() {
    let spawner = TokioSpawner::current();
    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send("ran").unwrap();
    });
    assert_eq!(rx.await.unwrap(), "ran");
    assert!(TokioSpawner::try_current().is_some());
}

#[test]
fn test_try_current_outside_runtime() {
    assert!(TokioSpawner::try_current().is_none());
}

#[test]
fn test_owned_runtime_spawner() {
    let spawner = TokioSpawner::with_worker_threads(1).unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    spawner.spawn(async move {
        tx.send(7).unwrap();
    });
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 7);
}

struct SingleUnit;

#[async_trait]
impl TaskRunner for SingleUnit {
    async fn run(&self, _user: &UserKey) -> TaskOutcome {
        TaskOutcome::completed(true)
    }
}

#[test]
fn test_clones_do_not_own_the_runtime() {
    let spawner = TokioSpawner::with_worker_threads(1).unwrap();
    assert!(spawner.owns_runtime());
    assert!(!spawner.clone().owns_runtime());
    assert!(!TokioSpawner::new(spawner.handle().clone()).owns_runtime());
}

#[test]
fn test_scheduler_drops_owned_runtime_outside_its_tasks() {
    let spawner = TokioSpawner::with_worker_threads(2).unwrap();
    let handle = spawner.handle().clone();
    let scheduler = Scheduler::new(OneCapacity, SingleUnit, spawner);
    scheduler.register("alice");
    handle.block_on(async {
        tokio::time::timeout(Duration::from_secs(2), scheduler.drain())
            .await
            .expect("scheduler did not drain");
    });
    assert!(scheduler.is_idle());

    // The driver task only held a handle, so the runtime goes down here
    // and not inside a worker.
    drop(scheduler);
}

#[test]
fn test_job_view_from_job() {
    let job = Job::new(UserKey::from("alice"), "SELECT 1");
    let view = JobView::from(job.clone());
    assert_eq!(view.job_id, job.id);
    assert_eq!(view.status, JobStatus::Pending);
    assert_eq!(view.query, "SELECT 1");
}

#[test]
fn test_health_reports_counters() {
    let stats = SchedulerStats {
        active_users: 2,
        in_flight: 1,
        ..SchedulerStats::default()
    };
    let h = health(&stats);
    assert!(h.ok);
    assert_eq!(h.active_users, 2);
    assert_eq!(h.in_flight, 1);
}
