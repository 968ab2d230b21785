//! Benchmarks for the round-robin scheduler.
//!
//! Benchmarks cover:
//! - Rotation bookkeeping (register / next_ready / finish)
//! - Full drain cycles under each capacity strategy
//! - Per-user job queue operations

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use prometheus_batch::core::{
    CapacityStrategy, FixedCapacity, InfinityCapacity, JobQueue, OneCapacity, Rotation,
    Scheduler, Spawn, TaskOutcome, TaskRunner,
};
use prometheus_batch::infra::InMemoryJobQueue;
use prometheus_batch::util::serde::{JobId, UserKey};
use tokio::runtime::Runtime;

// ============================================================================
// Runner and Spawner
// ============================================================================

struct CountdownRunner {
    units: Mutex<HashMap<UserKey, u32>>,
}

impl CountdownRunner {
    fn new(users: u32, units: u32) -> Self {
        Self {
            units: Mutex::new((0..users).map(|u| (user(u), units)).collect()),
        }
    }
}

#[async_trait]
impl TaskRunner for CountdownRunner {
    async fn run(&self, user: &UserKey) -> TaskOutcome {
        let mut units = self.units.lock();
        let left = units.entry(user.clone()).or_default();
        *left = left.saturating_sub(1);
        TaskOutcome::completed(*left == 0)
    }
}

#[derive(Clone)]
struct BenchSpawner;

impl Spawn for BenchSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(fut);
    }
}

fn user(i: u32) -> UserKey {
    UserKey::new(format!("user-{i}"))
}

// ============================================================================
// Rotation Benchmarks
// ============================================================================

fn bench_rotation_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("rotation_cycle");

    for users in [10_u32, 100, 1_000] {
        group.throughput(Throughput::Elements(u64::from(users)));
        group.bench_with_input(BenchmarkId::from_parameter(users), &users, |b, &users| {
            let keys: Vec<UserKey> = (0..users).map(user).collect();
            b.iter(|| {
                let mut rotation = Rotation::new();
                for key in &keys {
                    rotation.register(key);
                }
                while let Some((id, key)) = rotation.next_ready() {
                    black_box(&key);
                    rotation.finish(id, true);
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Scheduler Benchmarks
// ============================================================================

async fn drain_cycle(capacity: impl CapacityStrategy, users: u32, units: u32) {
    let scheduler = Scheduler::new(capacity, CountdownRunner::new(users, units), BenchSpawner);
    for u in 0..users {
        for _ in 0..units {
            scheduler.register(user(u));
        }
    }
    scheduler.drain().await;
    black_box(scheduler.stats());
}

fn bench_scheduler_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_drain");
    let users = 50;
    let units = 4;
    group.throughput(Throughput::Elements(u64::from(users * units)));

    group.bench_function("one", |b| {
        b.to_async(Runtime::new().unwrap())
            .iter(|| drain_cycle(OneCapacity, users, units));
    });
    group.bench_function("fixed_8", |b| {
        b.to_async(Runtime::new().unwrap())
            .iter(|| drain_cycle(FixedCapacity(8), users, units));
    });
    group.bench_function("unbounded", |b| {
        b.to_async(Runtime::new().unwrap())
            .iter(|| drain_cycle(InfinityCapacity, users, units));
    });
    group.finish();
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_enqueue_dequeue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_enqueue_dequeue");

    for size in [100_u32, 1_000] {
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.to_async(Runtime::new().unwrap()).iter(|| async move {
                let queue = Arc::new(InMemoryJobQueue::new(size as usize));
                for i in 0..size {
                    queue.enqueue(&user(i % 10), JobId::new()).await.unwrap();
                }
                for key in queue.users_with_work().await.unwrap() {
                    while let Some(id) = queue.dequeue_next(&key).await.unwrap() {
                        black_box(id);
                    }
                }
            });
        });
    }
    group.finish();
}

criterion_group!(rotation_benches, bench_rotation_cycle);
criterion_group!(scheduler_benches, bench_scheduler_drain);
criterion_group!(queue_benches, bench_queue_enqueue_dequeue);

criterion_main!(rotation_benches, scheduler_benches, queue_benches);
