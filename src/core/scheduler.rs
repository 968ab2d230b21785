//! Fair round-robin dispatch over per-user backlogs.
//!
//! The scheduler owns a [`Rotation`] of users with pending work and a single
//! driver loop that hands out capacity slots. Each dispatch runs the
//! [`TaskRunner`] for one user on the [`Spawn`] runtime; the runner's
//! [`TaskOutcome`] releases the slot and decides whether the user stays in
//! the rotation.
//!
//! Dispatch initiation interleaves across users: the cursor moves past a user
//! as soon as its dispatch starts, and a user never has more than one dispatch
//! in flight. With `A:3, B:2, C:1` pending units the initiation order is
//! `A B C A B A` regardless of the capacity strategy. The driver waits for
//! each dispatch to be polled once before launching the next, so the order
//! holds on multi-threaded runtimes too.
//!
//! ```rust,ignore
//! use prometheus_batch::core::{OneCapacity, Scheduler};
//! use prometheus_batch::runtime::TokioSpawner;
//!
//! let scheduler = Scheduler::new(OneCapacity, my_runner, TokioSpawner::current());
//! scheduler.register("alice");
//! scheduler.register("bob");
//! scheduler.drain().await;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, trace, warn};

use crate::core::audit::{build_audit_event, AuditSink};
use crate::core::capacity::{Capacity, CapacityStrategy};
use crate::core::executor::{TaskOutcome, TaskRunner};
use crate::core::rotation::{EntryId, Registration, Rotation};
use crate::core::SchedulerError;
use crate::util::serde::UserKey;

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn a future that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Point-in-time counters for a scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Users currently in the rotation.
    pub active_users: usize,
    /// Dispatches currently in flight.
    pub in_flight: usize,
    /// Dispatches started since creation.
    pub dispatched: u64,
    /// Dispatches that reported an error.
    pub failed: u64,
    /// Completed drain cycles.
    pub drains: u64,
}

struct State {
    rotation: Rotation,
    in_flight: usize,
    /// A driver loop is running.
    driving: bool,
    waiters: Vec<oneshot::Sender<()>>,
    dispatched: u64,
    failed: u64,
    drains: u64,
}

struct Inner<R> {
    capacity: Arc<dyn CapacityStrategy>,
    runner: R,
    state: Mutex<State>,
    /// Signalled on slot release and on `schedule()` while driving.
    wake: Notify,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
}

impl<R> Inner<R> {
    fn record(&self, user: &UserKey, action: &str, detail: Option<String>) {
        if let Some(sink) = self.audit.lock().as_mut() {
            sink.record(build_audit_event(user.as_str(), action, detail));
        }
    }

    fn complete(&self, id: EntryId, user: &UserKey, outcome: TaskOutcome) {
        let retired = {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            if outcome.result.is_err() {
                state.failed += 1;
            }
            state.rotation.finish(id, outcome.backlog_empty)
        };

        match outcome.result {
            Ok(()) => {
                debug!(%user, backlog_empty = outcome.backlog_empty, "dispatch completed");
                self.record(user, "complete", None);
            }
            Err(e) => {
                warn!(%user, error = %e, "dispatch failed");
                self.record(user, "fail", Some(e.to_string()));
            }
        }
        if retired {
            debug!(%user, "user retired from rotation");
            self.record(user, "retire", None);
        }
        self.wake.notify_one();
    }
}

/// Releases the slot of a dispatch even if its future is dropped or panics
/// before the runner reports back.
struct DispatchGuard<R> {
    inner: Option<Arc<Inner<R>>>,
    id: EntryId,
    user: UserKey,
}

impl<R> DispatchGuard<R> {
    fn complete(mut self, outcome: TaskOutcome) {
        if let Some(inner) = self.inner.take() {
            inner.complete(self.id, &self.user, outcome);
        }
    }
}

impl<R> Drop for DispatchGuard<R> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            // The queue is the source of truth; the user re-enters on the
            // next registration instead of being retried in a loop.
            inner.complete(
                self.id,
                &self.user,
                TaskOutcome::failed(
                    SchedulerError::TaskFailed("dispatch dropped before completion".into()),
                    true,
                ),
            );
        }
    }
}

/// Future that resolves when the scheduler next becomes idle.
///
/// Also resolves if the scheduler is dropped first.
#[must_use = "futures do nothing unless awaited"]
pub struct Drained {
    rx: oneshot::Receiver<()>,
}

impl Future for Drained {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}

/// Round-robin scheduler over per-user backlogs bounded by a capacity strategy.
///
/// Cloning yields another handle to the same scheduler.
pub struct Scheduler<R, S> {
    inner: Arc<Inner<R>>,
    spawner: S,
}

impl<R, S: Clone> Clone for Scheduler<R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            spawner: self.spawner.clone(),
        }
    }
}

impl<R, S> Scheduler<R, S>
where
    R: TaskRunner,
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create an idle scheduler. The capacity strategy is fixed for the
    /// scheduler's lifetime; use an adjustable strategy to change limits.
    pub fn new(capacity: impl CapacityStrategy, runner: R, spawner: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: Arc::new(capacity),
                runner,
                state: Mutex::new(State {
                    rotation: Rotation::new(),
                    in_flight: 0,
                    driving: false,
                    waiters: Vec::new(),
                    dispatched: 0,
                    failed: 0,
                    drains: 0,
                }),
                wake: Notify::new(),
                audit: Mutex::new(None),
            }),
            spawner,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        *self.inner.audit.lock() = Some(audit);
        self
    }

    /// Add one pending unit for `user`. A user without an entry joins the
    /// tail of the rotation; otherwise this merges into the existing entry.
    /// Does not dispatch.
    pub fn register(&self, user: impl Into<UserKey>) {
        let user = user.into();
        let registration = self.inner.state.lock().rotation.register(&user);
        match registration {
            Registration::Joined => {
                debug!(%user, "user joined rotation");
                self.inner.record(&user, "register", None);
            }
            Registration::Merged => trace!(%user, "registration merged"),
        }
    }

    /// Start dispatching if idle, or nudge the running driver loop.
    /// Safe to call at any time; never starts a second loop.
    pub fn schedule(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.driving {
                drop(state);
                self.inner.wake.notify_one();
                return;
            }
            state.driving = true;
        }
        trace!("starting dispatch loop");
        let scheduler = self.clone();
        self.spawner.spawn(scheduler.drive());
    }

    /// Resolves at the next transition to idle. Subscribe before calling
    /// [`schedule`](Self::schedule) to observe the cycle it starts.
    pub fn drained(&self) -> Drained {
        let (tx, rx) = oneshot::channel();
        self.inner.state.lock().waiters.push(tx);
        Drained { rx }
    }

    /// Schedule and wait until every registered unit has completed.
    pub async fn drain(&self) {
        let drained = self.drained();
        self.schedule();
        drained.await;
    }

    /// No users in rotation, nothing in flight and no driver loop running.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        !state.driving && state.rotation.is_empty() && state.in_flight == 0
    }

    /// Users currently in the rotation, in rotation order.
    pub fn active_users(&self) -> Vec<UserKey> {
        self.inner.state.lock().rotation.users()
    }

    /// Snapshot of scheduler counters.
    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock();
        SchedulerStats {
            active_users: state.rotation.len(),
            in_flight: state.in_flight,
            dispatched: state.dispatched,
            failed: state.failed,
            drains: state.drains,
        }
    }

    async fn drive(self) {
        loop {
            if self.try_settle() {
                return;
            }

            let capacity = match self.inner.capacity.available_slots().await {
                Ok(capacity) => capacity,
                Err(e) => {
                    warn!(error = %e, "capacity query failed, treating as zero slots");
                    Capacity::Slots(0)
                }
            };

            // Dispatches start in rotation order: the next one is launched only
            // after the previous runner has run up to its first suspension.
            for (id, user) in self.take_ready(capacity) {
                let _ = self.launch(id, user).await;
            }

            // Woken by a completion or by `schedule()`; a permit stored
            // before this point is consumed immediately.
            self.inner.wake.notified().await;
        }
    }

    /// Leave the loop if quiescent, firing drain waiters.
    fn try_settle(&self) -> bool {
        let waiters = {
            let mut state = self.inner.state.lock();
            if !state.rotation.is_empty() || state.in_flight > 0 {
                return false;
            }
            state.driving = false;
            state.drains += 1;
            std::mem::take(&mut state.waiters)
        };
        info!(waiters = waiters.len(), "scheduler drained");
        self.inner.record(&UserKey::new(""), "drain", None);
        for waiter in waiters {
            let _ = waiter.send(());
        }
        true
    }

    fn take_ready(&self, capacity: Capacity) -> Vec<(EntryId, UserKey)> {
        let mut state = self.inner.state.lock();
        let mut free = capacity.free(state.in_flight);
        let mut ready = Vec::new();
        while free > 0 {
            let Some(next) = state.rotation.next_ready() else {
                break;
            };
            state.in_flight += 1;
            state.dispatched += 1;
            free -= 1;
            ready.push(next);
        }
        if ready.is_empty() && !state.rotation.is_empty() && state.in_flight == 0 {
            debug!(?capacity, "no free slots, dispatch paused");
        }
        ready
    }

    /// Spawn the dispatch for `user`. The returned receiver fires once the
    /// runner has been polled for the first time, or closes if the dispatch
    /// is dropped before that.
    fn launch(&self, id: EntryId, user: UserKey) -> oneshot::Receiver<()> {
        debug!(%user, "dispatching");
        self.inner.record(&user, "dispatch", None);
        let (started_tx, started_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        self.spawner.spawn(async move {
            let guard = DispatchGuard {
                inner: Some(Arc::clone(&inner)),
                id,
                user: user.clone(),
            };
            let mut run = inner.runner.run(&user);
            let first = std::future::poll_fn(|cx| Poll::Ready(run.as_mut().poll(cx))).await;
            match first {
                Poll::Ready(outcome) => {
                    // Settle before acknowledging so the next pick sees it.
                    guard.complete(outcome);
                    let _ = started_tx.send(());
                }
                Poll::Pending => {
                    let _ = started_tx.send(());
                    let outcome = run.await;
                    guard.complete(outcome);
                }
            }
        });
        started_rx
    }
}
