//! Capacity strategies: how many dispatches may be in flight right now.
//!
//! A strategy reports the concurrency ceiling for the current scheduling tick.
//! The scheduler subtracts its own in-flight count to obtain free slots, so a
//! strategy never needs to know what is running.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::SchedulerError;

/// Concurrency ceiling reported by a [`CapacityStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// At most this many dispatches in flight. Zero pauses dispatch.
    Slots(u32),
    /// No ceiling; one dispatch per ready user per pass.
    Unbounded,
}

impl Capacity {
    /// Slots still free given the number of dispatches already in flight.
    pub fn free(self, in_flight: usize) -> usize {
        match self {
            Self::Slots(n) => (n as usize).saturating_sub(in_flight),
            Self::Unbounded => usize::MAX,
        }
    }
}

/// Pluggable policy reporting available concurrency.
///
/// Implementations may be asynchronous and fallible (for example a policy
/// that samples database load). A failed query is treated by the scheduler as
/// zero slots for that tick.
#[async_trait]
pub trait CapacityStrategy: Send + Sync + 'static {
    /// Current concurrency ceiling.
    async fn available_slots(&self) -> Result<Capacity, SchedulerError>;
}

#[async_trait]
impl<T> CapacityStrategy for Arc<T>
where
    T: CapacityStrategy + ?Sized,
{
    async fn available_slots(&self) -> Result<Capacity, SchedulerError> {
        (**self).available_slots().await
    }
}

/// Strict global serialization: one dispatch at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneCapacity;

#[async_trait]
impl CapacityStrategy for OneCapacity {
    async fn available_slots(&self) -> Result<Capacity, SchedulerError> {
        Ok(Capacity::Slots(1))
    }
}

/// No limit on concurrent dispatches.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfinityCapacity;

#[async_trait]
impl CapacityStrategy for InfinityCapacity {
    async fn available_slots(&self) -> Result<Capacity, SchedulerError> {
        Ok(Capacity::Unbounded)
    }
}

/// Constant ceiling of `n` slots.
#[derive(Debug, Clone, Copy)]
pub struct FixedCapacity(pub u32);

#[async_trait]
impl CapacityStrategy for FixedCapacity {
    async fn available_slots(&self) -> Result<Capacity, SchedulerError> {
        Ok(Capacity::Slots(self.0))
    }
}

/// Ceiling that can be changed while the scheduler runs.
///
/// Lowering the value never interrupts running dispatches; it only holds back
/// new ones. After raising it, call `Scheduler::schedule` so the new slots are
/// used without waiting for the next completion.
#[derive(Debug, Clone)]
pub struct AdjustableCapacity {
    slots: Arc<AtomicU32>,
}

impl AdjustableCapacity {
    /// Create with an initial ceiling.
    pub fn new(slots: u32) -> Self {
        Self {
            slots: Arc::new(AtomicU32::new(slots)),
        }
    }

    /// Replace the ceiling.
    pub fn set(&self, slots: u32) {
        self.slots.store(slots, Ordering::Release);
        tracing::debug!(slots, "capacity adjusted");
    }

    /// Current ceiling.
    pub fn get(&self) -> u32 {
        self.slots.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CapacityStrategy for AdjustableCapacity {
    async fn available_slots(&self) -> Result<Capacity, SchedulerError> {
        Ok(Capacity::Slots(self.get()))
    }
}
