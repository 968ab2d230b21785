//! Core scheduling abstractions, job lifecycle and capacity accounting.

pub mod audit;
pub mod backend;
pub mod canceller;
pub mod capacity;
pub mod error;
pub mod executor;
pub mod job;
pub mod lifecycle;
pub mod publisher;
pub mod rotation;
pub mod scheduler;
pub mod service;

pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, SharedAuditSink};
pub use backend::{JobBackend, QueueTaskRunner};
pub use canceller::JobCanceller;
pub use capacity::{
    AdjustableCapacity, Capacity, CapacityStrategy, FixedCapacity, InfinityCapacity, OneCapacity,
};
pub use error::{AppResult, SchedulerError};
pub use executor::{QueryExecutor, TaskOutcome, TaskRunner};
pub use job::{Job, JobStatus};
pub use lifecycle::{JobQueue, JobStore};
pub use publisher::{BatchEvent, EventSource, JobPublisher, Notification};
pub use rotation::{EntryId, Registration, Rotation};
pub use scheduler::{Drained, Scheduler, SchedulerStats, Spawn};
pub use service::{JobService, JobServiceParts};
