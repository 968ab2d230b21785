//! Infrastructure adapters for job queues, job stores, and event publishers.

mod jsonl;
pub mod publisher;
pub mod queue;
pub mod store;

pub use publisher::{BroadcastPublisher, JobSubscriber, NoopPublisher};
pub use queue::{InMemoryJobQueue, YaqueJobQueue};
pub use store::{InMemoryJobStore, YaqueJobStore};
