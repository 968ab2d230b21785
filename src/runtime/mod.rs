//! Runtime adapters and API surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{cancel_job, health, job_status, submit_job, Health, JobSubmission, JobView};
pub use tokio_spawner::TokioSpawner;
