//! Tests for error types

use prometheus_batch::core::{JobStatus, SchedulerError};
use prometheus_batch::util::serde::JobId;

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull("user alice has 8 pending jobs".to_string());
    assert_eq!(format!("{}", err), "queue full: user alice has 8 pending jobs");
}

#[test]
fn test_job_not_found_error() {
    let id = JobId::new();
    let err = SchedulerError::JobNotFound(id);
    assert_eq!(format!("{}", err), format!("job not found: {id}"));
}

#[test]
fn test_invalid_transition_error() {
    let id = JobId::new();
    let err = SchedulerError::InvalidTransition {
        job_id: id,
        from: JobStatus::Done,
        to: JobStatus::Running,
    };
    assert_eq!(
        format!("{}", err),
        format!("invalid transition for job {id}: done -> running")
    );
}

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("connection failed".to_string());
    assert_eq!(format!("{}", err), "backend error: connection failed");
}

#[test]
fn test_config_error() {
    let err = SchedulerError::Config("job_timeout_secs must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: job_timeout_secs must be greater than 0"
    );
}

#[test]
fn test_errors_convert_into_anyhow() {
    let err: anyhow::Error = SchedulerError::TaskFailed("boom".into()).into();
    assert_eq!(err.to_string(), "task failed: boom");
}
