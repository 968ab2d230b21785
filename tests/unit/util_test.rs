//! Tests for utility functions

use prometheus_batch::util::{init_tracing, now_ms, JobId, UserKey};

#[test]
fn test_user_key() {
    let key = UserKey::from("alice");
    assert_eq!(key.as_str(), "alice");
    assert_eq!(key.to_string(), "alice");
    assert_eq!(key, UserKey::new(String::from("alice")));
}

#[test]
fn test_job_id_parse() {
    let id = JobId::new();
    let parsed: JobId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
    assert!("not-a-uuid".parse::<JobId>().is_err());
}

#[test]
fn test_now_ms_advances() {
    let before = now_ms();
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(now_ms() > before);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
