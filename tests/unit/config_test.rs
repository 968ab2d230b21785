//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_batch::config::{
    BatchConfig, CapacityConfig, QueueBackendConfig, StoreBackendConfig,
};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let cfg = BatchConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.capacity, CapacityConfig::One);
    assert_eq!(cfg.queue, QueueBackendConfig::InMemory);
}

#[test]
fn test_invalid_timeout() {
    let invalid = BatchConfig {
        job_timeout_secs: 0,
        ..BatchConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_invalid_queue_depth() {
    let invalid = BatchConfig {
        max_jobs_per_user: 0,
        ..BatchConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_invalid_discovery_interval() {
    let invalid = BatchConfig {
        discovery_interval_secs: Some(0),
        ..BatchConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "capacity": { "kind": "fixed", "slots": 4 },
        "job_timeout_secs": 60,
        "queue": { "kind": "file", "path": "/var/lib/batch" }
    }"#;
    let cfg = BatchConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.capacity, CapacityConfig::Fixed { slots: 4 });
    assert_eq!(cfg.job_timeout_secs, 60);
    assert_eq!(
        cfg.queue,
        QueueBackendConfig::File {
            path: "/var/lib/batch".into()
        }
    );
    assert_eq!(cfg.store, StoreBackendConfig::InMemory);
    assert_eq!(cfg.max_jobs_per_user, BatchConfig::default().max_jobs_per_user);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(BatchConfig::from_json_str("not json").is_err());
    assert!(BatchConfig::from_json_str(r#"{ "job_timeout_secs": 0 }"#).is_err());
}

#[test]
fn test_capacity_from_str() {
    assert_eq!("one".parse::<CapacityConfig>(), Ok(CapacityConfig::One));
    assert_eq!(
        "Unbounded".parse::<CapacityConfig>(),
        Ok(CapacityConfig::Unbounded)
    );
    assert_eq!(
        "8".parse::<CapacityConfig>(),
        Ok(CapacityConfig::Fixed { slots: 8 })
    );
    assert!("many".parse::<CapacityConfig>().is_err());
}

#[test]
fn test_from_lookup() {
    let cfg = BatchConfig::from_lookup(lookup(&[
        ("BATCH_CAPACITY", "3"),
        ("BATCH_JOB_TIMEOUT_SECS", "30"),
        ("BATCH_DISCOVERY_INTERVAL_SECS", "10"),
        ("BATCH_STORE_PATH", "/tmp/batch-store"),
    ]))
    .unwrap();

    assert_eq!(cfg.capacity, CapacityConfig::Fixed { slots: 3 });
    assert_eq!(cfg.job_timeout_secs, 30);
    assert_eq!(cfg.discovery_interval_secs, Some(10));
    assert_eq!(cfg.queue, QueueBackendConfig::InMemory);
    assert_eq!(
        cfg.store,
        StoreBackendConfig::File {
            path: "/tmp/batch-store".into()
        }
    );
}

#[test]
fn test_from_lookup_rejects_bad_values() {
    let err = BatchConfig::from_lookup(lookup(&[("BATCH_MAX_JOBS_PER_USER", "lots")])).unwrap_err();
    assert!(err.contains("BATCH_MAX_JOBS_PER_USER"));
    assert!(BatchConfig::from_lookup(lookup(&[("BATCH_JOB_TIMEOUT_SECS", "0")])).is_err());
}
