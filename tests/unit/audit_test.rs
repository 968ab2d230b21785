//! Tests for audit sink

use prometheus_batch::core::{build_audit_event, AuditSink, InMemoryAuditSink, SharedAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    sink.record(build_audit_event("alice", "dispatch", None));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].tenant, "alice");
    assert_eq!(events[0].action, "dispatch");
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("alice", "register", None));
    sink.record(build_audit_event("bob", "register", None));
    sink.record(build_audit_event("carol", "register", None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tenant, "bob"); // First one popped
    assert_eq!(events[1].tenant, "carol");
}

#[test]
fn test_zero_sized_sink_keeps_nothing() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event("alice", "register", None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event("alice", "fail", Some("task failed: boom".to_string()));

    assert!(event.event_id.starts_with("alice-fail-"));
    assert_eq!(event.tenant, "alice");
    assert_eq!(event.action, "fail");
    assert_eq!(event.detail, Some("task failed: boom".to_string()));
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_shared_sink_filters_by_action() {
    let shared = SharedAuditSink::new(10);
    let mut handle = shared.clone();
    handle.record(build_audit_event("alice", "dispatch", None));
    handle.record(build_audit_event("alice", "retire", None));
    handle.record(build_audit_event("bob", "dispatch", None));

    assert_eq!(shared.tenants_for("dispatch"), ["alice", "bob"]);
    assert_eq!(shared.events().len(), 3);
}
