// crates/policy-sync-core/tests/audit.rs
// ============================================================================
// Module: Sync Audit Tests
// Description: JSON-line audit event shape and file sink behavior.
// Purpose: Keep audit output stable for downstream log pipelines.
// Dependencies: policy-sync-core, serde_json, tempfile
// ============================================================================

//! Synchronization audit event and sink tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::fast_config;
use common::registered_store;
use policy_sync_core::ConfigOverrides;
use policy_sync_core::ConfigSynchronizer;
use policy_sync_core::Identity;
use policy_sync_core::NoopReadinessHook;
use policy_sync_core::StorePolicyView;
use policy_sync_core::runtime::FileSyncAuditSink;
use policy_sync_core::runtime::SyncAuditEvent;
use policy_sync_core::runtime::SyncAuditEventParams;
use policy_sync_core::runtime::SyncAuditSink;
use policy_sync_core::runtime::SyncPhase;
use serde_json::Value;

#[test]
fn event_serializes_phase_and_timing() {
    let identity = Identity::new("policy-1");
    let event = SyncAuditEvent::new(SyncAuditEventParams {
        identity: &identity,
        phase: SyncPhase::TimedOut,
        attempts: Some(7),
        elapsed: Some(Duration::from_millis(1_500)),
        detail: Some("context / asserts auth methods not granted by target: PKI".to_string()),
    });

    let value: Value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event"], "config_sync");
    assert_eq!(value["identity"], "policy-1");
    assert_eq!(value["phase"], SyncPhase::TimedOut.as_str());
    assert_eq!(value["attempts"], 7);
    assert_eq!(value["elapsed_ms"], 1_500);
    assert!(value["timestamp_ms"].as_u64().unwrap() > 0);
}

#[test]
fn file_sink_appends_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync-audit.jsonl");
    let identity = Identity::new("policy-1");
    let store = registered_store("policy-1");
    let view = StorePolicyView::new(store.clone(), identity.clone());
    let sink: Arc<dyn SyncAuditSink> = Arc::new(FileSyncAuditSink::new(&path).unwrap());
    let synchronizer =
        ConfigSynchronizer::new(store, view, NoopReadinessHook, fast_config()).with_audit(sink);

    synchronizer.synchronize(&identity, &ConfigOverrides::new()).unwrap();
    drop(synchronizer);

    let contents = std::fs::read_to_string(&path).unwrap();
    let phases: Vec<String> = contents
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .map(|value| value["phase"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(phases, vec!["write_applied", "converged", "dependents_ready"]);
}

#[test]
fn file_sink_reopens_in_append_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync-audit.jsonl");
    let identity = Identity::new("policy-1");
    for phase in [SyncPhase::WriteApplied, SyncPhase::WriteFailed] {
        let sink = FileSyncAuditSink::new(&path).unwrap();
        sink.record(&SyncAuditEvent::new(SyncAuditEventParams {
            identity: &identity,
            phase,
            attempts: None,
            elapsed: None,
            detail: None,
        }));
    }
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
}
