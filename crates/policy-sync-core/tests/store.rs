// crates/policy-sync-core/tests/store.rs
// ============================================================================
// Module: Config Store Tests
// Description: Tests for the in-memory configuration store and its view.
// Purpose: Validate registration, whole-record writes, and projection reads.
// Dependencies: policy-sync-core
// ============================================================================

//! In-memory configuration store and store-backed policy view tests.

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

use common::policy_defaults;
use common::registered_store;
use policy_sync_core::ConfigStore;
use policy_sync_core::ConfigurationRecord;
use policy_sync_core::Identity;
use policy_sync_core::InMemoryConfigStore;
use policy_sync_core::ObservationError;
use policy_sync_core::PolicyView;
use policy_sync_core::StoreError;
use policy_sync_core::StorePolicyView;
use policy_sync_core::core::policy::GUEST_ACCESS;

#[test]
fn write_replaces_whole_record() {
    let identity = Identity::new("policy-1");
    let store = registered_store("policy-1");
    assert_eq!(store.read(&identity).unwrap(), None);

    let first = policy_defaults("policy-1").with_option("extra", "x");
    store.write(&identity, &first).unwrap();
    let second = ConfigurationRecord::new(identity.clone()).with_option(GUEST_ACCESS, true);
    store.write(&identity, &second).unwrap();

    assert_eq!(store.read(&identity).unwrap(), Some(second));
}

#[test]
fn unregistered_identity_is_rejected() {
    let store = InMemoryConfigStore::new();
    let identity = Identity::new("ghost");
    let record = ConfigurationRecord::new(identity.clone());
    assert_eq!(
        store.write(&identity, &record),
        Err(StoreError::NotRegistered("ghost".to_string()))
    );
    assert!(matches!(store.metatype_defaults(&identity), Err(StoreError::NotRegistered(_))));
}

#[test]
fn mismatched_record_identity_is_rejected() {
    let store = registered_store("policy-1");
    let record = policy_defaults("policy-2");
    let err = store.write(&Identity::new("policy-1"), &record).unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
}

#[test]
fn blank_registration_is_rejected() {
    let store = InMemoryConfigStore::new();
    let err = store.register(ConfigurationRecord::new(Identity::new(" "))).unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
}

#[test]
fn identities_lists_registrations_in_order() {
    let store = registered_store("b");
    store.register(policy_defaults("a")).unwrap();
    assert_eq!(store.identities().unwrap(), vec![Identity::new("a"), Identity::new("b")]);
    assert_eq!(store.metatype_defaults(&Identity::new("a")).unwrap(), policy_defaults("a"));
}

#[test]
fn clones_share_state() {
    let identity = Identity::new("policy-1");
    let store = registered_store("policy-1");
    let clone = store.clone();
    clone.write(&identity, &policy_defaults("policy-1")).unwrap();
    assert!(store.read(&identity).unwrap().is_some());
}

#[test]
fn view_projects_stored_record() {
    let identity = Identity::new("policy-1");
    let store = registered_store("policy-1");
    let view = StorePolicyView::new(store.clone(), identity.clone());
    assert!(view.active_policies().unwrap().is_empty());

    store.write(&identity, &policy_defaults("policy-1")).unwrap();
    let paths: Vec<String> =
        view.active_policies().unwrap().into_iter().map(|policy| policy.path).collect();
    assert_eq!(paths, vec!["/".to_string(), "/health".to_string(), "/services".to_string()]);
}

#[test]
fn view_reports_malformed_stored_record() {
    let identity = Identity::new("policy-1");
    let store = registered_store("policy-1");
    let broken = ConfigurationRecord::new(identity.clone()).with_option(GUEST_ACCESS, "maybe");
    store.write(&identity, &broken).unwrap();
    let view = StorePolicyView::new(store, identity);
    assert!(matches!(view.active_policies(), Err(ObservationError::Malformed(_))));
}
