// crates/policy-sync-core/tests/configurator.rs
// ============================================================================
// Module: Policy Configurator Tests
// Description: Canned web context policies and request-surface readiness.
// Purpose: Validate generated overrides and status-based readiness waits.
// Dependencies: policy-sync-core
// ============================================================================

//! Web context policy configurator tests.

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

use common::ScriptedProbe;
use common::fast_config;
use common::policy_defaults;
use common::spec_ms;
use policy_sync_core::CancellationToken;
use policy_sync_core::ConfigStore;
use policy_sync_core::ConfigSynchronizer;
use policy_sync_core::ConfigurationRecord;
use policy_sync_core::Identity;
use policy_sync_core::InMemoryConfigStore;
use policy_sync_core::NoopReadinessHook;
use policy_sync_core::OptionValue;
use policy_sync_core::PolicyConfigurator;
use policy_sync_core::ProbeError;
use policy_sync_core::ReadinessError;
use policy_sync_core::StorePolicyView;
use policy_sync_core::core::policy::ENDPOINT_AUTH_TYPES;
use policy_sync_core::core::policy::GUEST_ACCESS;
use policy_sync_core::core::policy::REQUIRED_ATTRIBUTES;
use policy_sync_core::core::policy::SESSION_ACCESS;
use policy_sync_core::core::policy::WEB_AUTH_TYPES;
use policy_sync_core::core::policy::WHITELIST_CONTEXTS;
use policy_sync_core::runtime::DEFAULT_POLICY_IDENTITY;
use policy_sync_core::runtime::DEFAULT_WHITELIST;
use policy_sync_core::runtime::wait_for_status;

type StoreView = StorePolicyView<InMemoryConfigStore>;
type Synchronizer = ConfigSynchronizer<InMemoryConfigStore, StoreView, NoopReadinessHook>;

fn synchronizer() -> (InMemoryConfigStore, Synchronizer) {
    let store = InMemoryConfigStore::new();
    store.register(policy_defaults(DEFAULT_POLICY_IDENTITY)).unwrap();
    let view = StorePolicyView::new(store.clone(), Identity::new(DEFAULT_POLICY_IDENTITY));
    let synchronizer =
        ConfigSynchronizer::new(store.clone(), view, NoopReadinessHook, fast_config());
    (store, synchronizer)
}

fn written(store: &InMemoryConfigStore) -> ConfigurationRecord {
    store.read(&Identity::new(DEFAULT_POLICY_IDENTITY)).unwrap().unwrap()
}

fn list(entries: &[&str]) -> OptionValue {
    OptionValue::List(entries.iter().map(ToString::to_string).collect())
}

#[test]
fn whitelist_appends_non_blank_extras() {
    let (_store, synchronizer) = synchronizer();
    let configurator = PolicyConfigurator::new(&synchronizer);
    let defaults = DEFAULT_WHITELIST.join(",");
    assert_eq!(configurator.whitelist(None), defaults);
    assert_eq!(configurator.whitelist(Some("  ")), defaults);
    assert_eq!(configurator.whitelist(Some("/extra")), format!("{defaults},/extra"));
}

#[test]
fn basic_configuration_writes_expected_options() {
    let (store, synchronizer) = synchronizer();
    let configurator = PolicyConfigurator::new(&synchronizer);

    let previous = configurator.configure_rest_for_basic(Some("/catalog")).unwrap();

    assert!(!previous.is_recorded());
    let record = written(&store);
    assert_eq!(record.get(WEB_AUTH_TYPES), Some(&OptionValue::from("BASIC")));
    assert_eq!(record.get(ENDPOINT_AUTH_TYPES), Some(&OptionValue::from("BASIC")));
    assert_eq!(record.get(GUEST_ACCESS), Some(&OptionValue::Bool(true)));
    assert_eq!(record.get(SESSION_ACCESS), Some(&OptionValue::Bool(true)));
    let mut expected: Vec<&str> = DEFAULT_WHITELIST.to_vec();
    expected.push("/catalog");
    assert_eq!(record.get(WHITELIST_CONTEXTS), Some(&list(&expected)));
}

#[test]
fn switching_modes_returns_prior_configuration() {
    let (store, synchronizer) = synchronizer();
    let configurator = PolicyConfigurator::new(&synchronizer);

    configurator.configure_rest_for_saml(None).unwrap();
    let previous = configurator.configure_rest_for_guest(None).unwrap();

    assert_eq!(previous.get(WEB_AUTH_TYPES), Some(&OptionValue::from("SAML")));
    assert_eq!(written(&store).get(WEB_AUTH_TYPES), Some(&OptionValue::from("")));

    synchronizer.restore(&previous).unwrap();
    assert_eq!(written(&store).get(WEB_AUTH_TYPES), Some(&OptionValue::from("SAML")));
}

#[test]
fn absent_values_keep_defaults_and_blank_lists_are_ignored() {
    let (store, synchronizer) = synchronizer();
    let configurator = PolicyConfigurator::new(&synchronizer);

    configurator
        .configure_web_context_policy(None, Some("PKI"), Some("/admin=role,/ops=team"), Some(" "))
        .unwrap();

    let record = written(&store);
    assert_eq!(record.get(WEB_AUTH_TYPES), Some(&OptionValue::from("BASIC")));
    assert_eq!(record.get(ENDPOINT_AUTH_TYPES), Some(&OptionValue::from("PKI")));
    assert_eq!(record.get(REQUIRED_ATTRIBUTES), Some(&list(&["/admin=role", "/ops=team"])));
    assert_eq!(record.get(WHITELIST_CONTEXTS), Some(&list(&["/health"])));
}

#[test]
fn whitespace_only_list_tokens_are_dropped() {
    let (store, synchronizer) = synchronizer();
    let configurator = PolicyConfigurator::new(&synchronizer);

    configurator.configure_rest_for_basic(Some("/a, ,/b,")).unwrap();

    let mut expected: Vec<&str> = DEFAULT_WHITELIST.to_vec();
    expected.extend(["/a", "/b"]);
    assert_eq!(written(&store).get(WHITELIST_CONTEXTS), Some(&list(&expected)));

    configurator
        .configure_web_context_policy(None, None, Some("/admin=role,  ,/ops=team"), None)
        .unwrap();
    assert_eq!(
        written(&store).get(REQUIRED_ATTRIBUTES),
        Some(&list(&["/admin=role", "/ops=team"]))
    );
}

#[test]
fn custom_identity_and_whitelist_are_used() {
    let store = InMemoryConfigStore::new();
    store.register(policy_defaults("custom-policy")).unwrap();
    let view = StorePolicyView::new(store.clone(), Identity::new("custom-policy"));
    let synchronizer =
        ConfigSynchronizer::new(store.clone(), view, NoopReadinessHook, fast_config());
    let configurator = PolicyConfigurator::new(&synchronizer)
        .with_identity(Identity::new("custom-policy"))
        .with_default_whitelist(vec!["/only".to_string()]);

    configurator.configure_rest_for_basic(None).unwrap();

    assert_eq!(configurator.identity().as_str(), "custom-policy");
    let record = store.read(&Identity::new("custom-policy")).unwrap().unwrap();
    assert_eq!(record.get(WHITELIST_CONTEXTS), Some(&list(&["/only"])));
}

#[test]
fn basic_auth_ready_waits_for_unauthorized() {
    let (_store, synchronizer) = synchronizer();
    let configurator = PolicyConfigurator::new(&synchronizer).with_readiness(spec_ms(5, 500));
    let probe = ScriptedProbe::new(
        vec![Err(ProbeError::Failed("connection refused".to_string())), Ok(200)],
        Ok(401),
    );
    configurator.wait_for_basic_auth_ready(&probe, "https://localhost/search").unwrap();
}

#[test]
fn guest_auth_ready_reports_last_status_on_timeout() {
    let (_store, synchronizer) = synchronizer();
    let configurator = PolicyConfigurator::new(&synchronizer).with_readiness(spec_ms(5, 60));
    let probe = ScriptedProbe::new(Vec::new(), Ok(401));

    let err =
        configurator.wait_for_guest_auth_ready(&probe, "https://localhost/search").unwrap_err();

    match err {
        ReadinessError::NotReady {
            target,
            expected,
            last_status,
            attempts,
        } => {
            assert_eq!(target, "https://localhost/search");
            assert_eq!(expected, 200);
            assert_eq!(last_status, "401");
            assert!(attempts >= 1);
        }
        ReadinessError::Cancelled {
            ..
        } => panic!("unexpected cancellation"),
    }
}

#[test]
fn status_wait_observes_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let probe = ScriptedProbe::new(Vec::new(), Ok(200));
    let err = wait_for_status(&probe, "target", 200, spec_ms(5, 500), Some(&token)).unwrap_err();
    assert_eq!(err, ReadinessError::Cancelled {
        target: "target".to_string(),
    });
}
