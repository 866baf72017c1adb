// crates/policy-sync-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Shared fakes for synchronizer, checker, and readiness tests.
// Purpose: Reduce duplication across integration tests for policy-sync-core.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test helpers use unwraps for fixture setup."
)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use policy_sync_core::ConfigStore;
use policy_sync_core::ConfigurationRecord;
use policy_sync_core::ContextPolicy;
use policy_sync_core::Identity;
use policy_sync_core::InMemoryConfigStore;
use policy_sync_core::ObservationError;
use policy_sync_core::OptionValue;
use policy_sync_core::PolicyView;
use policy_sync_core::ProbeError;
use policy_sync_core::ReadinessHook;
use policy_sync_core::ReadinessHookError;
use policy_sync_core::RetrySpec;
use policy_sync_core::StatusProbe;
use policy_sync_core::StoreError;
use policy_sync_core::SynchronizerConfig;
use policy_sync_core::core::policy::ENDPOINT_AUTH_TYPES;
use policy_sync_core::core::policy::GUEST_ACCESS;
use policy_sync_core::core::policy::WEB_AUTH_TYPES;
use policy_sync_core::core::policy::WHITELIST_CONTEXTS;
use policy_sync_core::runtime::SyncAuditEvent;
use policy_sync_core::runtime::SyncAuditSink;
use policy_sync_core::runtime::SyncPhase;

// ============================================================================
// SECTION: Specs
// ============================================================================

/// Builds a retry spec from millisecond values.
pub fn spec_ms(interval_ms: u64, max_ms: u64) -> RetrySpec {
    RetrySpec::new(Duration::from_millis(interval_ms), Duration::from_millis(max_ms)).unwrap()
}

/// Synchronizer settings with millisecond budgets.
pub fn fast_config() -> SynchronizerConfig {
    SynchronizerConfig {
        convergence: spec_ms(5, 150),
        defaults: spec_ms(5, 100),
        ready_timeout: Duration::from_millis(50),
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Metatype defaults for a context-policy identity.
pub fn policy_defaults(identity: &str) -> ConfigurationRecord {
    ConfigurationRecord::new(Identity::new(identity))
        .with_option(WEB_AUTH_TYPES, "BASIC")
        .with_option(ENDPOINT_AUTH_TYPES, "BASIC")
        .with_option(GUEST_ACCESS, false)
        .with_option(WHITELIST_CONTEXTS, OptionValue::List(vec!["/health".to_string()]))
}

/// In-memory store with `identity` registered under policy defaults.
pub fn registered_store(identity: &str) -> InMemoryConfigStore {
    let store = InMemoryConfigStore::new();
    store.register(policy_defaults(identity)).unwrap();
    store
}

// ============================================================================
// SECTION: Views
// ============================================================================

/// Policy view that replays scripted observations, repeating the last one.
#[derive(Debug)]
pub struct ScriptedView {
    /// Remaining observations.
    script: Mutex<VecDeque<Result<Vec<ContextPolicy>, ObservationError>>>,
    /// Observation returned once the script is drained.
    fallback: Result<Vec<ContextPolicy>, ObservationError>,
    /// Number of observations made.
    calls: AtomicU32,
}

impl ScriptedView {
    /// Creates a view that replays `script`, then repeats `fallback`.
    pub fn new(
        script: Vec<Result<Vec<ContextPolicy>, ObservationError>>,
        fallback: Result<Vec<ContextPolicy>, ObservationError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicU32::new(0),
        }
    }

    /// Creates a view that always reports `policies`.
    pub fn constant(policies: Vec<ContextPolicy>) -> Self {
        Self::new(Vec::new(), Ok(policies))
    }

    /// Returns the number of observations made.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PolicyView for ScriptedView {
    fn active_policies(&self) -> Result<Vec<ContextPolicy>, ObservationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// ============================================================================
// SECTION: Stores
// ============================================================================

/// Store wrapper that rejects every write.
#[derive(Debug, Clone)]
pub struct FailingWriteStore {
    /// Backing store for reads.
    pub inner: InMemoryConfigStore,
}

impl ConfigStore for FailingWriteStore {
    fn read(&self, identity: &Identity) -> Result<Option<ConfigurationRecord>, StoreError> {
        self.inner.read(identity)
    }

    fn write(&self, _identity: &Identity, _record: &ConfigurationRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    fn metatype_defaults(&self, identity: &Identity) -> Result<ConfigurationRecord, StoreError> {
        self.inner.metatype_defaults(identity)
    }

    fn identities(&self) -> Result<Vec<Identity>, StoreError> {
        self.inner.identities()
    }
}

/// Store wrapper whose defaults are empty for the first `empty_reads` calls.
#[derive(Debug)]
pub struct LateDefaultsStore {
    /// Backing store.
    pub inner: InMemoryConfigStore,
    /// Remaining empty reads.
    pub empty_reads: AtomicU32,
    /// Number of defaults reads made.
    pub reads: AtomicU32,
}

impl LateDefaultsStore {
    /// Wraps `inner`, publishing defaults after `empty_reads` calls.
    pub fn new(inner: InMemoryConfigStore, empty_reads: u32) -> Self {
        Self {
            inner,
            empty_reads: AtomicU32::new(empty_reads),
            reads: AtomicU32::new(0),
        }
    }
}

impl ConfigStore for LateDefaultsStore {
    fn read(&self, identity: &Identity) -> Result<Option<ConfigurationRecord>, StoreError> {
        self.inner.read(identity)
    }

    fn write(&self, identity: &Identity, record: &ConfigurationRecord) -> Result<(), StoreError> {
        self.inner.write(identity, record)
    }

    fn metatype_defaults(&self, identity: &Identity) -> Result<ConfigurationRecord, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let remaining = self.empty_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.empty_reads.store(remaining - 1, Ordering::SeqCst);
            return Ok(ConfigurationRecord::new(identity.clone()));
        }
        self.inner.metatype_defaults(identity)
    }

    fn identities(&self) -> Result<Vec<Identity>, StoreError> {
        self.inner.identities()
    }
}

// ============================================================================
// SECTION: Hooks and Probes
// ============================================================================

/// Readiness hook that always reports not ready.
#[derive(Debug, Default)]
pub struct FailingHook;

impl ReadinessHook for FailingHook {
    fn wait_for_ready(&self, timeout_hint: Duration) -> Result<(), ReadinessHookError> {
        Err(ReadinessHookError::NotReady(format!(
            "bundles still starting after {} ms",
            timeout_hint.as_millis()
        )))
    }
}

/// Status probe that replays scripted responses, repeating the last one.
#[derive(Debug)]
pub struct ScriptedProbe {
    /// Remaining responses.
    script: Mutex<VecDeque<Result<u16, ProbeError>>>,
    /// Response returned once the script is drained.
    fallback: Result<u16, ProbeError>,
}

impl ScriptedProbe {
    /// Creates a probe that replays `script`, then repeats `fallback`.
    pub fn new(script: Vec<Result<u16, ProbeError>>, fallback: Result<u16, ProbeError>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
        }
    }
}

impl StatusProbe for ScriptedProbe {
    fn status(&self, _target: &str) -> Result<u16, ProbeError> {
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    /// Recorded events.
    events: Mutex<Vec<SyncAuditEvent>>,
}

impl RecordingAuditSink {
    /// Returns the recorded events.
    pub fn events(&self) -> Vec<SyncAuditEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the recorded phases in order.
    pub fn phases(&self) -> Vec<SyncPhase> {
        self.events().iter().map(|event| event.phase).collect()
    }
}

impl SyncAuditSink for RecordingAuditSink {
    fn record(&self, event: &SyncAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
