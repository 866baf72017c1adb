// crates/policy-sync-core/src/runtime/store.rs
// ============================================================================
// Module: Policy Sync In-Memory Store
// Description: In-memory configuration store and store-backed policy view.
// Purpose: Provide deterministic implementations without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryConfigStore`] implements [`ConfigStore`] over a mutex-protected
//! map, so every write replaces a whole record atomically. Identities must be
//! registered with their metatype defaults before they can be written.
//! [`StorePolicyView`] projects the stored record of one identity into live
//! context policies, which makes a store-backed system converge immediately.
//! Both are intended for tests and local demos.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::ConfigurationRecord;
use crate::core::ContextPolicy;
use crate::core::Identity;
use crate::core::PolicyProjection;
use crate::interfaces::ConfigStore;
use crate::interfaces::ObservationError;
use crate::interfaces::PolicyView;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Records and defaults held by the in-memory store.
#[derive(Debug, Default)]
struct StoreState {
    /// Metatype defaults keyed by registered identity.
    defaults: BTreeMap<Identity, ConfigurationRecord>,
    /// Current records keyed by identity.
    records: BTreeMap<Identity, ConfigurationRecord>,
}

/// In-memory configuration store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConfigStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryConfigStore {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an identity with its metatype defaults.
    ///
    /// Re-registering replaces the defaults and keeps any current record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] when the identity is blank.
    pub fn register(&self, defaults: ConfigurationRecord) -> Result<(), StoreError> {
        if defaults.identity.is_blank() {
            return Err(StoreError::Rejected("identity must be non-empty".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("config store mutex poisoned".to_string()))?
            .defaults
            .insert(defaults.identity.clone(), defaults);
        Ok(())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn read(&self, identity: &Identity) -> Result<Option<ConfigurationRecord>, StoreError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("config store mutex poisoned".to_string()))?;
        Ok(guard.records.get(identity).cloned())
    }

    fn write(&self, identity: &Identity, record: &ConfigurationRecord) -> Result<(), StoreError> {
        if record.identity != *identity {
            return Err(StoreError::Rejected(format!(
                "record identity {} does not match {identity}",
                record.identity
            )));
        }
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("config store mutex poisoned".to_string()))?;
        if !guard.defaults.contains_key(identity) {
            return Err(StoreError::NotRegistered(identity.to_string()));
        }
        guard.records.insert(identity.clone(), record.clone());
        drop(guard);
        Ok(())
    }

    fn metatype_defaults(&self, identity: &Identity) -> Result<ConfigurationRecord, StoreError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("config store mutex poisoned".to_string()))?;
        guard
            .defaults
            .get(identity)
            .cloned()
            .ok_or_else(|| StoreError::NotRegistered(identity.to_string()))
    }

    fn identities(&self) -> Result<Vec<Identity>, StoreError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("config store mutex poisoned".to_string()))?;
        Ok(guard.defaults.keys().cloned().collect())
    }
}

// ============================================================================
// SECTION: Store-Backed Policy View
// ============================================================================

/// Policy view that projects the stored record of one identity.
#[derive(Debug, Clone)]
pub struct StorePolicyView<S> {
    /// Backing configuration store.
    store: S,
    /// Identity whose record is projected.
    identity: Identity,
}

impl<S: ConfigStore> StorePolicyView<S> {
    /// Creates a view over `identity` in `store`.
    #[must_use]
    pub const fn new(store: S, identity: Identity) -> Self {
        Self {
            store,
            identity,
        }
    }
}

impl<S: ConfigStore> PolicyView for StorePolicyView<S> {
    fn active_policies(&self) -> Result<Vec<ContextPolicy>, ObservationError> {
        let record = self
            .store
            .read(&self.identity)
            .map_err(|err| ObservationError::Unreachable(err.to_string()))?;
        let Some(record) = record else {
            return Ok(Vec::new());
        };
        let projection = PolicyProjection::from_record(&record)
            .map_err(|err| ObservationError::Malformed(err.to_string()))?;
        Ok(projection.to_policies())
    }
}
