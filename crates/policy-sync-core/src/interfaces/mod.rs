// crates/policy-sync-core/src/interfaces/mod.rs
// ============================================================================
// Module: Policy Sync Interfaces
// Description: Backend-agnostic interfaces for configuration, policy, and readiness.
// Purpose: Define the contract surfaces used by the synchronizer runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the synchronizer integrates with the live system
//! without embedding backend-specific details. The configuration store is the
//! only mutable shared resource; everything else is read-only observation or a
//! best-effort notification hook.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::core::ConfigurationRecord;
use crate::core::ContextPolicy;
use crate::core::Identity;

// ============================================================================
// SECTION: Configuration Store
// ============================================================================

/// Configuration store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Identity is not known to the store.
    #[error("identity not registered: {0}")]
    NotRegistered(String),
    /// Store could not be reached.
    #[error("config store unavailable: {0}")]
    Unavailable(String),
    /// Store rejected the record.
    #[error("config store rejected record: {0}")]
    Rejected(String),
    /// Stored data is corrupted.
    #[error("config store corruption: {0}")]
    Corrupt(String),
}

/// Persistent configuration registry keyed by identity.
///
/// Writes to one identity must be atomic from a reader's perspective: readers
/// observe either the previous record or the new one, never a mix.
pub trait ConfigStore {
    /// Reads the current record for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn read(&self, identity: &Identity) -> Result<Option<ConfigurationRecord>, StoreError>;

    /// Replaces the record for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the identity is unknown or the write fails.
    fn write(&self, identity: &Identity, record: &ConfigurationRecord) -> Result<(), StoreError>;

    /// Returns the factory defaults for an identity.
    ///
    /// An empty record means the defaults have not been published yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when defaults cannot be read.
    fn metatype_defaults(&self, identity: &Identity) -> Result<ConfigurationRecord, StoreError>;

    /// Enumerates the identities known to the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn identities(&self) -> Result<Vec<Identity>, StoreError>;
}

// ============================================================================
// SECTION: Policy View
// ============================================================================

/// Policy observation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    /// Live system could not be reached.
    #[error("policy view unreachable: {0}")]
    Unreachable(String),
    /// Live system reported a policy that cannot be interpreted.
    #[error("policy view malformed: {0}")]
    Malformed(String),
}

/// Read-only projection of the currently active policy.
pub trait PolicyView {
    /// Lists the active context policies in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`ObservationError`] when the live system cannot be observed.
    fn active_policies(&self) -> Result<Vec<ContextPolicy>, ObservationError>;
}

// ============================================================================
// SECTION: Dependent Components
// ============================================================================

/// Dependent component readiness errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessHookError {
    /// Components did not settle within the hint.
    #[error("dependent components not ready: {0}")]
    NotReady(String),
}

/// Hook that waits for components depending on a configuration to reload.
pub trait ReadinessHook {
    /// Blocks until dependent components are ready or the hint elapses.
    ///
    /// # Errors
    ///
    /// Returns [`ReadinessHookError`] when components did not become ready.
    fn wait_for_ready(&self, timeout_hint: Duration) -> Result<(), ReadinessHookError>;
}

/// Readiness hook that returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReadinessHook;

impl ReadinessHook for NoopReadinessHook {
    fn wait_for_ready(&self, _timeout_hint: Duration) -> Result<(), ReadinessHookError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Status Probe
// ============================================================================

/// Status probe errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Probe request failed.
    #[error("status probe failed: {0}")]
    Failed(String),
}

/// Probe that reports a status code for a target (for example an HTTP URL).
pub trait StatusProbe {
    /// Returns the current status code of the target.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the target cannot be probed.
    fn status(&self, target: &str) -> Result<u16, ProbeError>;
}
