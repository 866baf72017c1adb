// crates/policy-sync-core/src/lib.rs
// ============================================================================
// Module: Policy Sync Core Library
// Description: Public API surface for the Policy Sync core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Policy Sync writes a configuration record for one identity and blocks until
//! the live system demonstrably operates under it. Convergence is judged by
//! comparing the policy the system reports against the policy the written
//! record implies, polled on a bounded schedule. Backends integrate through
//! the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ConfigStore;
pub use interfaces::NoopReadinessHook;
pub use interfaces::ObservationError;
pub use interfaces::PolicyView;
pub use interfaces::ProbeError;
pub use interfaces::ReadinessHook;
pub use interfaces::ReadinessHookError;
pub use interfaces::StatusProbe;
pub use interfaces::StoreError;
pub use runtime::CancellationToken;
pub use runtime::ConfigSynchronizer;
pub use runtime::ConvergenceChecker;
pub use runtime::ConvergenceResult;
pub use runtime::Divergence;
pub use runtime::InMemoryConfigStore;
pub use runtime::PolicyConfigurator;
pub use runtime::ReadinessError;
pub use runtime::RetryScheduler;
pub use runtime::RetrySpec;
pub use runtime::RetrySpecError;
pub use runtime::StorePolicyView;
pub use runtime::SyncAuditSink;
pub use runtime::SyncError;
pub use runtime::SynchronizerConfig;
pub use runtime::WaitOutcome;
