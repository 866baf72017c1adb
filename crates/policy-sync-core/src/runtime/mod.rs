// crates/policy-sync-core/src/runtime/mod.rs
// ============================================================================
// Module: Policy Sync Runtime
// Description: Convergence checking, retry pacing, and synchronization.
// Purpose: Write configuration records and confirm the live system adopted them.
// Dependencies: crate::{core, interfaces}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Runtime modules turn a desired configuration into a confirmed live state.
//! The synchronizer owns ordering (defaults, write, poll, notify); the checker
//! and scheduler stay pure and reusable on their own.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod checker;
pub mod configurator;
pub mod readiness;
pub mod retry;
pub mod store;
pub mod synchronizer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileSyncAuditSink;
pub use audit::NoopSyncAuditSink;
pub use audit::StderrSyncAuditSink;
pub use audit::SyncAuditEvent;
pub use audit::SyncAuditEventParams;
pub use audit::SyncAuditSink;
pub use audit::SyncPhase;
pub use checker::ConvergenceChecker;
pub use checker::ConvergenceResult;
pub use checker::Divergence;
pub use configurator::DEFAULT_POLICY_IDENTITY;
pub use configurator::DEFAULT_READINESS_SPEC;
pub use configurator::DEFAULT_WHITELIST;
pub use configurator::PolicyConfigurator;
pub use readiness::ReadinessError;
pub use readiness::wait_for_status;
pub use retry::CancellationToken;
pub use retry::RetryBudget;
pub use retry::RetryScheduler;
pub use retry::RetrySpec;
pub use retry::RetrySpecError;
pub use retry::WaitOutcome;
pub use store::InMemoryConfigStore;
pub use store::StorePolicyView;
pub use synchronizer::ConfigSynchronizer;
pub use synchronizer::SyncError;
pub use synchronizer::SynchronizerConfig;
