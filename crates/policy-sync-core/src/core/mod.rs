// crates/policy-sync-core/src/core/mod.rs
// ============================================================================
// Module: Policy Sync Core Types
// Description: Canonical configuration records, identities, and context policies.
// Purpose: Provide stable, serializable types shared by the synchronizer runtime.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types describe what is written to a configuration store and what a
//! live consumer asserts after adopting it. They carry no I/O and no timing.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod policy;
pub mod record;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::Identity;
pub use policy::ContextPolicy;
pub use policy::InvalidConfigError;
pub use policy::PolicyProjection;
pub use record::ConfigOverrides;
pub use record::ConfigurationRecord;
pub use record::OptionValue;
pub use record::PreviousConfig;
