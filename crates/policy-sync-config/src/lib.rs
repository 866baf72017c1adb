// crates/policy-sync-config/src/lib.rs
// ============================================================================
// Module: Policy Sync Config Library
// Description: Canonical config model and validation for Policy Sync.
// Purpose: Single source of truth for policy-sync.toml semantics.
// Dependencies: policy-sync-core, serde, toml
// ============================================================================

//! ## Overview
//! `policy-sync-config` defines the configuration model for the synchronizer:
//! retry pacing, dependent readiness hints, audit sinks, and the web context
//! policy target. It validates fail-closed and builds the core runtime
//! settings from a loaded file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
