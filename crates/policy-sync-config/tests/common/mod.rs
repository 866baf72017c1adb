// crates/policy-sync-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for policy-sync-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::path::PathBuf;

use policy_sync_config::PolicySyncConfig;
use tempfile::TempDir;

/// Parses a TOML string into a `PolicySyncConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<PolicySyncConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<PolicySyncConfig, toml::de::Error> {
    config_from_toml("")
}

/// Writes `contents` to a config file inside a fresh temp directory.
pub fn write_config(contents: &[u8]) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("policy-sync.toml");
    std::fs::write(&path, contents)?;
    Ok((dir, path))
}
