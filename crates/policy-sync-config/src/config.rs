// crates/policy-sync-config/src/config.rs
// ============================================================================
// Module: Policy Sync Configuration
// Description: Configuration loading and validation for Policy Sync.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: policy-sync-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits
//! and validated before any synchronizer is built from it. Every section is
//! optional; missing sections take the defaults documented on each field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use policy_sync_core::ConfigStore;
use policy_sync_core::ConfigSynchronizer;
use policy_sync_core::Identity;
use policy_sync_core::PolicyConfigurator;
use policy_sync_core::PolicyView;
use policy_sync_core::ReadinessHook;
use policy_sync_core::RetrySpec;
use policy_sync_core::SynchronizerConfig;
use policy_sync_core::runtime::DEFAULT_POLICY_IDENTITY;
use policy_sync_core::runtime::DEFAULT_WHITELIST;
use policy_sync_core::runtime::FileSyncAuditSink;
use policy_sync_core::runtime::NoopSyncAuditSink;
use policy_sync_core::runtime::StderrSyncAuditSink;
use policy_sync_core::runtime::SyncAuditSink;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "policy-sync.toml";
/// Environment variable that overrides the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "POLICY_SYNC_CONFIG";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum wait accepted for any poll loop or readiness hint.
pub(crate) const MAX_WAIT_MS: u64 = 60 * 60 * 1000;
/// Maximum number of default whitelist entries.
pub(crate) const MAX_WHITELIST_ENTRIES: usize = 64;
/// Default convergence poll interval.
pub(crate) const DEFAULT_CONVERGENCE_INTERVAL_MS: u64 = 1_000;
/// Default convergence deadline.
pub(crate) const DEFAULT_CONVERGENCE_MAX_WAIT_MS: u64 = 60_000;
/// Default metatype defaults poll interval.
pub(crate) const DEFAULT_DEFAULTS_INTERVAL_MS: u64 = 2_000;
/// Default metatype defaults deadline.
pub(crate) const DEFAULT_DEFAULTS_MAX_WAIT_MS: u64 = 60_000;
/// Default readiness poll interval.
pub(crate) const DEFAULT_READINESS_INTERVAL_MS: u64 = 1_000;
/// Default readiness deadline.
pub(crate) const DEFAULT_READINESS_MAX_WAIT_MS: u64 = 300_000;
/// Default dependent readiness hint.
pub(crate) const DEFAULT_READY_TIMEOUT_MS: u64 = 300_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Policy Sync configuration root.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySyncConfig {
    /// Convergence polling after a write.
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    /// Metatype defaults polling before a write.
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Request-surface readiness polling.
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// Dependent component readiness hint.
    #[serde(default)]
    pub dependents: DependentsConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Web context policy target.
    #[serde(default)]
    pub policy: PolicyTargetConfig,
    /// Optional config source metadata (not serialized).
    #[serde(skip)]
    pub source_modified_at: Option<SystemTime>,
}

impl PolicySyncConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path argument wins, then `POLICY_SYNC_CONFIG`, then
    /// `policy-sync.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.convergence.validate()?;
        validate_poll("defaults", self.defaults.poll_interval_ms, self.defaults.max_wait_ms)?;
        validate_poll("readiness", self.readiness.poll_interval_ms, self.readiness.max_wait_ms)?;
        self.dependents.validate()?;
        self.audit.validate()?;
        self.policy.validate()?;
        Ok(())
    }

    /// Builds synchronizer settings from the convergence, defaults, and
    /// dependents sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a section cannot form a retry spec.
    pub fn synchronizer_config(&self) -> Result<SynchronizerConfig, ConfigError> {
        let mut convergence = retry_spec(
            "convergence",
            self.convergence.poll_interval_ms,
            self.convergence.max_wait_ms,
        )?;
        if let Some(attempts) = self.convergence.max_attempts {
            convergence = convergence
                .with_max_attempts(attempts)
                .map_err(|err| ConfigError::Invalid(format!("convergence: {err}")))?;
        }
        Ok(SynchronizerConfig {
            convergence,
            defaults: retry_spec(
                "defaults",
                self.defaults.poll_interval_ms,
                self.defaults.max_wait_ms,
            )?,
            ready_timeout: Duration::from_millis(self.dependents.ready_timeout_ms),
        })
    }

    /// Builds the request-surface readiness spec.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the section cannot form a retry spec.
    pub fn readiness_spec(&self) -> Result<RetrySpec, ConfigError> {
        retry_spec("readiness", self.readiness.poll_interval_ms, self.readiness.max_wait_ms)
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file sink cannot be opened.
    pub fn build_audit_sink(&self) -> Result<Arc<dyn SyncAuditSink>, ConfigError> {
        match self.audit.sink {
            AuditSinkKind::None => Ok(Arc::new(NoopSyncAuditSink)),
            AuditSinkKind::Stderr => Ok(Arc::new(StderrSyncAuditSink)),
            AuditSinkKind::File => {
                let path = self
                    .audit
                    .path
                    .as_deref()
                    .ok_or_else(|| ConfigError::Invalid("audit.path is required".to_string()))?;
                let sink = FileSyncAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Returns the web context policy identity.
    #[must_use]
    pub fn policy_identity(&self) -> Identity {
        Identity::new(self.policy.identity.trim())
    }

    /// Builds a web context configurator over `synchronizer`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the readiness section is invalid.
    pub fn configurator<'a, S, V, R>(
        &self,
        synchronizer: &'a ConfigSynchronizer<S, V, R>,
    ) -> Result<PolicyConfigurator<'a, S, V, R>, ConfigError>
    where
        S: ConfigStore,
        V: PolicyView,
        R: ReadinessHook,
    {
        Ok(PolicyConfigurator::new(synchronizer)
            .with_identity(self.policy_identity())
            .with_default_whitelist(
                self.policy
                    .default_whitelist
                    .iter()
                    .map(|entry| entry.trim().to_string())
                    .collect(),
            )
            .with_readiness(self.readiness_spec()?))
    }
}

// ============================================================================
// SECTION: Poll Sections
// ============================================================================

/// Convergence polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvergenceConfig {
    /// Sleep before each convergence check, in milliseconds.
    #[serde(default = "default_convergence_interval_ms")]
    pub poll_interval_ms: u64,
    /// Total convergence budget, in milliseconds.
    #[serde(default = "default_convergence_max_wait_ms")]
    pub max_wait_ms: u64,
    /// Optional cap on convergence checks within the budget.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_convergence_interval_ms(),
            max_wait_ms: default_convergence_max_wait_ms(),
            max_attempts: None,
        }
    }
}

impl ConvergenceConfig {
    /// Validates convergence settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_poll("convergence", self.poll_interval_ms, self.max_wait_ms)?;
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "convergence.max_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metatype defaults polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultsConfig {
    /// Sleep between defaults reads, in milliseconds.
    #[serde(default = "default_defaults_interval_ms")]
    pub poll_interval_ms: u64,
    /// Total defaults budget, in milliseconds.
    #[serde(default = "default_defaults_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_defaults_interval_ms(),
            max_wait_ms: default_defaults_max_wait_ms(),
        }
    }
}

/// Request-surface readiness polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessConfig {
    /// Sleep before each probe, in milliseconds.
    #[serde(default = "default_readiness_interval_ms")]
    pub poll_interval_ms: u64,
    /// Total readiness budget, in milliseconds.
    #[serde(default = "default_readiness_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_readiness_interval_ms(),
            max_wait_ms: default_readiness_max_wait_ms(),
        }
    }
}

/// Dependent component readiness configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DependentsConfig {
    /// Timeout hint handed to the readiness hook, in milliseconds.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
}

impl Default for DependentsConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: default_ready_timeout_ms(),
        }
    }
}

impl DependentsConfig {
    /// Validates the readiness hint.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ready_timeout_ms == 0 || self.ready_timeout_ms > MAX_WAIT_MS {
            return Err(ConfigError::Invalid(format!(
                "dependents.ready_timeout_ms must be between 1 and {MAX_WAIT_MS}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Drop audit events.
    #[default]
    None,
    /// Write JSON lines to stderr.
    Stderr,
    /// Append JSON lines to a file.
    File,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path (JSON lines), required for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => validate_path_string("audit.path", path),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Policy Target
// ============================================================================

/// Web context policy target configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyTargetConfig {
    /// Identity of the policy manager configuration.
    #[serde(default = "default_policy_identity")]
    pub identity: String,
    /// Contexts that stay whitelisted across canned policy changes.
    #[serde(default = "default_whitelist")]
    pub default_whitelist: Vec<String>,
}

impl Default for PolicyTargetConfig {
    fn default() -> Self {
        Self {
            identity: default_policy_identity(),
            default_whitelist: default_whitelist(),
        }
    }
}

impl PolicyTargetConfig {
    /// Validates the policy target.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.trim().is_empty() {
            return Err(ConfigError::Invalid("policy.identity must be non-empty".to_string()));
        }
        if self.default_whitelist.len() > MAX_WHITELIST_ENTRIES {
            return Err(ConfigError::Invalid(format!(
                "policy.default_whitelist exceeds {MAX_WHITELIST_ENTRIES} entries"
            )));
        }
        if self.default_whitelist.iter().any(|entry| entry.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "policy.default_whitelist entries must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a poll interval and deadline pair.
fn validate_poll(section: &str, interval_ms: u64, max_wait_ms: u64) -> Result<(), ConfigError> {
    if interval_ms == 0 {
        return Err(ConfigError::Invalid(format!(
            "{section}.poll_interval_ms must be greater than zero"
        )));
    }
    if max_wait_ms < interval_ms {
        return Err(ConfigError::Invalid(format!(
            "{section}.max_wait_ms must be at least poll_interval_ms"
        )));
    }
    if max_wait_ms > MAX_WAIT_MS {
        return Err(ConfigError::Invalid(format!(
            "{section}.max_wait_ms must not exceed {MAX_WAIT_MS}"
        )));
    }
    Ok(())
}

/// Builds a retry spec from millisecond settings.
fn retry_spec(
    section: &str,
    interval_ms: u64,
    max_wait_ms: u64,
) -> Result<RetrySpec, ConfigError> {
    RetrySpec::new(Duration::from_millis(interval_ms), Duration::from_millis(max_wait_ms))
        .map_err(|err| ConfigError::Invalid(format!("{section}: {err}")))
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default convergence poll interval.
pub(crate) const fn default_convergence_interval_ms() -> u64 {
    DEFAULT_CONVERGENCE_INTERVAL_MS
}

/// Default convergence deadline.
pub(crate) const fn default_convergence_max_wait_ms() -> u64 {
    DEFAULT_CONVERGENCE_MAX_WAIT_MS
}

/// Default metatype defaults poll interval.
pub(crate) const fn default_defaults_interval_ms() -> u64 {
    DEFAULT_DEFAULTS_INTERVAL_MS
}

/// Default metatype defaults deadline.
pub(crate) const fn default_defaults_max_wait_ms() -> u64 {
    DEFAULT_DEFAULTS_MAX_WAIT_MS
}

/// Default readiness poll interval.
pub(crate) const fn default_readiness_interval_ms() -> u64 {
    DEFAULT_READINESS_INTERVAL_MS
}

/// Default readiness deadline.
pub(crate) const fn default_readiness_max_wait_ms() -> u64 {
    DEFAULT_READINESS_MAX_WAIT_MS
}

/// Default dependent readiness hint.
pub(crate) const fn default_ready_timeout_ms() -> u64 {
    DEFAULT_READY_TIMEOUT_MS
}

/// Default policy manager identity.
pub(crate) fn default_policy_identity() -> String {
    DEFAULT_POLICY_IDENTITY.to_string()
}

/// Default always-whitelisted contexts.
pub(crate) fn default_whitelist() -> Vec<String> {
    DEFAULT_WHITELIST.iter().map(ToString::to_string).collect()
}
