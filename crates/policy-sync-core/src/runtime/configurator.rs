// crates/policy-sync-core/src/runtime/configurator.rs
// ============================================================================
// Module: Policy Sync Web Context Configurator
// Description: Canned web context policy changes driven through a synchronizer.
// Purpose: Switch request surfaces between guest, basic, and SAML access.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`PolicyConfigurator`] builds overrides in the context-policy vocabulary
//! and hands them to a [`ConfigSynchronizer`]. Every change keeps a fixed set
//! of infrastructure contexts whitelisted, enables guest and session access,
//! and returns the previous configuration so callers can restore it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::core::ConfigOverrides;
use crate::core::Identity;
use crate::core::OptionValue;
use crate::core::PreviousConfig;
use crate::core::policy::ENDPOINT_AUTH_TYPES;
use crate::core::policy::GUEST_ACCESS;
use crate::core::policy::REQUIRED_ATTRIBUTES;
use crate::core::policy::SESSION_ACCESS;
use crate::core::policy::WEB_AUTH_TYPES;
use crate::core::policy::WHITELIST_CONTEXTS;
use crate::interfaces::ConfigStore;
use crate::interfaces::PolicyView;
use crate::interfaces::ReadinessHook;
use crate::interfaces::StatusProbe;
use crate::runtime::readiness::ReadinessError;
use crate::runtime::readiness::wait_for_status;
use crate::runtime::retry::RetrySpec;
use crate::runtime::synchronizer::ConfigSynchronizer;
use crate::runtime::synchronizer::SyncError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Identity of the web context policy manager.
pub const DEFAULT_POLICY_IDENTITY: &str =
    "org.codice.ddf.security.policy.context.impl.PolicyManager";

/// Contexts that stay unauthenticated regardless of the configured methods.
pub const DEFAULT_WHITELIST: &[&str] = &[
    "/services/SecurityTokenService",
    "/services/internal/metrics",
    "/services/saml",
    "/proxy",
    "/services/platform/config/ui",
];

/// Status returned once basic authentication is enforced.
const STATUS_UNAUTHORIZED: u16 = 401;
/// Status returned once guest access is allowed.
const STATUS_OK: u16 = 200;

/// Default readiness pacing: first probe after one second, five minutes total.
pub const DEFAULT_READINESS_SPEC: RetrySpec =
    RetrySpec::from_constants(Duration::from_secs(1), Duration::from_secs(300));

// ============================================================================
// SECTION: Configurator
// ============================================================================

/// Applies canned web context policies through a synchronizer.
pub struct PolicyConfigurator<'a, S, V, R> {
    /// Synchronizer that writes and confirms each change.
    synchronizer: &'a ConfigSynchronizer<S, V, R>,
    /// Policy manager identity.
    identity: Identity,
    /// Always-whitelisted contexts.
    default_whitelist: Vec<String>,
    /// Pacing for request-surface readiness waits.
    readiness: RetrySpec,
}

impl<'a, S, V, R> PolicyConfigurator<'a, S, V, R>
where
    S: ConfigStore,
    V: PolicyView,
    R: ReadinessHook,
{
    /// Creates a configurator for the default policy manager identity.
    #[must_use]
    pub fn new(synchronizer: &'a ConfigSynchronizer<S, V, R>) -> Self {
        Self {
            synchronizer,
            identity: Identity::new(DEFAULT_POLICY_IDENTITY),
            default_whitelist: DEFAULT_WHITELIST.iter().map(ToString::to_string).collect(),
            readiness: DEFAULT_READINESS_SPEC,
        }
    }

    /// Returns the configurator targeting another identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the configurator with a different always-whitelisted set.
    #[must_use]
    pub fn with_default_whitelist(mut self, whitelist: Vec<String>) -> Self {
        self.default_whitelist = whitelist;
        self
    }

    /// Returns the configurator with different readiness pacing.
    #[must_use]
    pub const fn with_readiness(mut self, readiness: RetrySpec) -> Self {
        self.readiness = readiness;
        self
    }

    /// Returns the policy manager identity.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the comma-separated whitelist with `extra` appended when non-blank.
    #[must_use]
    pub fn whitelist(&self, extra: Option<&str>) -> String {
        let mut whitelist = self.default_whitelist.join(",");
        if let Some(extra) = extra
            && !extra.trim().is_empty()
        {
            whitelist.push(',');
            whitelist.push_str(extra);
        }
        whitelist
    }

    /// Opens every non-whitelisted context to guests only.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the change does not converge.
    pub fn configure_rest_for_guest(
        &self,
        extra_whitelist: Option<&str>,
    ) -> Result<PreviousConfig, SyncError> {
        let whitelist = self.whitelist(extra_whitelist);
        self.configure_web_context_policy(Some(""), Some(""), None, Some(&whitelist))
    }

    /// Requires basic authentication on web and endpoint contexts.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the change does not converge.
    pub fn configure_rest_for_basic(
        &self,
        extra_whitelist: Option<&str>,
    ) -> Result<PreviousConfig, SyncError> {
        let whitelist = self.whitelist(extra_whitelist);
        self.configure_web_context_policy(Some("BASIC"), Some("BASIC"), None, Some(&whitelist))
    }

    /// Requires SAML authentication on web and endpoint contexts.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the change does not converge.
    pub fn configure_rest_for_saml(
        &self,
        extra_whitelist: Option<&str>,
    ) -> Result<PreviousConfig, SyncError> {
        let whitelist = self.whitelist(extra_whitelist);
        self.configure_web_context_policy(Some("SAML"), Some("SAML"), None, Some(&whitelist))
    }

    /// Writes a web context policy over the metatype defaults.
    ///
    /// `None` leaves an option at its default. Required attributes and the
    /// whitelist are comma lists and are ignored when blank. Guest and
    /// session access are always enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the change is invalid or does not converge.
    pub fn configure_web_context_policy(
        &self,
        web_auth_types: Option<&str>,
        endpoint_auth_types: Option<&str>,
        required_attributes: Option<&str>,
        whitelist: Option<&str>,
    ) -> Result<PreviousConfig, SyncError> {
        let mut overrides = ConfigOverrides::new();
        if let Some(types) = web_auth_types {
            overrides.insert(WEB_AUTH_TYPES, Some(OptionValue::from(types)));
        }
        if let Some(types) = endpoint_auth_types {
            overrides.insert(ENDPOINT_AUTH_TYPES, Some(OptionValue::from(types)));
        }
        if let Some(list) = required_attributes.and_then(comma_list) {
            overrides.insert(REQUIRED_ATTRIBUTES, Some(list));
        }
        if let Some(list) = whitelist.and_then(comma_list) {
            overrides.insert(WHITELIST_CONTEXTS, Some(list));
        }
        let overrides = overrides.set(GUEST_ACCESS, true).set(SESSION_ACCESS, true);
        self.synchronizer.synchronize(&self.identity, &overrides)
    }

    /// Waits until `url` answers `401`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadinessError`] when the status never appears.
    pub fn wait_for_basic_auth_ready<P>(&self, probe: &P, url: &str) -> Result<(), ReadinessError>
    where
        P: StatusProbe + ?Sized,
    {
        wait_for_status(probe, url, STATUS_UNAUTHORIZED, self.readiness, None)
    }

    /// Waits until `url` answers `200`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadinessError`] when the status never appears.
    pub fn wait_for_guest_auth_ready<P>(&self, probe: &P, url: &str) -> Result<(), ReadinessError>
    where
        P: StatusProbe + ?Sized,
    {
        wait_for_status(probe, url, STATUS_OK, self.readiness, None)
    }
}

/// Splits a non-blank comma string into a list value, dropping blank tokens.
fn comma_list(value: &str) -> Option<OptionValue> {
    if value.trim().is_empty() {
        return None;
    }
    let items: Vec<String> = value
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(ToString::to_string)
        .collect();
    Some(OptionValue::List(items))
}
