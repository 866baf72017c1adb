// crates/policy-sync-core/src/core/policy.rs
// ============================================================================
// Module: Policy Sync Context Policies
// Description: Context policy snapshots and the record-to-policy projection.
// Purpose: Derive the policies a configuration record grants per web context.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`ContextPolicy`] is what a running consumer asserts for one context
//! path: the accepted authentication methods and the attribute names it
//! requires. [`PolicyProjection`] derives the full set of context policies a
//! [`ConfigurationRecord`] grants, using the context-policy option vocabulary
//! defined here.
//!
//! Policies are compared for behavioral equivalence. Authentication methods
//! and attribute names are case-insensitive, list order is irrelevant, and a
//! trailing `/` on a path is ignored (except for the root context).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::record::ConfigurationRecord;
use crate::core::record::OptionValue;

// ============================================================================
// SECTION: Vocabulary
// ============================================================================

/// Authentication methods applied to web contexts.
pub const WEB_AUTH_TYPES: &str = "webAuthenticationTypes";
/// Authentication methods applied to contexts beneath an endpoint root.
pub const ENDPOINT_AUTH_TYPES: &str = "endpointAuthenticationTypes";
/// Required attribute entries of the form `path=attributes`.
pub const REQUIRED_ATTRIBUTES: &str = "requiredAttributes";
/// Context paths that require no authentication.
pub const WHITELIST_CONTEXTS: &str = "whiteListContexts";
/// Grants the guest method on every non-whitelisted context.
pub const GUEST_ACCESS: &str = "guestAccess";
/// Session reuse flag; carried through without projection.
pub const SESSION_ACCESS: &str = "sessionAccess";

/// Authentication method granted by `guestAccess`.
pub const GUEST_METHOD: &str = "GUEST";
/// Root web context.
pub const ROOT_CONTEXT: &str = "/";
/// Context roots that use endpoint authentication types.
pub const ENDPOINT_CONTEXT_ROOTS: &[&str] = &["/services"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Malformed configuration input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid config: {0}")]
pub struct InvalidConfigError(pub String);

// ============================================================================
// SECTION: Context Policy
// ============================================================================

/// Policy asserted for a single context path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPolicy {
    /// Context path the policy applies to.
    pub path: String,
    /// Accepted authentication methods.
    #[serde(default)]
    pub auth_methods: BTreeSet<String>,
    /// Attribute names required of a subject.
    #[serde(default)]
    pub attribute_names: BTreeSet<String>,
}

impl ContextPolicy {
    /// Creates a policy with no methods and no attributes.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            auth_methods: BTreeSet::new(),
            attribute_names: BTreeSet::new(),
        }
    }

    /// Returns the policy with the given authentication methods.
    #[must_use]
    pub fn with_auth_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth_methods.extend(methods.into_iter().map(Into::into));
        self
    }

    /// Returns the policy with the given attribute names.
    #[must_use]
    pub fn with_attribute_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_names.extend(names.into_iter().map(Into::into));
        self
    }
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes a context path for comparison.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() && trimmed.starts_with('/') {
        return ROOT_CONTEXT.to_string();
    }
    stripped.to_string()
}

/// Normalizes an authentication method for comparison.
#[must_use]
pub fn normalize_auth_method(method: &str) -> String {
    method.trim().to_ascii_uppercase()
}

/// Normalizes an attribute name for comparison.
#[must_use]
pub fn normalize_attribute_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Returns true when `prefix` covers `path` on a segment boundary.
///
/// Both arguments must already be normalized.
#[must_use]
pub fn is_segment_prefix(prefix: &str, path: &str) -> bool {
    if prefix == ROOT_CONTEXT {
        return path.starts_with('/');
    }
    path == prefix
        || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Context policies granted by a configuration record.
///
/// # Invariants
/// - Keys are normalized context paths; the root context is always present.
/// - Stored methods and attribute names are normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyProjection {
    /// Policies keyed by normalized context path.
    policies: BTreeMap<String, ContextPolicy>,
}

impl PolicyProjection {
    /// Projects a record into the context policies it grants.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfigError`] when the identity is blank or a known
    /// option has the wrong type or an unparseable value.
    pub fn from_record(record: &ConfigurationRecord) -> Result<Self, InvalidConfigError> {
        if record.identity.is_blank() {
            return Err(InvalidConfigError("identity must be non-empty".to_string()));
        }
        let web_methods = auth_types(record, WEB_AUTH_TYPES)?;
        let endpoint_methods = auth_types(record, ENDPOINT_AUTH_TYPES)?;
        let guest = flag(record, GUEST_ACCESS)?;
        let whitelist = list_values(record, WHITELIST_CONTEXTS)?
            .iter()
            .map(String::as_str)
            .map(normalize_path)
            .collect::<BTreeSet<_>>();
        let required = required_attributes(record)?;

        let mut contexts = BTreeSet::new();
        contexts.insert(ROOT_CONTEXT.to_string());
        contexts.extend(ENDPOINT_CONTEXT_ROOTS.iter().map(|root| (*root).to_string()));
        contexts.extend(whitelist.iter().cloned());
        contexts.extend(required.keys().cloned());

        let mut policies = BTreeMap::new();
        for context in contexts {
            let mut policy = ContextPolicy::new(context.clone());
            let whitelisted = whitelist.iter().any(|entry| is_segment_prefix(entry, &context));
            if !whitelisted {
                let endpoint =
                    ENDPOINT_CONTEXT_ROOTS.iter().any(|root| is_segment_prefix(root, &context));
                let methods = if endpoint { &endpoint_methods } else { &web_methods };
                policy.auth_methods.extend(methods.iter().cloned());
                if guest {
                    policy.auth_methods.insert(GUEST_METHOD.to_string());
                }
                if let Some(names) = longest_prefix(&required, &context) {
                    policy.attribute_names.extend(names.iter().cloned());
                }
            }
            policies.insert(context, policy);
        }
        Ok(Self {
            policies,
        })
    }

    /// Iterates the projected policies in path order.
    pub fn policies(&self) -> impl Iterator<Item = &ContextPolicy> {
        self.policies.values()
    }

    /// Returns the projected policies as an owned list in path order.
    #[must_use]
    pub fn to_policies(&self) -> Vec<ContextPolicy> {
        self.policies.values().cloned().collect()
    }

    /// Resolves the policy governing `path` (longest configured context).
    #[must_use]
    pub fn policy_for(&self, path: &str) -> Option<&ContextPolicy> {
        let path = normalize_path(path);
        longest_prefix(&self.policies, &path)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the entry whose key is the longest segment prefix of `path`.
fn longest_prefix<'a, V>(map: &'a BTreeMap<String, V>, path: &str) -> Option<&'a V> {
    map.iter()
        .filter(|(key, _)| is_segment_prefix(key, path))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, value)| value)
}

/// Reads an authentication type option (`|` or `,` separated).
fn auth_types(
    record: &ConfigurationRecord,
    name: &str,
) -> Result<BTreeSet<String>, InvalidConfigError> {
    let raw: Vec<String> = match record.get(name) {
        None => Vec::new(),
        Some(OptionValue::String(value)) => vec![value.clone()],
        Some(OptionValue::List(values)) => values.clone(),
        Some(other) => return Err(wrong_type(name, "string", other)),
    };
    Ok(raw
        .iter()
        .flat_map(|value| value.split(['|', ',']))
        .map(normalize_auth_method)
        .filter(|method| !method.is_empty())
        .collect())
}

/// Reads a boolean option; string `true`/`false` is accepted.
fn flag(record: &ConfigurationRecord, name: &str) -> Result<bool, InvalidConfigError> {
    match record.get(name) {
        None => Ok(false),
        Some(OptionValue::Bool(value)) => Ok(*value),
        Some(OptionValue::String(value)) if value.trim().eq_ignore_ascii_case("true") => Ok(true),
        Some(OptionValue::String(value)) if value.trim().eq_ignore_ascii_case("false") => {
            Ok(false)
        }
        Some(other) => Err(wrong_type(name, "bool", other)),
    }
}

/// Reads a list option; a string value is split on commas.
fn list_values(
    record: &ConfigurationRecord,
    name: &str,
) -> Result<Vec<String>, InvalidConfigError> {
    match record.get(name) {
        None => Ok(Vec::new()),
        Some(OptionValue::String(value)) => Ok(value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect()),
        Some(OptionValue::List(values)) => {
            let mut out = Vec::with_capacity(values.len());
            for value in values {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(InvalidConfigError(format!("{name} entries must be non-empty")));
                }
                out.push(trimmed.to_string());
            }
            Ok(out)
        }
        Some(other) => Err(wrong_type(name, "list", other)),
    }
}

/// Parses `requiredAttributes` into normalized attribute sets per context.
fn required_attributes(
    record: &ConfigurationRecord,
) -> Result<BTreeMap<String, BTreeSet<String>>, InvalidConfigError> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in list_values(record, REQUIRED_ATTRIBUTES)? {
        let Some((path, attributes)) = entry.split_once('=') else {
            return Err(InvalidConfigError(format!(
                "{REQUIRED_ATTRIBUTES} entry must be path=attributes: {entry}"
            )));
        };
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(InvalidConfigError(format!(
                "{REQUIRED_ATTRIBUTES} entry has an empty path: {entry}"
            )));
        }
        let attributes = attributes.trim();
        let inner = attributes
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(attributes);
        let names = inner
            .split(';')
            .map(|pair| pair.split_once('=').map_or(pair, |(name, _)| name))
            .map(normalize_attribute_name)
            .filter(|name| !name.is_empty());
        out.entry(path).or_default().extend(names);
    }
    Ok(out)
}

/// Builds a wrong-type error for an option.
fn wrong_type(name: &str, expected: &str, actual: &OptionValue) -> InvalidConfigError {
    InvalidConfigError(format!("{name} must be a {expected}, found {}", actual.kind()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
