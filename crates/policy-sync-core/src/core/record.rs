// crates/policy-sync-core/src/core/record.rs
// ============================================================================
// Module: Policy Sync Configuration Records
// Description: Configuration records, override sets, and prior snapshots.
// Purpose: Model the values written to and restored from a configuration store.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ConfigurationRecord`] maps option names to values for one identity.
//! Callers describe a desired change as [`ConfigOverrides`], which are merged
//! over metatype defaults before the record is written. The record captured
//! before a write is returned as a [`PreviousConfig`] so callers can restore it.
//!
//! Option names outside the known vocabulary are carried through unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Identity;

// ============================================================================
// SECTION: Option Values
// ============================================================================

/// Configuration option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag.
    Bool(bool),
    /// Single string value.
    String(String),
    /// Ordered list of strings.
    List(Vec<String>),
}

impl OptionValue {
    /// Returns the string value when this is a string option.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Bool(_) | Self::List(_) => None,
        }
    }

    /// Returns the boolean value when this is a boolean option.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::String(_) | Self::List(_) => None,
        }
    }

    /// Returns the list values when this is a list option.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(values) => Some(values),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    /// Returns a short label for the value kind, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<&[&str]> for OptionValue {
    fn from(values: &[&str]) -> Self {
        Self::List(values.iter().map(ToString::to_string).collect())
    }
}

// ============================================================================
// SECTION: Configuration Record
// ============================================================================

/// Configuration record owned by a single identity.
///
/// # Invariants
/// - `options` is keyed by option name; iteration order is stable.
/// - Unknown option names are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    /// Owning identity.
    pub identity: Identity,
    /// Option values keyed by option name.
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

impl ConfigurationRecord {
    /// Creates an empty record for an identity.
    #[must_use]
    pub const fn new(identity: Identity) -> Self {
        Self {
            identity,
            options: BTreeMap::new(),
        }
    }

    /// Returns the record with an option set.
    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Returns the value of an option.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Returns true when the record carries no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Merges overrides over a defaults record for the given identity.
    ///
    /// `Some` overrides replace the default value. `None` overrides keep the
    /// default, so the key is absent when no default exists.
    #[must_use]
    pub fn merge(identity: Identity, defaults: &Self, overrides: &ConfigOverrides) -> Self {
        let mut options = defaults.options.clone();
        for (name, value) in overrides.iter() {
            if let Some(value) = value {
                options.insert(name.clone(), value.clone());
            }
        }
        Self {
            identity,
            options,
        }
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Desired option changes, applied over defaults.
///
/// A `None` entry is an explicit null marker: the default value applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigOverrides(BTreeMap<String, Option<OptionValue>>);

impl ConfigOverrides {
    /// Creates an empty override set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the override set with an option value.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.0.insert(name.into(), Some(value.into()));
        self
    }

    /// Returns the override set with an option marked to use its default.
    #[must_use]
    pub fn use_default(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), None);
        self
    }

    /// Inserts or replaces an override entry.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<OptionValue>) {
        self.0.insert(name.into(), value);
    }

    /// Returns the override entry for an option.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Option<OptionValue>> {
        self.0.get(name)
    }

    /// Iterates override entries in option-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<OptionValue>)> {
        self.0.iter()
    }

    /// Returns the number of override entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no overrides are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&ConfigurationRecord> for ConfigOverrides {
    fn from(record: &ConfigurationRecord) -> Self {
        Self(
            record
                .options
                .iter()
                .map(|(name, value)| (name.clone(), Some(value.clone())))
                .collect(),
        )
    }
}

// ============================================================================
// SECTION: Previous Configuration
// ============================================================================

/// Configuration observed before a synchronizer write.
///
/// # Invariants
/// - `Recorded` holds a non-empty record read from the store.
/// - `Defaults` is used when the store held no record (absent or empty); it
///   carries the metatype defaults read during the same operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "record", rename_all = "snake_case")]
pub enum PreviousConfig {
    /// Record that was stored before the write.
    Recorded(ConfigurationRecord),
    /// No prior record existed; defaults snapshot instead.
    Defaults(ConfigurationRecord),
}

impl PreviousConfig {
    /// Returns the captured record.
    #[must_use]
    pub const fn record(&self) -> &ConfigurationRecord {
        match self {
            Self::Recorded(record) | Self::Defaults(record) => record,
        }
    }

    /// Consumes the snapshot and returns the captured record.
    #[must_use]
    pub fn into_record(self) -> ConfigurationRecord {
        match self {
            Self::Recorded(record) | Self::Defaults(record) => record,
        }
    }

    /// Returns the identity the snapshot belongs to.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.record().identity
    }

    /// Returns true when the snapshot came from a stored record.
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }

    /// Returns the value of an option in the captured record.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.record().get(name)
    }

    /// Returns overrides that reapply the captured values over defaults.
    ///
    /// Keys absent from the snapshot fall back to their defaults; use
    /// `ConfigSynchronizer::restore` to reinstate the exact record.
    #[must_use]
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides::from(self.record())
    }
}
