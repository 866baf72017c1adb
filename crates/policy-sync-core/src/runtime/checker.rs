// crates/policy-sync-core/src/runtime/checker.rs
// ============================================================================
// Module: Policy Sync Convergence Checker
// Description: Compares live context policies against a target record.
// Purpose: Decide whether a live system has adopted a desired configuration.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A [`ConvergenceChecker`] is built from the desired record and a
//! [`PolicyView`]. Each evaluation reads the live policies and requires every
//! active entry to be covered by the target: same context path, and target
//! methods and attribute names that are supersets of the live ones. The target
//! may grant more than the live system currently asserts, which tolerates
//! monotonic policy refinement during rollout.
//!
//! The first divergence in enumeration order wins. An empty live view is
//! vacuously converged. Failing to observe the live system is reported as an
//! [`ObservationError`], never as "not converged".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::core::ConfigurationRecord;
use crate::core::ContextPolicy;
use crate::core::InvalidConfigError;
use crate::core::PolicyProjection;
use crate::core::policy::normalize_attribute_name;
use crate::core::policy::normalize_auth_method;
use crate::core::policy::normalize_path;
use crate::interfaces::ObservationError;
use crate::interfaces::PolicyView;

// ============================================================================
// SECTION: Results
// ============================================================================

/// Reason a live policy is not covered by the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    /// No target context governs the live path.
    MissingContext {
        /// Live context path.
        path: String,
    },
    /// The live path resolves to a different target context.
    ContextMismatch {
        /// Live context path.
        observed: String,
        /// Target context the path resolved to.
        target: String,
    },
    /// Live authentication methods not granted by the target.
    AuthMethods {
        /// Live context path.
        path: String,
        /// Methods missing from the target, as observed.
        missing: Vec<String>,
    },
    /// Live attribute names not granted by the target.
    AttributeNames {
        /// Live context path.
        path: String,
        /// Attribute names missing from the target, as observed.
        missing: Vec<String>,
    },
    /// The live system could not be observed.
    Unobservable {
        /// Observation failure message.
        message: String,
    },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingContext {
                path,
            } => write!(f, "no target policy for context {path}"),
            Self::ContextMismatch {
                observed,
                target,
            } => write!(f, "context {observed} resolves to target context {target}"),
            Self::AuthMethods {
                path,
                missing,
            } => write!(
                f,
                "context {path} asserts auth methods not granted by target: {}",
                missing.join(", ")
            ),
            Self::AttributeNames {
                path,
                missing,
            } => write!(
                f,
                "context {path} requires attributes not granted by target: {}",
                missing.join(", ")
            ),
            Self::Unobservable {
                message,
            } => write!(f, "policy view unobservable: {message}"),
        }
    }
}

/// Outcome of one convergence evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceResult {
    /// True when every live policy is covered by the target.
    pub matched: bool,
    /// First divergence found, when not matched.
    pub divergence: Option<Divergence>,
}

impl ConvergenceResult {
    /// Returns a matched result.
    #[must_use]
    pub const fn converged() -> Self {
        Self {
            matched: true,
            divergence: None,
        }
    }

    /// Returns a diverged result with a diagnostic.
    #[must_use]
    pub const fn diverged(divergence: Divergence) -> Self {
        Self {
            matched: false,
            divergence: Some(divergence),
        }
    }
}

// ============================================================================
// SECTION: Checker
// ============================================================================

/// Predicate closed over a desired record and a live policy view.
#[derive(Debug)]
pub struct ConvergenceChecker<'a, V> {
    /// Policies granted by the desired record.
    target: PolicyProjection,
    /// Live policy view.
    view: &'a V,
}

impl<'a, V: PolicyView> ConvergenceChecker<'a, V> {
    /// Builds a checker for the desired record.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfigError`] when the record is malformed.
    pub fn build(desired: &ConfigurationRecord, view: &'a V) -> Result<Self, InvalidConfigError> {
        Ok(Self::from_projection(PolicyProjection::from_record(desired)?, view))
    }

    /// Builds a checker from an existing projection.
    #[must_use]
    pub const fn from_projection(target: PolicyProjection, view: &'a V) -> Self {
        Self {
            target,
            view,
        }
    }

    /// Returns the target projection.
    #[must_use]
    pub const fn target(&self) -> &PolicyProjection {
        &self.target
    }

    /// Reads the live policies and compares them against the target.
    ///
    /// # Errors
    ///
    /// Returns [`ObservationError`] when the live system cannot be observed.
    pub fn evaluate(&self) -> Result<ConvergenceResult, ObservationError> {
        let live = self.view.active_policies()?;
        Ok(compare(&self.target, &live))
    }
}

/// Compares live policies against a target projection.
#[must_use]
pub fn compare(target: &PolicyProjection, live: &[ContextPolicy]) -> ConvergenceResult {
    for policy in live {
        if let Some(divergence) = diverges(target, policy) {
            return ConvergenceResult::diverged(divergence);
        }
    }
    ConvergenceResult::converged()
}

/// Returns the first reason `policy` is not covered by the target.
fn diverges(target: &PolicyProjection, policy: &ContextPolicy) -> Option<Divergence> {
    let observed = normalize_path(&policy.path);
    let Some(granted) = target.policy_for(&observed) else {
        return Some(Divergence::MissingContext {
            path: policy.path.clone(),
        });
    };
    if granted.path != observed {
        return Some(Divergence::ContextMismatch {
            observed: policy.path.clone(),
            target: granted.path.clone(),
        });
    }
    let missing_methods: Vec<String> = policy
        .auth_methods
        .iter()
        .filter(|method| !granted.auth_methods.contains(&normalize_auth_method(method)))
        .cloned()
        .collect();
    if !missing_methods.is_empty() {
        return Some(Divergence::AuthMethods {
            path: policy.path.clone(),
            missing: missing_methods,
        });
    }
    let missing_attributes: Vec<String> = policy
        .attribute_names
        .iter()
        .filter(|name| !granted.attribute_names.contains(&normalize_attribute_name(name)))
        .cloned()
        .collect();
    if !missing_attributes.is_empty() {
        return Some(Divergence::AttributeNames {
            path: policy.path.clone(),
            missing: missing_attributes,
        });
    }
    None
}
