// crates/policy-sync-core/src/runtime/readiness.rs
// ============================================================================
// Module: Policy Sync Readiness Helpers
// Description: Bounded waits for a target to report an expected status.
// Purpose: Confirm that a policy change is visible at the request surface.
// Dependencies: crate::interfaces, crate::runtime::retry, thiserror
// ============================================================================

//! ## Overview
//! Convergence proves the policy view adopted a record; readiness proves a
//! request surface behaves accordingly (for example, an endpoint answering
//! `401` once basic authentication is enforced). Probe failures count as
//! "not yet" and are retried within the retry spec.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::interfaces::StatusProbe;
use crate::runtime::retry::CancellationToken;
use crate::runtime::retry::RetryScheduler;
use crate::runtime::retry::RetrySpec;
use crate::runtime::retry::WaitOutcome;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Readiness wait errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessError {
    /// Target never reported the expected status.
    #[error(
        "{target} not ready after {attempts} attempts: expected {expected}, last {last_status}"
    )]
    NotReady {
        /// Probed target.
        target: String,
        /// Status that was awaited.
        expected: u16,
        /// Last status or probe failure observed.
        last_status: String,
        /// Probe attempts made.
        attempts: u32,
    },
    /// Caller cancelled the wait.
    #[error("readiness wait for {target} cancelled")]
    Cancelled {
        /// Probed target.
        target: String,
    },
}

// ============================================================================
// SECTION: Waits
// ============================================================================

/// Polls `probe` until `target` reports `expected`.
///
/// # Errors
///
/// Returns [`ReadinessError::NotReady`] when the retry spec is spent and
/// [`ReadinessError::Cancelled`] when `cancel` fires.
pub fn wait_for_status<P>(
    probe: &P,
    target: &str,
    expected: u16,
    spec: RetrySpec,
    cancel: Option<&CancellationToken>,
) -> Result<(), ReadinessError>
where
    P: StatusProbe + ?Sized,
{
    let mut last_status = String::from("no probe completed");
    let outcome = RetryScheduler::new(spec).wait_until(
        || match probe.status(target) {
            Ok(status) if status == expected => true,
            Ok(status) => {
                last_status = status.to_string();
                false
            }
            Err(err) => {
                last_status = err.to_string();
                false
            }
        },
        cancel,
    );
    match outcome {
        WaitOutcome::Satisfied {
            ..
        } => Ok(()),
        WaitOutcome::Exhausted {
            attempts, ..
        } => Err(ReadinessError::NotReady {
            target: target.to_string(),
            expected,
            last_status,
            attempts,
        }),
        WaitOutcome::Cancelled {
            ..
        } => Err(ReadinessError::Cancelled {
            target: target.to_string(),
        }),
    }
}
