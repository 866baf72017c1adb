// crates/policy-sync-core/src/runtime/synchronizer.rs
// ============================================================================
// Module: Policy Sync Configuration Synchronizer
// Description: Write a configuration and block until it is observably live.
// Purpose: Orchestrate defaults, write, bounded convergence polling, and readiness.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! [`ConfigSynchronizer`] swaps the configuration of one identity and waits
//! until the live policy view reflects it:
//!
//! 1. read the current record and the metatype defaults (retried while the
//!    defaults are empty or unreadable),
//! 2. merge the overrides over the defaults and validate the result,
//! 3. write the merged record (write failures are never retried),
//! 4. poll a [`ConvergenceChecker`] until it matches or the budget is spent,
//! 5. notify dependent components (best effort) and return the prior record.
//!
//! A timed-out write is not rolled back; the returned or reported state lets
//! the caller decide. Operations on the same identity are serialized within a
//! synchronizer; different identities proceed concurrently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use thiserror::Error;

use crate::core::ConfigOverrides;
use crate::core::ConfigurationRecord;
use crate::core::Identity;
use crate::core::PolicyProjection;
use crate::core::PreviousConfig;
use crate::interfaces::ConfigStore;
use crate::interfaces::PolicyView;
use crate::interfaces::ReadinessHook;
use crate::interfaces::StoreError;
use crate::runtime::audit::NoopSyncAuditSink;
use crate::runtime::audit::SyncAuditEvent;
use crate::runtime::audit::SyncAuditEventParams;
use crate::runtime::audit::SyncAuditSink;
use crate::runtime::audit::SyncPhase;
use crate::runtime::checker::ConvergenceChecker;
use crate::runtime::checker::Divergence;
use crate::runtime::retry::CancellationToken;
use crate::runtime::retry::RetryScheduler;
use crate::runtime::retry::RetrySpec;
use crate::runtime::retry::WaitOutcome;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default convergence poll interval.
const DEFAULT_CONVERGENCE_INTERVAL: Duration = Duration::from_secs(1);
/// Default convergence deadline.
const DEFAULT_CONVERGENCE_MAX: Duration = Duration::from_secs(60);
/// Default metatype defaults poll interval.
const DEFAULT_DEFAULTS_INTERVAL: Duration = Duration::from_secs(2);
/// Default metatype defaults deadline.
const DEFAULT_DEFAULTS_MAX: Duration = Duration::from_secs(60);
/// Default timeout hint passed to the dependent readiness hook.
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings for a [`ConfigSynchronizer`], passed explicitly at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynchronizerConfig {
    /// Pacing and budget for convergence polling.
    pub convergence: RetrySpec,
    /// Pacing and budget for reading metatype defaults.
    pub defaults: RetrySpec,
    /// Timeout hint handed to the dependent readiness hook.
    pub ready_timeout: Duration,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            convergence: RetrySpec::from_constants(
                DEFAULT_CONVERGENCE_INTERVAL,
                DEFAULT_CONVERGENCE_MAX,
            ),
            defaults: RetrySpec::from_constants(DEFAULT_DEFAULTS_INTERVAL, DEFAULT_DEFAULTS_MAX),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Synchronization errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Input or merged record is malformed; nothing was written.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Metatype defaults could not be obtained; nothing was written.
    #[error("metatype defaults unavailable for {identity}: {reason}")]
    DefaultsUnavailable {
        /// Identity being synchronized.
        identity: Identity,
        /// Last failure observed.
        reason: String,
    },
    /// Store rejected the write.
    #[error("config write failed for {identity}: {source}")]
    Write {
        /// Identity being synchronized.
        identity: Identity,
        /// Store failure.
        source: StoreError,
    },
    /// Convergence budget spent without a match. The write stays in place.
    #[error(
        "config for {identity} did not converge after {attempts} attempts ({elapsed_ms} ms): {last}"
    )]
    ConvergenceTimeout {
        /// Identity being synchronized.
        identity: Identity,
        /// Convergence attempts made.
        attempts: u32,
        /// Time spent polling, in milliseconds.
        elapsed_ms: u128,
        /// Last diagnostic observed.
        last: Divergence,
    },
    /// Caller cancelled the operation.
    #[error("synchronization of {identity} cancelled")]
    Cancelled {
        /// Identity being synchronized.
        identity: Identity,
    },
}

// ============================================================================
// SECTION: Identity Serialization
// ============================================================================

/// Identities with a synchronization in flight.
#[derive(Debug, Default)]
struct IdentityLocks {
    /// Identities currently held.
    active: Mutex<BTreeSet<Identity>>,
    /// Signalled when an identity is released.
    released: Condvar,
}

impl IdentityLocks {
    /// Blocks until `identity` is free, then holds it until the guard drops.
    fn acquire(&self, identity: &Identity) -> IdentityGuard<'_> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        while active.contains(identity) {
            active = self.released.wait(active).unwrap_or_else(PoisonError::into_inner);
        }
        active.insert(identity.clone());
        drop(active);
        IdentityGuard {
            locks: self,
            identity: identity.clone(),
        }
    }
}

/// Releases an identity on drop.
struct IdentityGuard<'a> {
    /// Owning lock table.
    locks: &'a IdentityLocks,
    /// Held identity.
    identity: Identity,
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.locks.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.remove(&self.identity);
        drop(active);
        self.locks.released.notify_all();
    }
}

// ============================================================================
// SECTION: Baseline Reads
// ============================================================================

/// Progress of the pre-write reads.
#[derive(Debug)]
struct Baseline {
    /// Current record, once read.
    current: Option<Option<ConfigurationRecord>>,
    /// Non-empty metatype defaults, once read.
    defaults: Option<ConfigurationRecord>,
    /// Last transient failure.
    last_failure: String,
    /// Failure that stops retrying.
    fatal: Option<StoreError>,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            current: None,
            defaults: None,
            last_failure: "no read attempt completed".to_string(),
            fatal: None,
        }
    }
}

// ============================================================================
// SECTION: Synchronizer
// ============================================================================

/// Writes configuration records and waits for them to become live.
pub struct ConfigSynchronizer<S, V, R> {
    /// Configuration store.
    store: S,
    /// Live policy view.
    view: V,
    /// Dependent component readiness hook.
    readiness: R,
    /// Audit sink for phase events.
    audit: Arc<dyn SyncAuditSink>,
    /// Synchronizer settings.
    config: SynchronizerConfig,
    /// Per-identity serialization.
    in_flight: IdentityLocks,
}

impl<S, V, R> ConfigSynchronizer<S, V, R>
where
    S: ConfigStore,
    V: PolicyView,
    R: ReadinessHook,
{
    /// Creates a synchronizer with a no-op audit sink.
    #[must_use]
    pub fn new(store: S, view: V, readiness: R, config: SynchronizerConfig) -> Self {
        Self {
            store,
            view,
            readiness,
            audit: Arc::new(NoopSyncAuditSink),
            config,
            in_flight: IdentityLocks::default(),
        }
    }

    /// Returns the synchronizer with an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn SyncAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the synchronizer settings.
    #[must_use]
    pub const fn config(&self) -> &SynchronizerConfig {
        &self.config
    }

    /// Returns the configuration store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the live policy view.
    #[must_use]
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Writes `overrides` over the defaults of `identity` and waits for convergence.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the input is invalid, defaults are
    /// unavailable, the write fails, or convergence times out.
    pub fn synchronize(
        &self,
        identity: &Identity,
        overrides: &ConfigOverrides,
    ) -> Result<PreviousConfig, SyncError> {
        self.synchronize_with_cancel(identity, overrides, &CancellationToken::new())
    }

    /// Restores a previously captured configuration and waits for convergence.
    ///
    /// The captured record is written as-is, without merging current
    /// defaults, so keys absent from the snapshot stay absent.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] under the same conditions as [`Self::synchronize`].
    pub fn restore(&self, previous: &PreviousConfig) -> Result<PreviousConfig, SyncError> {
        let snapshot = previous.record();
        self.apply(previous.identity(), &CancellationToken::new(), |_| snapshot.clone())
    }

    /// Same as [`Self::synchronize`], observing a cancellation token.
    ///
    /// Waiting for another in-flight operation on the same identity does not
    /// observe the token; retry sleeps do.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] when `cancel` fires, otherwise the
    /// errors documented on [`Self::synchronize`].
    pub fn synchronize_with_cancel(
        &self,
        identity: &Identity,
        overrides: &ConfigOverrides,
        cancel: &CancellationToken,
    ) -> Result<PreviousConfig, SyncError> {
        self.apply(identity, cancel, |defaults| {
            ConfigurationRecord::merge(identity.clone(), defaults, overrides)
        })
    }

    /// Writes the record built from the metatype defaults and waits for it.
    fn apply<F>(
        &self,
        identity: &Identity,
        cancel: &CancellationToken,
        build: F,
    ) -> Result<PreviousConfig, SyncError>
    where
        F: FnOnce(&ConfigurationRecord) -> ConfigurationRecord,
    {
        if identity.is_blank() {
            return Err(SyncError::InvalidConfig("identity must be non-empty".to_string()));
        }
        let _guard = self.in_flight.acquire(identity);

        let (current, defaults) = self.read_baseline(identity, cancel)?;
        let merged = build(&defaults);
        let target = PolicyProjection::from_record(&merged).map_err(|err| {
            self.record(identity, SyncPhase::InvalidConfig, None, Some(err.to_string()));
            SyncError::InvalidConfig(err.0)
        })?;

        self.store.write(identity, &merged).map_err(|err| {
            self.record(identity, SyncPhase::WriteFailed, None, Some(err.to_string()));
            SyncError::Write {
                identity: identity.clone(),
                source: err,
            }
        })?;
        self.record(identity, SyncPhase::WriteApplied, None, None);

        let checker = ConvergenceChecker::from_projection(target, &self.view);
        let mut last: Option<Divergence> = None;
        let outcome = RetryScheduler::new(self.config.convergence).wait_until(
            || match checker.evaluate() {
                Ok(result) if result.matched => true,
                Ok(result) => {
                    last = result.divergence;
                    false
                }
                Err(err) => {
                    last = Some(Divergence::Unobservable {
                        message: err.to_string(),
                    });
                    false
                }
            },
            Some(cancel),
        );

        match outcome {
            WaitOutcome::Satisfied {
                ..
            } => self.record(identity, SyncPhase::Converged, Some(outcome), None),
            WaitOutcome::Exhausted {
                attempts,
                elapsed,
            } => {
                let last = last.unwrap_or_else(|| Divergence::Unobservable {
                    message: "no convergence check completed".to_string(),
                });
                self.record(identity, SyncPhase::TimedOut, Some(outcome), Some(last.to_string()));
                return Err(SyncError::ConvergenceTimeout {
                    identity: identity.clone(),
                    attempts,
                    elapsed_ms: elapsed.as_millis(),
                    last,
                });
            }
            WaitOutcome::Cancelled {
                ..
            } => {
                self.record(identity, SyncPhase::Cancelled, Some(outcome), None);
                return Err(SyncError::Cancelled {
                    identity: identity.clone(),
                });
            }
        }

        self.notify_dependents(identity);
        Ok(match current {
            Some(record) if !record.is_empty() => PreviousConfig::Recorded(record),
            _ => PreviousConfig::Defaults(ConfigurationRecord {
                identity: identity.clone(),
                options: defaults.options,
            }),
        })
    }

    /// Reads the current record and non-empty metatype defaults.
    ///
    /// The first attempt runs immediately; later attempts follow the defaults
    /// retry spec.
    fn read_baseline(
        &self,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> Result<(Option<ConfigurationRecord>, ConfigurationRecord), SyncError> {
        let mut baseline = Baseline::default();
        if !self.try_baseline(identity, &mut baseline) {
            let outcome = RetryScheduler::new(self.config.defaults)
                .wait_until(|| self.try_baseline(identity, &mut baseline), Some(cancel));
            if let WaitOutcome::Cancelled {
                ..
            } = outcome
            {
                self.record(identity, SyncPhase::Cancelled, Some(outcome), None);
                return Err(SyncError::Cancelled {
                    identity: identity.clone(),
                });
            }
        }
        let reason = match (baseline.fatal, baseline.current, baseline.defaults) {
            (None, Some(current), Some(defaults)) => return Ok((current, defaults)),
            (Some(fatal), _, _) => fatal.to_string(),
            (None, _, _) => baseline.last_failure,
        };
        self.record(identity, SyncPhase::DefaultsUnavailable, None, Some(reason.clone()));
        Err(SyncError::DefaultsUnavailable {
            identity: identity.clone(),
            reason,
        })
    }

    /// Makes one baseline read attempt. Returns true when no retry is needed.
    fn try_baseline(&self, identity: &Identity, baseline: &mut Baseline) -> bool {
        if baseline.current.is_none() {
            match self.store.read(identity) {
                Ok(record) => baseline.current = Some(record),
                Err(err) => {
                    baseline.last_failure = format!("current record read failed: {err}");
                    return false;
                }
            }
        }
        match self.store.metatype_defaults(identity) {
            Ok(defaults) if !defaults.is_empty() => {
                baseline.defaults = Some(defaults);
                true
            }
            Ok(_) => {
                baseline.last_failure = "metatype defaults are empty".to_string();
                false
            }
            Err(err @ StoreError::NotRegistered(_)) => {
                baseline.fatal = Some(err);
                true
            }
            Err(err) => {
                baseline.last_failure = format!("metatype defaults read failed: {err}");
                false
            }
        }
    }

    /// Invokes the dependent readiness hook; failures are only audited.
    fn notify_dependents(&self, identity: &Identity) {
        match self.readiness.wait_for_ready(self.config.ready_timeout) {
            Ok(()) => self.record(identity, SyncPhase::DependentsReady, None, None),
            Err(err) => {
                self.record(identity, SyncPhase::DependentsNotReady, None, Some(err.to_string()));
            }
        }
    }

    /// Emits an audit event for a phase.
    fn record(
        &self,
        identity: &Identity,
        phase: SyncPhase,
        outcome: Option<WaitOutcome>,
        detail: Option<String>,
    ) {
        let event = SyncAuditEvent::new(SyncAuditEventParams {
            identity,
            phase,
            attempts: outcome.map(|outcome| outcome.attempts()),
            elapsed: outcome.map(|outcome| outcome.elapsed()),
            detail,
        });
        self.audit.record(&event);
    }
}
