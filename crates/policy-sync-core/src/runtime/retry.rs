// crates/policy-sync-core/src/runtime/retry.rs
// ============================================================================
// Module: Policy Sync Retry Scheduler
// Description: Bounded poll-until-true loop with cooperative cancellation.
// Purpose: Pace convergence checks and readiness probes without busy-spinning.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`RetryScheduler`] evaluates a predicate on a fixed interval until it holds,
//! the deadline passes, or the caller cancels. Every attempt is preceded by a
//! sleep, including the first, so a freshly written configuration always has
//! one interval to propagate before it is checked.
//!
//! The final sleep is clamped to the deadline. A scheduler therefore gives up
//! no earlier than `max_duration` and no later than `max_duration + interval`
//! (plus the cost of the last predicate call).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound accepted for a retry deadline.
pub const MAX_RETRY_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// ============================================================================
// SECTION: Retry Specification
// ============================================================================

/// Retry specification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrySpecError {
    /// Poll interval must be positive.
    #[error("retry interval must be greater than zero")]
    ZeroInterval,
    /// Deadline must cover at least one interval.
    #[error("retry max duration ({max_ms} ms) must be at least the interval ({interval_ms} ms)")]
    DurationBelowInterval {
        /// Interval in milliseconds.
        interval_ms: u128,
        /// Max duration in milliseconds.
        max_ms: u128,
    },
    /// Deadline exceeds [`MAX_RETRY_DURATION`].
    #[error("retry max duration exceeds limit")]
    DurationTooLong,
    /// Attempt budget must be positive.
    #[error("retry attempt budget must be greater than zero")]
    ZeroAttempts,
}

/// Attempt budget applied within the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    /// Retry until the deadline passes.
    UntilDeadline,
    /// Stop after a fixed number of attempts (or the deadline, if sooner).
    MaxAttempts(NonZeroU32),
}

/// Poll interval, deadline, and attempt budget for a bounded wait.
///
/// # Invariants
/// - `interval > 0` and `interval <= max_duration <= MAX_RETRY_DURATION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySpec {
    /// Sleep between attempts.
    interval: Duration,
    /// Total wall-clock budget.
    max_duration: Duration,
    /// Attempt budget.
    budget: RetryBudget,
}

impl RetrySpec {
    /// Creates a spec that retries until the deadline.
    ///
    /// # Errors
    ///
    /// Returns [`RetrySpecError`] when the interval is zero or the deadline is
    /// shorter than one interval or above [`MAX_RETRY_DURATION`].
    pub fn new(interval: Duration, max_duration: Duration) -> Result<Self, RetrySpecError> {
        if interval.is_zero() {
            return Err(RetrySpecError::ZeroInterval);
        }
        if max_duration < interval {
            return Err(RetrySpecError::DurationBelowInterval {
                interval_ms: interval.as_millis(),
                max_ms: max_duration.as_millis(),
            });
        }
        if max_duration > MAX_RETRY_DURATION {
            return Err(RetrySpecError::DurationTooLong);
        }
        Ok(Self {
            interval,
            max_duration,
            budget: RetryBudget::UntilDeadline,
        })
    }

    /// Builds a spec from constants already known to satisfy the invariants.
    pub(crate) const fn from_constants(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval,
            max_duration,
            budget: RetryBudget::UntilDeadline,
        }
    }

    /// Returns the spec limited to a fixed number of attempts.
    ///
    /// # Errors
    ///
    /// Returns [`RetrySpecError::ZeroAttempts`] when `attempts` is zero.
    pub fn with_max_attempts(self, attempts: u32) -> Result<Self, RetrySpecError> {
        let attempts = NonZeroU32::new(attempts).ok_or(RetrySpecError::ZeroAttempts)?;
        Ok(Self {
            budget: RetryBudget::MaxAttempts(attempts),
            ..self
        })
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the total wall-clock budget.
    #[must_use]
    pub const fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Returns the attempt budget.
    #[must_use]
    pub const fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Returns true when `attempts` spends the attempt budget.
    const fn attempts_spent(&self, attempts: u32) -> bool {
        match self.budget {
            RetryBudget::UntilDeadline => false,
            RetryBudget::MaxAttempts(limit) => attempts >= limit.get(),
        }
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Shared cancellation flag with a wake-up signal.
#[derive(Debug, Default)]
struct CancelState {
    /// Set once the token is cancelled.
    cancelled: Mutex<bool>,
    /// Wakes sleepers on cancellation.
    signal: Condvar,
}

/// Cloneable cancellation signal observed by scheduler sleeps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Shared state across clones.
    state: Arc<CancelState>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every sleeper.
    pub fn cancel(&self) {
        let mut cancelled = self.state.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        drop(cancelled);
        self.state.signal.notify_all();
    }

    /// Returns true once the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.state.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `duration` unless cancelled first. Returns true when cancelled.
    #[must_use]
    pub fn sleep(&self, duration: Duration) -> bool {
        let started = Instant::now();
        let mut cancelled = self.state.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *cancelled {
                return true;
            }
            let Some(remaining) = duration.checked_sub(started.elapsed()) else {
                return false;
            };
            if remaining.is_zero() {
                return false;
            }
            cancelled = self
                .state
                .signal
                .wait_timeout(cancelled, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Predicate held.
    Satisfied {
        /// Attempts made, including the successful one.
        attempts: u32,
        /// Time spent waiting.
        elapsed: Duration,
    },
    /// Deadline or attempt budget spent without success.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Time spent waiting.
        elapsed: Duration,
    },
    /// Caller cancelled the wait.
    Cancelled {
        /// Attempts made before cancellation.
        attempts: u32,
        /// Time spent waiting.
        elapsed: Duration,
    },
}

impl WaitOutcome {
    /// Returns true when the predicate held.
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    /// Returns the number of predicate evaluations.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Satisfied {
                attempts, ..
            }
            | Self::Exhausted {
                attempts, ..
            }
            | Self::Cancelled {
                attempts, ..
            } => *attempts,
        }
    }

    /// Returns the time spent waiting.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Satisfied {
                elapsed, ..
            }
            | Self::Exhausted {
                elapsed, ..
            }
            | Self::Cancelled {
                elapsed, ..
            } => *elapsed,
        }
    }
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Bounded poll loop driven by a [`RetrySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryScheduler {
    /// Pacing and budget.
    spec: RetrySpec,
}

impl RetryScheduler {
    /// Creates a scheduler for a validated spec.
    #[must_use]
    pub const fn new(spec: RetrySpec) -> Self {
        Self {
            spec,
        }
    }

    /// Returns the scheduler's spec.
    #[must_use]
    pub const fn spec(&self) -> &RetrySpec {
        &self.spec
    }

    /// Sleeps, then evaluates `predicate`, until it holds or the budget is spent.
    ///
    /// Suspension happens only between attempts. When `cancel` fires, the
    /// current sleep ends immediately and [`WaitOutcome::Cancelled`] is returned.
    pub fn wait_until<F>(&self, mut predicate: F, cancel: Option<&CancellationToken>) -> WaitOutcome
    where
        F: FnMut() -> bool,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        loop {
            let remaining = self.spec.max_duration.saturating_sub(started.elapsed());
            if pause(self.spec.interval.min(remaining), cancel) {
                return WaitOutcome::Cancelled {
                    attempts,
                    elapsed: started.elapsed(),
                };
            }
            attempts = attempts.saturating_add(1);
            if predicate() {
                return WaitOutcome::Satisfied {
                    attempts,
                    elapsed: started.elapsed(),
                };
            }
            let elapsed = started.elapsed();
            if elapsed >= self.spec.max_duration || self.spec.attempts_spent(attempts) {
                return WaitOutcome::Exhausted {
                    attempts,
                    elapsed,
                };
            }
        }
    }
}

/// Waits until `predicate` holds, polling every `interval` for at most `max_duration`.
///
/// # Errors
///
/// Returns [`RetrySpecError`] when the interval and duration are inconsistent.
pub fn wait_until<F>(
    predicate: F,
    interval: Duration,
    max_duration: Duration,
) -> Result<WaitOutcome, RetrySpecError>
where
    F: FnMut() -> bool,
{
    let spec = RetrySpec::new(interval, max_duration)?;
    Ok(RetryScheduler::new(spec).wait_until(predicate, None))
}

/// Sleeps for `duration`, observing cancellation. Returns true when cancelled.
fn pause(duration: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => token.sleep(duration),
        None => {
            thread::sleep(duration);
            false
        }
    }
}
