// crates/policy-sync-core/src/runtime/audit.rs
// ============================================================================
// Module: Policy Sync Audit Logging
// Description: Structured audit events for configuration synchronization.
// Purpose: Emit JSON-line audit logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every synchronization phase (write, convergence, dependent readiness)
//! produces a [`SyncAuditEvent`]. Sinks are deliberately small so deployments
//! can route events to their own logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::Identity;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Synchronization phase recorded by an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Merged record failed validation; nothing was written.
    InvalidConfig,
    /// Metatype defaults could not be obtained.
    DefaultsUnavailable,
    /// Store rejected the write.
    WriteFailed,
    /// Store accepted the write.
    WriteApplied,
    /// Live policy matched the written record.
    Converged,
    /// Convergence budget was spent.
    TimedOut,
    /// Caller cancelled the operation.
    Cancelled,
    /// Dependent components reported ready.
    DependentsReady,
    /// Dependent components did not report ready.
    DependentsNotReady,
}

impl SyncPhase {
    /// Returns a stable label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidConfig => "invalid_config",
            Self::DefaultsUnavailable => "defaults_unavailable",
            Self::WriteFailed => "write_failed",
            Self::WriteApplied => "write_applied",
            Self::Converged => "converged",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::DependentsReady => "dependents_ready",
            Self::DependentsNotReady => "dependents_not_ready",
        }
    }
}

/// Synchronization audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SyncAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Identity being synchronized.
    pub identity: String,
    /// Synchronization phase.
    pub phase: SyncPhase,
    /// Convergence attempts made, when relevant.
    pub attempts: Option<u32>,
    /// Time spent in the phase, when relevant.
    pub elapsed_ms: Option<u128>,
    /// Diagnostic detail.
    pub detail: Option<String>,
}

/// Inputs required to construct a synchronization audit event.
pub struct SyncAuditEventParams<'a> {
    /// Identity being synchronized.
    pub identity: &'a Identity,
    /// Synchronization phase.
    pub phase: SyncPhase,
    /// Convergence attempts made, when relevant.
    pub attempts: Option<u32>,
    /// Time spent in the phase, when relevant.
    pub elapsed: Option<Duration>,
    /// Diagnostic detail.
    pub detail: Option<String>,
}

impl SyncAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: SyncAuditEventParams<'_>) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "config_sync",
            timestamp_ms,
            identity: params.identity.to_string(),
            phase: params.phase,
            attempts: params.attempts,
            elapsed_ms: params.elapsed.map(|elapsed| elapsed.as_millis()),
            detail: params.detail,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for synchronization events.
pub trait SyncAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &SyncAuditEvent);
}

/// Audit sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSyncAuditSink;

impl SyncAuditSink for NoopSyncAuditSink {
    fn record(&self, _event: &SyncAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSyncAuditSink;

impl SyncAuditSink for StderrSyncAuditSink {
    fn record(&self, event: &SyncAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileSyncAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileSyncAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl SyncAuditSink for FileSyncAuditSink {
    fn record(&self, event: &SyncAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}
