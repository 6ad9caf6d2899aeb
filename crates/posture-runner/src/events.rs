// crates/posture-runner/src/events.rs
// ============================================================================
// Module: Run Events
// Description: Structured run lifecycle events and their sinks.
// Purpose: Emit JSON-line progress records without a logging framework dependency.
// Dependencies: posture-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The orchestrator reports run start, each check completion, and run
//! completion to a [`RunEventSink`]. Sinks serialize events as one JSON object
//! per line; write failures are ignored so logging never fails a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use posture_core::CheckId;
use posture_core::CheckStatus;
use posture_core::RunId;
use posture_core::RunStats;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Run lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// The run accepted its input and is about to schedule checks.
    RunStarted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Run identifier.
        run_id: RunId,
        /// Number of checks scheduled.
        check_count: usize,
        /// Concurrency limit.
        concurrency: usize,
    },
    /// One check reached a terminal status.
    CheckCompleted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Run identifier.
        run_id: RunId,
        /// Check identifier.
        check_id: CheckId,
        /// Terminal status.
        status: CheckStatus,
        /// Execution time in milliseconds.
        duration_ms: u64,
    },
    /// Every check reached a terminal status.
    RunCompleted {
        /// Event timestamp (milliseconds since epoch).
        timestamp_ms: u128,
        /// Run identifier.
        run_id: RunId,
        /// Status counts.
        stats: RunStats,
        /// True when the run was cancelled or exceeded its budget.
        cancelled: bool,
    },
}

impl RunEvent {
    /// Builds a run-started event stamped now.
    #[must_use]
    pub fn run_started(run_id: &RunId, check_count: usize, concurrency: usize) -> Self {
        Self::RunStarted {
            timestamp_ms: now_ms(),
            run_id: run_id.clone(),
            check_count,
            concurrency,
        }
    }

    /// Builds a check-completed event stamped now.
    #[must_use]
    pub fn check_completed(
        run_id: &RunId,
        check_id: &CheckId,
        status: CheckStatus,
        duration_ms: u64,
    ) -> Self {
        Self::CheckCompleted {
            timestamp_ms: now_ms(),
            run_id: run_id.clone(),
            check_id: check_id.clone(),
            status,
            duration_ms,
        }
    }

    /// Builds a run-completed event stamped now.
    #[must_use]
    pub fn run_completed(run_id: &RunId, stats: RunStats, cancelled: bool) -> Self {
        Self::RunCompleted {
            timestamp_ms: now_ms(),
            run_id: run_id.clone(),
            stats,
            cancelled,
        }
    }
}

/// Returns the current wall-clock time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|duration| duration.as_millis()).unwrap_or(0)
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for run lifecycle events.
pub trait RunEventSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: &RunEvent);
}

/// Event sink that logs JSON lines to stderr.
pub struct StderrRunEventSink;

impl RunEventSink for StderrRunEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileRunEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileRunEventSink {
    /// Opens the event log file in append mode.
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

impl RunEventSink for FileRunEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
pub struct NoopRunEventSink;

impl RunEventSink for NoopRunEventSink {
    fn record(&self, _event: &RunEvent) {}
}
