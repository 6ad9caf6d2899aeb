// crates/posture-core/src/runtime/summary.rs
// ============================================================================
// Module: Posture Run Summaries
// Description: Ordered run results with derived per-status statistics.
// Purpose: Provide the immutable output of one orchestration run.
// Dependencies: crate::model, serde
// ============================================================================

//! ## Overview
//! A [`RunSummary`] owns the ordered results of one run plus metadata. Its
//! statistics are always derived from the results by [`summarize`]; they are
//! recomputed on deserialization rather than trusted from the wire.
//! Invariants:
//! - Result order equals the caller's check order.
//! - A summary is never mutated after construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::model::identifiers::CheckId;
use crate::model::identifiers::RunId;
use crate::model::identifiers::TenantId;
use crate::model::result::CheckResult;
use crate::model::result::CheckStatus;
use crate::model::time::Timestamp;

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Per-status counts for a sequence of results.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Results with status `Passed`.
    pub passed: usize,
    /// Results with status `Failed`.
    pub failed: usize,
    /// Results with status `Skipped`.
    pub skipped: usize,
    /// Results with status `Error`.
    pub errored: usize,
    /// Total number of results.
    pub total: usize,
    /// `passed / total`, or `0.0` for an empty run.
    pub pass_ratio: f64,
}

/// Folds results into per-status counts.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Check counts are far below 2^52.")]
pub fn summarize(results: &[CheckResult]) -> RunStats {
    let mut stats = RunStats::default();
    for result in results {
        match result.status {
            CheckStatus::Passed => stats.passed += 1,
            CheckStatus::Failed => stats.failed += 1,
            CheckStatus::Skipped => stats.skipped += 1,
            CheckStatus::Error => stats.errored += 1,
        }
    }
    stats.total = results.len();
    stats.pass_ratio =
        if stats.total == 0 { 0.0 } else { stats.passed as f64 / stats.total as f64 };
    stats
}

// ============================================================================
// SECTION: Run Summary
// ============================================================================

/// Metadata describing one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Run identifier.
    pub run_id: RunId,
    /// Tenant assessed by the run, when known.
    pub tenant_id: Option<TenantId>,
    /// Time the run started.
    pub started_at: Timestamp,
    /// Time the last check reached a terminal status.
    pub finished_at: Timestamp,
    /// True when the run was cancelled or exceeded its budget.
    pub cancelled: bool,
}

impl RunMetadata {
    /// Returns the run wall-clock duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.finished_at.millis_since(self.started_at)
    }
}

/// Wire form of a run summary; statistics are derived on conversion.
#[derive(Deserialize)]
struct RunSummaryRecord {
    /// Run metadata.
    metadata: RunMetadata,
    /// Ordered results.
    results: Vec<CheckResult>,
}

/// Complete, ordered outcome of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RunSummaryRecord")]
pub struct RunSummary {
    /// Run metadata.
    metadata: RunMetadata,
    /// Results in caller-specified check order.
    results: Vec<CheckResult>,
    /// Statistics derived from `results`.
    stats: RunStats,
}

impl From<RunSummaryRecord> for RunSummary {
    fn from(record: RunSummaryRecord) -> Self {
        Self::new(record.metadata, record.results)
    }
}

impl RunSummary {
    /// Builds a summary, deriving statistics from the results.
    #[must_use]
    pub fn new(metadata: RunMetadata, results: Vec<CheckResult>) -> Self {
        let stats = summarize(&results);
        Self {
            metadata,
            results,
            stats,
        }
    }

    /// Returns run metadata.
    #[must_use]
    pub const fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    /// Returns results in execution-input order.
    #[must_use]
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// Returns derived statistics.
    #[must_use]
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Returns the result for a check identifier.
    #[must_use]
    pub fn result(&self, check_id: &CheckId) -> Option<&CheckResult> {
        self.results.iter().find(|result| &result.check_id == check_id)
    }

    /// Returns results with the given status, preserving order.
    pub fn with_status(&self, status: CheckStatus) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(move |result| result.status == status)
    }
}
