// crates/posture-core/src/runtime/compare.rs
// ============================================================================
// Module: Posture Run Comparison
// Description: Per-check delta classification between two run summaries.
// Purpose: Detect regressions and fixes relative to a baseline run.
// Dependencies: crate::model, crate::runtime::summary, serde
// ============================================================================

//! ## Overview
//! [`compare`] matches results by check identifier and classifies each pair.
//! Only transitions between the passing and non-passing classes are deltas;
//! which statuses count as non-passing is decided by [`ComparisonPolicy`].
//! With the default policy, `Skipped` sits outside both classes, so any
//! change involving `Skipped` is `Unchanged`, as is `Failed` <-> `Error`.
//! Invariants:
//! - `compare(a, a, policy)` yields only `Unchanged` entries.
//! - Entries follow current-run order, then removed checks in baseline order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use crate::model::identifiers::CheckId;
use crate::model::identifiers::RunId;
use crate::model::result::CheckStatus;
use crate::runtime::summary::RunSummary;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Classification policy for status pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonPolicy {
    /// Treat `Skipped` as non-passing, so `Passed` <-> `Skipped` becomes a delta.
    pub skipped_is_failure: bool,
    /// Treat `Error` as non-passing, so `Passed` <-> `Error` becomes a delta.
    pub error_is_failure: bool,
}

impl Default for ComparisonPolicy {
    fn default() -> Self {
        Self {
            skipped_is_failure: false,
            error_is_failure: true,
        }
    }
}

/// Pass class of a status under a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassClass {
    /// Counts as passing.
    Passing,
    /// Counts as not passing.
    NonPassing,
    /// Excluded from delta detection.
    Neutral,
}

impl ComparisonPolicy {
    /// Maps a status onto its pass class.
    const fn class_of(self, status: CheckStatus) -> PassClass {
        match status {
            CheckStatus::Passed => PassClass::Passing,
            CheckStatus::Failed => PassClass::NonPassing,
            CheckStatus::Error if self.error_is_failure => PassClass::NonPassing,
            CheckStatus::Skipped if self.skipped_is_failure => PassClass::NonPassing,
            CheckStatus::Error | CheckStatus::Skipped => PassClass::Neutral,
        }
    }

    /// Classifies a status pair for an identifier present in both runs.
    #[must_use]
    pub const fn classify(self, baseline: CheckStatus, current: CheckStatus) -> DeltaKind {
        match (self.class_of(baseline), self.class_of(current)) {
            (PassClass::NonPassing, PassClass::Passing) => DeltaKind::Fixed,
            (PassClass::Passing, PassClass::NonPassing) => DeltaKind::Regressed,
            _ => DeltaKind::Unchanged,
        }
    }
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Delta classification for one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    /// Passing in baseline, non-passing now.
    Regressed,
    /// Non-passing in baseline, passing now.
    Fixed,
    /// No pass-class transition.
    Unchanged,
    /// Present only in the current run.
    New,
    /// Present only in the baseline run.
    Removed,
}

/// Comparison outcome for one check identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// Check identifier.
    pub check_id: CheckId,
    /// Display name from whichever run contains the check (current preferred).
    pub name: String,
    /// Baseline status, absent for `New`.
    pub baseline: Option<CheckStatus>,
    /// Current status, absent for `Removed`.
    pub current: Option<CheckStatus>,
    /// Delta classification.
    pub delta: DeltaKind,
}

/// Entry counts per delta kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeltaCounts {
    /// `Regressed` entries.
    pub regressed: usize,
    /// `Fixed` entries.
    pub fixed: usize,
    /// `Unchanged` entries.
    pub unchanged: usize,
    /// `New` entries.
    pub new: usize,
    /// `Removed` entries.
    pub removed: usize,
}

/// Derived delta between a baseline and a current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Baseline run identifier.
    pub baseline_run: RunId,
    /// Current run identifier.
    pub current_run: RunId,
    /// Policy used for classification.
    pub policy: ComparisonPolicy,
    /// Per-check entries.
    pub entries: Vec<ComparisonEntry>,
    /// Counts per delta kind.
    pub counts: DeltaCounts,
}

impl ComparisonReport {
    /// Returns entries with the given delta kind, preserving order.
    pub fn with_delta(&self, delta: DeltaKind) -> impl Iterator<Item = &ComparisonEntry> {
        self.entries.iter().filter(move |entry| entry.delta == delta)
    }

    /// Returns the entry for a check identifier.
    #[must_use]
    pub fn entry(&self, check_id: &CheckId) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|entry| &entry.check_id == check_id)
    }

    /// Returns true when any check regressed.
    #[must_use]
    pub const fn has_regressions(&self) -> bool {
        self.counts.regressed > 0
    }
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Compares two run summaries by check identifier.
#[must_use]
pub fn compare(
    baseline: &RunSummary,
    current: &RunSummary,
    policy: ComparisonPolicy,
) -> ComparisonReport {
    let baseline_by_id: HashMap<&CheckId, CheckStatus> =
        baseline.results().iter().map(|result| (&result.check_id, result.status)).collect();
    let current_ids: HashSet<&CheckId> =
        current.results().iter().map(|result| &result.check_id).collect();

    let mut entries = Vec::with_capacity(baseline.results().len().max(current.results().len()));
    for result in current.results() {
        let baseline_status = baseline_by_id.get(&result.check_id).copied();
        let delta = baseline_status
            .map_or(DeltaKind::New, |before| policy.classify(before, result.status));
        entries.push(ComparisonEntry {
            check_id: result.check_id.clone(),
            name: result.name.clone(),
            baseline: baseline_status,
            current: Some(result.status),
            delta,
        });
    }
    for result in baseline.results() {
        if !current_ids.contains(&result.check_id) {
            entries.push(ComparisonEntry {
                check_id: result.check_id.clone(),
                name: result.name.clone(),
                baseline: Some(result.status),
                current: None,
                delta: DeltaKind::Removed,
            });
        }
    }

    let counts = count_deltas(&entries);
    ComparisonReport {
        baseline_run: baseline.metadata().run_id.clone(),
        current_run: current.metadata().run_id.clone(),
        policy,
        entries,
        counts,
    }
}

/// Tallies entries per delta kind.
fn count_deltas(entries: &[ComparisonEntry]) -> DeltaCounts {
    let mut counts = DeltaCounts::default();
    for entry in entries {
        match entry.delta {
            DeltaKind::Regressed => counts.regressed += 1,
            DeltaKind::Fixed => counts.fixed += 1,
            DeltaKind::Unchanged => counts.unchanged += 1,
            DeltaKind::New => counts.new += 1,
            DeltaKind::Removed => counts.removed += 1,
        }
    }
    counts
}
