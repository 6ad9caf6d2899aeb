// crates/posture-core/src/model/result.rs
// ============================================================================
// Module: Posture Check Results
// Description: Result records produced by one execution of one check.
// Purpose: Provide the tagged status model consumed by aggregation and renderers.
// Dependencies: crate::model::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`CheckResult`] is the outcome of running one check once. Status is a
//! closed enum; failure details travel as a detail string instead of raw
//! error values so nothing unstructured crosses the orchestrator boundary.
//! Invariants:
//! - `Error` means the probe faulted, timed out, or was interrupted; it never
//!   means the probe evaluated its assertion.
//! - `Skipped` results carry a [`SkipReason`] when the engine knows why.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::model::identifiers::CategoryTag;
use crate::model::identifiers::CheckId;
use crate::model::time::Timestamp;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Terminal status of a check execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// The probe evaluated its assertion and it held.
    Passed,
    /// The probe evaluated its assertion and it did not hold.
    Failed,
    /// The probe did not evaluate (not applicable, not licensed, cancelled).
    Skipped,
    /// The probe raised an unexpected condition instead of evaluating.
    Error,
}

impl CheckStatus {
    /// Returns the stable lowercase label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity assigned to a check definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Immediate exposure of the tenant.
    Critical,
    /// Significant weakening of a control.
    High,
    /// Deviation from recommended configuration.
    Medium,
    /// Hardening opportunity.
    Low,
    /// Informational finding only.
    Info,
}

/// Reason attached to `Skipped` results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The run was cancelled before the check started.
    Cancelled,
    /// The tenant lacks a license required by the check.
    NotLicensed(String),
    /// The check does not apply to this tenant's configuration.
    NotApplicable(String),
    /// The session is not connected to a service the check requires.
    NotConnected(String),
    /// Any other reason supplied by the probe.
    Custom(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("run cancelled before the check started"),
            Self::NotLicensed(detail) => write!(f, "not licensed: {detail}"),
            Self::NotApplicable(detail) => write!(f, "not applicable: {detail}"),
            Self::NotConnected(detail) => write!(f, "not connected: {detail}"),
            Self::Custom(detail) => f.write_str(detail),
        }
    }
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

/// Object examined by a probe while reaching its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Object kind (for example `conditionalAccessPolicy`).
    pub kind: String,
    /// Object identifier in the remote API.
    pub object_id: String,
    /// Human-readable object name.
    pub display_name: Option<String>,
    /// Optional snapshot of the object as returned by the API.
    pub snapshot: Option<Value>,
}

impl EvidenceRecord {
    /// Creates an evidence record without a snapshot.
    #[must_use]
    pub fn new(kind: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            object_id: object_id.into(),
            display_name: None,
            snapshot: None,
        }
    }

    /// Attaches a display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Attaches an object snapshot.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: Value) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

// ============================================================================
// SECTION: Check Result
// ============================================================================

/// Outcome of running one check once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Identifier of the check definition.
    pub check_id: CheckId,
    /// Display name copied from the definition.
    pub name: String,
    /// Category copied from the definition.
    pub category: CategoryTag,
    /// Severity copied from the definition.
    pub severity: Severity,
    /// Terminal status.
    pub status: CheckStatus,
    /// Human-readable detail (verdict explanation or failure message).
    pub detail: String,
    /// Objects examined by the probe.
    pub evidence: Vec<EvidenceRecord>,
    /// Skip reason when `status` is `Skipped`.
    pub skip_reason: Option<SkipReason>,
    /// Time the result was recorded.
    pub recorded_at: Timestamp,
    /// Execution time in milliseconds (zero for checks that never started).
    pub duration_ms: u64,
}

impl CheckResult {
    /// Returns true when the status is `Passed`.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }
}
