// crates/posture-runner/src/probe.rs
// ============================================================================
// Module: Check Probes
// Description: Executable contract implemented by individual compliance checks.
// Purpose: Give checks data access and a cancellation signal, and take back a verdict.
// Dependencies: posture-core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! A [`CheckProbe`] inspects tenant objects through its [`CheckContext`] and
//! returns a [`CheckVerdict`]. Probes never decide `Error` themselves: any
//! [`ProbeError`], panic, or timeout is turned into an `Error` result by the
//! orchestrator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use posture_core::ApiError;
use posture_core::ApiRequest;
use posture_core::ApiResponse;
use posture_core::CancellationToken;
use posture_core::CheckId;
use posture_core::CheckStatus;
use posture_core::EvidenceRecord;
use posture_core::ObjectSource;
use posture_core::SkipReason;
use thiserror::Error;

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Outcome a probe is allowed to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    /// The tenant satisfies the check.
    Passed,
    /// The tenant violates the check.
    Failed,
    /// The check does not apply.
    Skipped,
}

impl From<VerdictStatus> for CheckStatus {
    fn from(status: VerdictStatus) -> Self {
        match status {
            VerdictStatus::Passed => Self::Passed,
            VerdictStatus::Failed => Self::Failed,
            VerdictStatus::Skipped => Self::Skipped,
        }
    }
}

/// Verdict returned by a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckVerdict {
    /// Reported status.
    pub status: VerdictStatus,
    /// Human-readable explanation.
    pub detail: String,
    /// Objects examined.
    pub evidence: Vec<EvidenceRecord>,
    /// Reason, when skipped.
    pub skip_reason: Option<SkipReason>,
}

impl CheckVerdict {
    /// Builds a passing verdict.
    #[must_use]
    pub fn passed(detail: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Passed,
            detail: detail.into(),
            evidence: Vec::new(),
            skip_reason: None,
        }
    }

    /// Builds a failing verdict.
    #[must_use]
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Failed,
            detail: detail.into(),
            evidence: Vec::new(),
            skip_reason: None,
        }
    }

    /// Builds a skipped verdict.
    #[must_use]
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            status: VerdictStatus::Skipped,
            detail: reason.to_string(),
            evidence: Vec::new(),
            skip_reason: Some(reason),
        }
    }

    /// Attaches one evidence record.
    #[must_use]
    pub fn with_evidence(mut self, record: EvidenceRecord) -> Self {
        self.evidence.push(record);
        self
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure raised by a probe.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    /// A data request failed.
    #[error("{0}")]
    Api(#[from] ApiError),
    /// The probe hit an unexpected condition.
    #[error("check fault: {0}")]
    Fault(String),
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Per-execution context handed to a probe.
#[derive(Clone)]
pub struct CheckContext {
    /// Check being executed.
    check_id: CheckId,
    /// Data source shared by the run.
    source: Arc<dyn ObjectSource>,
    /// Run-scoped cancellation signal.
    cancel: CancellationToken,
}

impl CheckContext {
    /// Creates a context.
    #[must_use]
    pub fn new(check_id: CheckId, source: Arc<dyn ObjectSource>, cancel: CancellationToken) -> Self {
        Self {
            check_id,
            source,
            cancel,
        }
    }

    /// Returns the check identifier.
    #[must_use]
    pub const fn check_id(&self) -> &CheckId {
        &self.check_id
    }

    /// Returns the run-scoped cancellation token.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fetches through the shared source, observing run cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request cannot be satisfied.
    pub async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.source.fetch(request, &self.cancel).await
    }
}

// ============================================================================
// SECTION: Probe Trait
// ============================================================================

/// Executable body of a compliance check.
#[async_trait]
pub trait CheckProbe: Send + Sync {
    /// Runs the check.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the check cannot reach a verdict.
    async fn run(&self, ctx: CheckContext) -> Result<CheckVerdict, ProbeError>;
}

/// Adapter turning an async closure into a [`CheckProbe`].
pub struct FnProbe<F> {
    /// Wrapped closure.
    func: F,
}

impl<F> FnProbe<F> {
    /// Wraps a closure.
    #[must_use]
    pub const fn new(func: F) -> Self {
        Self {
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> CheckProbe for FnProbe<F>
where
    F: Fn(CheckContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CheckVerdict, ProbeError>> + Send + 'static,
{
    async fn run(&self, ctx: CheckContext) -> Result<CheckVerdict, ProbeError> {
        (self.func)(ctx).await
    }
}
