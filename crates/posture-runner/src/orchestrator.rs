// crates/posture-runner/src/orchestrator.rs
// ============================================================================
// Module: Test Orchestrator
// Description: Bounded-concurrency execution of check probes.
// Purpose: Produce exactly one ordered result per check, whatever the probe does.
// Dependencies: posture-core, tokio, tracing
// ============================================================================

//! ## Overview
//! Checks are started in input order as semaphore permits become available.
//! Each probe runs in its own task so a panic cannot take down the run. The
//! outer task races the probe against its timeout and the run-scoped
//! cancellation token and always yields a terminal [`CheckResult`].
//! Invariants:
//! - `results.len() == checks.len()` and `results[i]` belongs to `checks[i]`.
//! - A check that never started is `Skipped` with reason `Cancelled`.
//! - A check interrupted, timed out, panicked, or failed with an error is `Error`.
//! - [`Orchestrator::run`] returns only after every started probe has finished
//!   or been aborted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use posture_core::CancellationToken;
use posture_core::CheckId;
use posture_core::CheckResult;
use posture_core::CheckStatus;
use posture_core::ObjectSource;
use posture_core::RunId;
use posture_core::RunMetadata;
use posture_core::RunSummary;
use posture_core::SkipReason;
use posture_core::TenantId;
use posture_core::Timestamp;
use thiserror::Error;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::events::NoopRunEventSink;
use crate::events::RunEvent;
use crate::events::RunEventSink;
use crate::probe::CheckContext;
use crate::probe::CheckVerdict;
use crate::probe::ProbeError;
use crate::registry::CheckDefinition;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default number of checks executing at once.
pub const DEFAULT_CONCURRENCY: usize = 8;
/// Default per-check time limit.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(120);

/// Orchestrator limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Maximum checks executing at once.
    pub concurrency: usize,
    /// Time limit for one probe.
    pub check_timeout: Duration,
    /// Optional budget for the whole run.
    pub run_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            run_timeout: None,
        }
    }
}

impl OrchestratorConfig {
    /// Validates the limits.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] for zero or oversized limits.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.concurrency == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(OrchestratorError::InvalidConfig("concurrency is too large".to_string()));
        }
        if self.check_timeout.is_zero() {
            return Err(OrchestratorError::InvalidConfig(
                "check timeout must be positive".to_string(),
            ));
        }
        if self.run_timeout.is_some_and(|budget| budget.is_zero()) {
            return Err(OrchestratorError::InvalidConfig(
                "run timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Setup failures that prevent a run from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// Limits are unusable.
    #[error("invalid orchestrator config: {0}")]
    InvalidConfig(String),
    /// The input names the same check twice.
    #[error("duplicate check in run input: {0}")]
    DuplicateCheck(CheckId),
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Executes check definitions against a shared object source.
pub struct Orchestrator {
    /// Limits.
    config: OrchestratorConfig,
    /// Data source handed to every probe.
    source: Arc<dyn ObjectSource>,
    /// Lifecycle event sink.
    sink: Arc<dyn RunEventSink>,
    /// Tenant recorded in run metadata.
    tenant_id: Option<TenantId>,
}

impl Orchestrator {
    /// Creates an orchestrator with a no-op event sink.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidConfig`] when the limits are unusable.
    pub fn new(
        config: OrchestratorConfig,
        source: Arc<dyn ObjectSource>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            sink: Arc::new(NoopRunEventSink),
            tenant_id: None,
        })
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RunEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Records the tenant in run metadata.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs every check and returns results in input order.
    ///
    /// `cancel` is run-scoped: cancelling it stops scheduling and interrupts
    /// in-flight probes, and an elapsed run budget cancels it.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::DuplicateCheck`] before starting anything
    /// when the input names a check twice.
    pub async fn run(
        &self,
        run_id: RunId,
        checks: &[Arc<CheckDefinition>],
        cancel: &CancellationToken,
    ) -> Result<RunSummary, OrchestratorError> {
        ensure_unique(checks)?;
        let started_at = Timestamp::now();
        let deadline =
            self.config.run_timeout.and_then(|budget| Instant::now().checked_add(budget));
        self.sink.record(&RunEvent::run_started(&run_id, checks.len(), self.config.concurrency));

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut slots: Vec<Option<CheckResult>> = vec![None; checks.len()];
        let mut tasks = JoinSet::new();
        for (index, definition) in checks.iter().enumerate() {
            let Some(permit) = acquire_slot(&semaphore, cancel, deadline).await else {
                let result = skipped_result(definition);
                self.record_completion(&run_id, &result);
                slots[index] = Some(result);
                continue;
            };
            let execution = CheckExecution {
                definition: Arc::clone(definition),
                source: Arc::clone(&self.source),
                cancel: cancel.clone(),
                timeout: self.config.check_timeout,
                sink: Arc::clone(&self.sink),
                run_id: run_id.clone(),
            };
            tasks.spawn(async move { (index, execution.execute(permit).await) });
        }

        loop {
            let joined = tokio::select! {
                biased;
                joined = tasks.join_next() => joined,
                () = budget_elapsed(deadline), if !cancel.is_cancelled() => {
                    warn!(run_id = %run_id, "run budget elapsed; cancelling remaining checks");
                    cancel.cancel();
                    continue;
                }
            };
            let Some(joined) = joined else {
                break;
            };
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(err) => warn!(run_id = %run_id, error = %err, "check task failed"),
            }
        }

        let results: Vec<CheckResult> = slots
            .into_iter()
            .zip(checks)
            .map(|(slot, definition)| {
                slot.unwrap_or_else(|| {
                    let result = error_result(definition, "check task did not report a result", 0);
                    self.record_completion(&run_id, &result);
                    result
                })
            })
            .collect();
        let metadata = RunMetadata {
            run_id: run_id.clone(),
            tenant_id: self.tenant_id.clone(),
            started_at,
            finished_at: Timestamp::now(),
            cancelled: cancel.is_cancelled(),
        };
        let summary = RunSummary::new(metadata, results);
        self.sink.record(&RunEvent::run_completed(
            &run_id,
            *summary.stats(),
            summary.metadata().cancelled,
        ));
        Ok(summary)
    }

    /// Emits a completion event for a result recorded outside a check task.
    fn record_completion(&self, run_id: &RunId, result: &CheckResult) {
        self.sink.record(&RunEvent::check_completed(
            run_id,
            &result.check_id,
            result.status,
            result.duration_ms,
        ));
    }
}

// ============================================================================
// SECTION: Check Execution
// ============================================================================

/// Everything one check task needs.
struct CheckExecution {
    /// Check being executed.
    definition: Arc<CheckDefinition>,
    /// Shared data source.
    source: Arc<dyn ObjectSource>,
    /// Run-scoped cancellation token.
    cancel: CancellationToken,
    /// Probe time limit.
    timeout: Duration,
    /// Lifecycle event sink.
    sink: Arc<dyn RunEventSink>,
    /// Run identifier for events.
    run_id: RunId,
}

/// How the race between probe, timeout, and cancellation ended.
enum ProbeOutcome {
    /// The probe task finished (normally or by panic).
    Finished(Result<Result<CheckVerdict, ProbeError>, JoinError>),
    /// The run was cancelled while the probe was in flight.
    Interrupted,
    /// The probe exceeded its time limit.
    TimedOut,
}

impl CheckExecution {
    /// Runs the probe while holding a concurrency permit.
    async fn execute(self, permit: OwnedSemaphorePermit) -> CheckResult {
        let definition = &self.definition;
        debug!(check_id = %definition.id, "check started");
        let started = Instant::now();
        let context =
            CheckContext::new(definition.id.clone(), Arc::clone(&self.source), self.cancel.clone());
        let probe = Arc::clone(&definition.probe);
        let mut handle = tokio::spawn(async move { probe.run(context).await });

        let outcome = tokio::select! {
            biased;
            joined = &mut handle => ProbeOutcome::Finished(joined),
            () = self.cancel.cancelled() => ProbeOutcome::Interrupted,
            () = tokio::time::sleep(self.timeout) => ProbeOutcome::TimedOut,
        };
        // A losing probe is detached: a late verdict must not replace the
        // timeout or interruption, and a blocked probe must not hold the run.
        if !matches!(outcome, ProbeOutcome::Finished(_)) {
            handle.abort();
        }
        drop(permit);

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = match outcome {
            ProbeOutcome::Finished(Ok(Ok(verdict))) => {
                verdict_result(definition, verdict, duration_ms)
            }
            ProbeOutcome::Finished(Ok(Err(err))) => {
                error_result(definition, &err.to_string(), duration_ms)
            }
            ProbeOutcome::Finished(Err(err)) => {
                let detail = if err.is_panic() {
                    format!("check panicked: {}", panic_message(err.into_panic().as_ref()))
                } else {
                    "check task aborted".to_string()
                };
                warn!(check_id = %definition.id, detail = %detail, "check task failed");
                error_result(definition, &detail, duration_ms)
            }
            ProbeOutcome::Interrupted => {
                error_result(definition, "interrupted by run cancellation", duration_ms)
            }
            ProbeOutcome::TimedOut => {
                let limit_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(check_id = %definition.id, limit_ms, "check timed out");
                error_result(definition, &format!("timed out after {limit_ms} ms"), duration_ms)
            }
        };
        self.sink.record(&RunEvent::check_completed(
            &self.run_id,
            &result.check_id,
            result.status,
            result.duration_ms,
        ));
        result
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects inputs that name a check more than once.
fn ensure_unique(checks: &[Arc<CheckDefinition>]) -> Result<(), OrchestratorError> {
    let mut seen = BTreeSet::new();
    for definition in checks {
        if !seen.insert(&definition.id) {
            return Err(OrchestratorError::DuplicateCheck(definition.id.clone()));
        }
    }
    Ok(())
}

/// Waits for a concurrency permit unless the run is cancelled first.
async fn acquire_slot(
    semaphore: &Arc<Semaphore>,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Option<OwnedSemaphorePermit> {
    if cancel.is_cancelled() {
        return None;
    }
    let permit = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        () = budget_elapsed(deadline) => {
            warn!("run budget elapsed; cancelling remaining checks");
            cancel.cancel();
            None
        }
        permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
    };
    if cancel.is_cancelled() { None } else { permit }
}

/// Completes when the run budget elapses; never completes without a budget.
async fn budget_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

/// Builds a result with fields copied from the definition.
fn base_result(definition: &CheckDefinition, status: CheckStatus, duration_ms: u64) -> CheckResult {
    CheckResult {
        check_id: definition.id.clone(),
        name: definition.name.clone(),
        category: definition.category.clone(),
        severity: definition.severity,
        status,
        detail: String::new(),
        evidence: Vec::new(),
        skip_reason: None,
        recorded_at: Timestamp::now(),
        duration_ms,
    }
}

/// Builds the result for a probe verdict.
fn verdict_result(
    definition: &CheckDefinition,
    verdict: CheckVerdict,
    duration_ms: u64,
) -> CheckResult {
    CheckResult {
        detail: verdict.detail,
        evidence: verdict.evidence,
        skip_reason: verdict.skip_reason,
        ..base_result(definition, verdict.status.into(), duration_ms)
    }
}

/// Builds an `Error` result.
fn error_result(definition: &CheckDefinition, detail: &str, duration_ms: u64) -> CheckResult {
    CheckResult {
        detail: detail.to_string(),
        ..base_result(definition, CheckStatus::Error, duration_ms)
    }
}

/// Builds the `Skipped` result for a check that never started.
fn skipped_result(definition: &CheckDefinition) -> CheckResult {
    let reason = SkipReason::Cancelled;
    CheckResult {
        detail: reason.to_string(),
        skip_reason: Some(reason),
        ..base_result(definition, CheckStatus::Skipped, 0)
    }
}
