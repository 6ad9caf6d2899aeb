// crates/posture-runner/src/lib.rs
// ============================================================================
// Module: Posture Runner
// Description: Check registry, probe contract, and bounded-concurrency orchestrator.
// Purpose: Turn a selection of checks into one ordered, complete run summary.
// Dependencies: posture-core, tokio, serde_json, tracing
// ============================================================================

//! ## Overview
//! Hosts register [`CheckDefinition`]s in a [`CheckRegistry`], select a subset,
//! and hand it to an [`Orchestrator`] together with an
//! [`posture_core::ObjectSource`]. The orchestrator isolates every probe,
//! enforces limits, honors cancellation, and reports progress to a
//! [`RunEventSink`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod events;
pub mod orchestrator;
pub mod probe;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::FileRunEventSink;
pub use events::NoopRunEventSink;
pub use events::RunEvent;
pub use events::RunEventSink;
pub use events::StderrRunEventSink;
pub use orchestrator::Orchestrator;
pub use orchestrator::OrchestratorConfig;
pub use orchestrator::OrchestratorError;
pub use probe::CheckContext;
pub use probe::CheckProbe;
pub use probe::CheckVerdict;
pub use probe::FnProbe;
pub use probe::ProbeError;
pub use probe::VerdictStatus;
pub use registry::CheckDefinition;
pub use registry::CheckRegistry;
pub use registry::CheckSelection;
pub use registry::RegistryError;
