// crates/posture-core/src/runtime/mod.rs
// ============================================================================
// Module: Posture Runtime Helpers
// Description: Cache store, cancellation, and result aggregation.
// Purpose: Provide the stateful and derived pieces shared by client and runner.
// Dependencies: crate::{model, interfaces}, tokio
// ============================================================================

//! ## Overview
//! Runtime modules implement the in-memory cache store, the run-scoped
//! cancellation token, run summaries, and baseline comparison. Aggregation is
//! pure: the same results always produce the same statistics and deltas.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cache;
pub mod cancel;
pub mod compare;
pub mod summary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CacheEntry;
pub use cache::MemoryCacheStore;
pub use cancel::CancellationToken;
pub use compare::ComparisonEntry;
pub use compare::ComparisonPolicy;
pub use compare::ComparisonReport;
pub use compare::DeltaCounts;
pub use compare::DeltaKind;
pub use compare::compare;
pub use summary::RunMetadata;
pub use summary::RunStats;
pub use summary::RunSummary;
pub use summary::summarize;
