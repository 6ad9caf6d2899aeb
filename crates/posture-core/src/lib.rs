// crates/posture-core/src/lib.rs
// ============================================================================
// Module: Posture Core Library
// Description: Public API surface for the Posture core.
// Purpose: Expose result types, the cache store, and aggregation helpers.
// Dependencies: crate::{interfaces, model, runtime}
// ============================================================================

//! ## Overview
//! Posture core defines the data model shared by the compliance-test engine:
//! check identifiers, results, run summaries, API request shapes, the cache
//! store contract, and the aggregation/comparison functions consumed by report
//! renderers. It has no network or scheduling code; those live in
//! `posture-graph` and `posture-runner`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod interfaces;
pub mod model;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use model::*;

pub use interfaces::ApiError;
pub use interfaces::CacheStats;
pub use interfaces::CacheStore;
pub use interfaces::ClearScope;
pub use interfaces::ObjectSource;
pub use runtime::CacheEntry;
pub use runtime::CancellationToken;
pub use runtime::ComparisonEntry;
pub use runtime::ComparisonPolicy;
pub use runtime::ComparisonReport;
pub use runtime::DeltaCounts;
pub use runtime::DeltaKind;
pub use runtime::MemoryCacheStore;
pub use runtime::RunMetadata;
pub use runtime::RunStats;
pub use runtime::RunSummary;
pub use runtime::compare;
pub use runtime::summarize;
