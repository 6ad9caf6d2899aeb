// crates/posture-graph/src/lib.rs
// ============================================================================
// Module: Posture Graph Client
// Description: Object-graph API client with caching, paging, and backoff.
// Purpose: Serve check data needs against the tenant API with bounded retries.
// Dependencies: posture-core, reqwest, tokio, rand, tracing
// ============================================================================

//! ## Overview
//! This crate implements [`posture_core::ObjectSource`] over HTTP. Reads are
//! memoized in a [`posture_core::CacheStore`], collections are paginated by
//! following continuation links, and transient upstream conditions are retried
//! with capped exponential backoff and jitter. Every wait observes the
//! run-scoped cancellation token.
//! Invariants:
//! - Only complete, successful reads are written to the cache.
//! - Bearer credentials are only sent to the configured API origin.
//! - Sessions are explicit values; there is no process-wide connection state.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod credential;
pub mod retry;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::GraphClient;
pub use client::GraphClientConfig;
pub use client::GraphClientError;
pub use credential::AccessToken;
pub use credential::CredentialError;
pub use credential::CredentialProvider;
pub use credential::StaticCredential;
pub use retry::RetryPolicy;
pub use session::Session;
