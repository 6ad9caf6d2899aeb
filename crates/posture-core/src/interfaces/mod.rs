// crates/posture-core/src/interfaces/mod.rs
// ============================================================================
// Module: Posture Interfaces
// Description: Backend-agnostic interfaces for caching and object retrieval.
// Purpose: Define the contract surfaces used by checks and the orchestrator.
// Dependencies: crate::{model, runtime}, async-trait, thiserror
// ============================================================================

//! ## Overview
//! Interfaces decouple checks from the concrete API client. Checks only see an
//! [`ObjectSource`]; the client only sees a [`CacheStore`]. Implementations
//! must be internally synchronized so callers never lock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::request::ApiRequest;
use crate::model::request::ApiResponse;
use crate::runtime::cancel::CancellationToken;

// ============================================================================
// SECTION: Cache Store
// ============================================================================

/// Scope of a cache clear operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearScope {
    /// Remove every entry.
    All,
    /// Remove entries whose key starts with the prefix.
    Prefix(String),
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of live entries.
    pub entries: usize,
    /// Lookups that returned a value.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
}

/// Memoized value store keyed by resource key.
///
/// A miss is a normal outcome, not an error. Writes are last-write-wins.
pub trait CacheStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value);

    /// Removes entries in scope and returns how many were removed.
    fn clear(&self, scope: &ClearScope) -> usize;

    /// Returns current counters.
    fn stats(&self) -> CacheStats;
}

// ============================================================================
// SECTION: Object Source
// ============================================================================

/// Errors surfaced by object sources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Retries were exhausted against a transient upstream condition.
    #[error("api unavailable after {attempts} attempt(s): {reason}")]
    Unavailable {
        /// Attempts made before giving up.
        attempts: u32,
        /// Last transient condition observed.
        reason: String,
    },
    /// Pagination was interrupted after at least one page.
    #[error("partial fetch after {pages} page(s) with {} item(s): {reason}", .items.len())]
    PartialFetch {
        /// Pages successfully fetched.
        pages: u32,
        /// Items gathered before the failure, in server order.
        items: Vec<Value>,
        /// Failure that interrupted pagination.
        reason: String,
    },
    /// The API returned a non-retryable status.
    #[error("api returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response.
        message: String,
    },
    /// The request could not be built or sent.
    #[error("api transport error: {0}")]
    Transport(String),
    /// The response body could not be decoded.
    #[error("api decode error: {0}")]
    Decode(String),
    /// The credential provider failed to supply a token.
    #[error("api credential error: {0}")]
    Credential(String),
    /// The request is malformed.
    #[error("invalid api request: {0}")]
    InvalidRequest(String),
    /// The run-scoped cancellation signal fired.
    #[error("api request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Returns the items gathered before a partial fetch failed.
    #[must_use]
    pub fn partial_items(&self) -> Option<&[Value]> {
        match self {
            Self::PartialFetch {
                items, ..
            } => Some(items),
            _ => None,
        }
    }
}

/// Read/write access to the remote object graph.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Executes a request, observing `cancel` for every wait.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request cannot be satisfied.
    async fn fetch(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError>;
}
