// crates/posture-graph/src/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Bounded exponential backoff with jitter for transient failures.
// Purpose: Recover from throttling without retrying indefinitely.
// Dependencies: posture-core, rand, serde
// ============================================================================

//! ## Overview
//! The nominal delay before retry `n` (1-based) is `base * 2^(n-1)`, capped at
//! `max_delay`. The actual delay is drawn uniformly from zero to the nominal
//! delay (full jitter). A server-supplied `Retry-After` replaces the computed delay,
//! still capped. After `max_attempts` total attempts the caller gives up.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use posture_core::HttpMethod;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default total attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
/// Default delay cap in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry policy for transient upstream conditions.
///
/// # Invariants
/// - `max_attempts >= 1`; a value of one disables retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Nominal delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Returns true when another attempt is allowed after `attempts` attempts.
    #[must_use]
    pub const fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Returns the nominal (pre-jitter) delay before retry `attempt` (1-based).
    #[must_use]
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let factor = 1u64 << exponent;
        let millis = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Returns the delay to wait before retry `attempt`, honoring `retry_after`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let cap = Duration::from_millis(self.max_delay_ms);
        if let Some(retry_after) = retry_after {
            return retry_after.min(cap);
        }
        let nominal = self.nominal_delay(attempt);
        let nominal_ms = u64::try_from(nominal.as_millis()).unwrap_or(u64::MAX);
        let jittered = rand::thread_rng().gen_range(0 ..= nominal_ms);
        Duration::from_millis(jittered)
    }
}

/// Returns true for HTTP statuses worth retrying.
#[must_use]
pub const fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Returns true when a request with `method` may be resent after `status`.
///
/// Mutations are only resent on throttling and unavailability, where the
/// server refused the request before applying it.
#[must_use]
pub const fn is_retryable_status(method: HttpMethod, status: u16) -> bool {
    if method.is_read() { is_transient_status(status) } else { matches!(status, 429 | 503) }
}
