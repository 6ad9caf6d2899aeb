// crates/posture-core/tests/cancellation.rs
// ============================================================================
// Module: Cancellation Token Tests
// Description: Tests for the run-scoped cancellation latch.
// Purpose: Validate latch semantics and waiter wake-up across clones.
// Dependencies: posture-core, tokio
// ============================================================================
//! ## Overview
//! Ensures cancellation is sticky, visible through clones, and wakes waiters
//! that started before or after the cancel call.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::time::Duration;

use posture_core::CancellationToken;

/// Verifies a fresh token is not cancelled and cancel is sticky across clones.
#[test]
fn token_cancel_is_visible_through_clones() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    token.cancel();
    assert!(clone.is_cancelled());
}

/// Verifies a waiter started before cancellation is woken.
#[tokio::test]
async fn token_wakes_pending_waiter() {
    let token = CancellationToken::new();
    let waiter = token.clone();
    let handle = tokio::spawn(async move { waiter.cancelled().await });
    tokio::task::yield_now().await;
    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
}

/// Verifies waiting on an already-cancelled token completes immediately.
#[tokio::test]
async fn token_already_cancelled_completes_immediately() {
    let token = CancellationToken::new();
    token.cancel();
    tokio::time::timeout(Duration::from_millis(100), token.cancelled()).await.unwrap();
}
