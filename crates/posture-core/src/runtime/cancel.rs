// crates/posture-core/src/runtime/cancel.rs
// ============================================================================
// Module: Run Cancellation
// Description: Run-scoped cancellation signal shared by checks and the client.
// Purpose: Let a run timeout or caller abort every in-flight wait promptly.
// Dependencies: tokio::sync::watch
// ============================================================================

//! ## Overview
//! [`CancellationToken`] is a cloneable one-way latch. Once cancelled it stays
//! cancelled; every clone observes the same state. Waiters use
//! [`CancellationToken::cancelled`] inside `select!` to abandon backoff
//! sleeps and network calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::watch;

// ============================================================================
// SECTION: Token
// ============================================================================

/// Cloneable run-scoped cancellation latch.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    /// Shared latch state; `true` once cancelled.
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Cancels the token and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes when the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
