//! Cooperative cancellation for in-flight runs.
//!
//! A [`CancelToken`] is shared between the orchestrator and every command
//! it spawns. Cancellation is idempotent - only the first reason is kept.

use parking_lot::RwLock;
use tokio::sync::watch;

/// A token for cooperative cancellation.
///
/// Cloning is done through `Arc`; the token itself holds the shared state.
pub struct CancelToken {
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Broadcast channel flipped to `true` exactly once.
    signal: watch::Sender<bool>,
}

impl CancelToken {
    /// Creates a new token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reason: RwLock::new(None),
            signal: watch::Sender::new(false),
        }
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        {
            let mut slot = self.reason.write();
            if slot.is_some() {
                return;
            }
            *slot = Some(reason.into());
        }
        let _ = self.signal.send(true);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Resolves once cancellation has been requested.
    ///
    /// Resolves immediately if the token is already cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.signal.subscribe();
        // wait_for checks the current value before waiting, so a token
        // cancelled before the subscription still resolves.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
