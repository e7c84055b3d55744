//! Graceful shutdown for plugin-managed resources
//!
//! The host owns a single [`ShutdownSignal`] and hands out [`ShutdownToken`]s
//! to every extension. Modifiers register cleanups against the token when
//! their factory runs; firing the signal broadcasts once and runs every
//! cleanup exactly once.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

type Cleanup = Box<dyn FnOnce() + Send>;

struct Shared {
    tx: watch::Sender<bool>,
    cleanups: Mutex<Vec<(String, Cleanup)>>,
}

/// One-shot shutdown broadcast owned by the host
pub struct ShutdownSignal {
    shared: Arc<Shared>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Create an unfired signal
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                tx,
                cleanups: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Observer handle for extensions
    #[must_use]
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Fire the signal
    ///
    /// Returns `false` if it had already fired, in which case nothing runs.
    pub fn fire(&self) -> bool {
        // Claim the transition while holding the cleanup lock so a concurrent
        // `on_shutdown` either lands in the drained list or sees the flag
        let drained = {
            let mut cleanups = self
                .shared
                .cleanups
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.shared.tx.send_replace(true) {
                return false;
            }
            std::mem::take(&mut *cleanups)
        };

        tracing::info!(cleanups = drained.len(), "shutdown signal fired");
        for (label, cleanup) in drained {
            tracing::debug!(cleanup = %label, "running shutdown cleanup");
            cleanup();
        }

        true
    }

    /// Whether the signal has fired
    #[must_use]
    pub fn is_fired(&self) -> bool {
        *self.shared.tx.borrow()
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("fired", &self.is_fired())
            .finish_non_exhaustive()
    }
}

/// Cancellation context handed to extensions
///
/// Tokens observe the signal but can never fire or re-arm it.
#[derive(Clone)]
pub struct ShutdownToken {
    shared: Arc<Shared>,
}

impl ShutdownToken {
    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.shared.tx.borrow()
    }

    /// Wait until shutdown is requested
    pub async fn cancelled(&self) {
        let mut rx = self.shared.tx.subscribe();
        // The sender lives in `shared`, so `wait_for` cannot see a closed channel
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// Register a cleanup to run once when the signal fires
    ///
    /// A cleanup registered under a label that is already pending replaces
    /// the earlier one. Runs immediately if the signal has already fired.
    pub fn on_shutdown<F>(&self, label: impl Into<String>, cleanup: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let label = label.into();
        {
            let mut cleanups = self
                .shared
                .cleanups
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !*self.shared.tx.borrow() {
                match cleanups.iter_mut().find(|(existing, _)| *existing == label) {
                    Some(slot) => slot.1 = Box::new(cleanup),
                    None => cleanups.push((label, Box::new(cleanup))),
                }
                return;
            }
        }

        tracing::debug!(cleanup = %label, "shutdown already fired, running cleanup now");
        cleanup();
    }

    /// Number of cleanups waiting for the signal
    #[must_use]
    pub fn pending_cleanups(&self) -> usize {
        self.shared
            .cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for ShutdownToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownToken")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
