//! Cancellation Token and Animation Handle
//!
//! One animation runs at a time; its handle is the cancellation token plus
//! the join handle of the rendering task. Cancellation is cooperative and
//! never forced: the scheduler sets the flag, the handler observes it at a
//! frame boundary, and the scheduler waits a bounded grace period for the
//! task to end. A handler that misses the grace period is logged as a
//! resource leak and abandoned rather than awaited forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Cooperative cancellation flag shared between scheduler and handler.
///
/// Also used as the process-wide shutdown signal: the daemon hands one
/// token to both the listener and the animator.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check the flag. Handlers must call this at every frame boundary.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle to the currently running animation task.
///
/// Exists for the lifetime of one animation and is destroyed (cancelled
/// and joined) before the next one starts.
#[derive(Debug)]
pub struct AnimationHandle {
    token: CancelToken,
    task: JoinHandle<()>,
}

impl AnimationHandle {
    pub(crate) fn new(token: CancelToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    /// Whether the rendering task has ended (completion, error, or
    /// acknowledged cancellation).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// The handle's cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Cancel and wait up to `grace` for the task to acknowledge.
    ///
    /// Returns `true` if the task ended within the grace period. On
    /// `false` the task is left running detached - the caller logs the
    /// leak and proceeds, accepting a possible transient double render
    /// over an unbounded hang.
    pub async fn stop(mut self, grace: Duration) -> bool {
        self.token.cancel();
        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(join_result) => {
                if let Err(e) = join_result {
                    if e.is_panic() {
                        tracing::error!(error = %e, "animation task panicked");
                    }
                }
                true
            }
            Err(_) => false,
        }
    }
}
