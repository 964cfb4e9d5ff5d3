//! Timeout and cancellation bounds for collaborator calls.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;

use reel_media::wait_for_cancel;

use crate::error::StageError;

/// Bounds every collaborator call of one job.
///
/// A call that loses the race against the deadline or the cancel flag is
/// dropped; FFmpeg children are killed on drop.
#[derive(Debug, Clone)]
pub struct CallGuard {
    timeout: Duration,
    cancel: watch::Receiver<bool>,
}

impl CallGuard {
    pub fn new(timeout: Duration, cancel: watch::Receiver<bool>) -> Self {
        Self { timeout, cancel }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Fail with [`StageError::Cancelled`] once cancellation was requested.
    pub fn ensure_active(&self) -> Result<(), StageError> {
        if self.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        Ok(())
    }

    /// Await `fut` unless the timeout or cancellation fires first.
    pub async fn call<T, E, F>(&self, operation: &'static str, fut: F) -> Result<T, StageError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<StageError>,
    {
        self.ensure_active()?;

        tokio::select! {
            biased;
            _ = wait_for_cancel(Some(self.cancel.clone())) => Err(StageError::Cancelled),
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(inner) => inner.map_err(Into::into),
                Err(_) => {
                    warn!(operation, timeout_secs = self.timeout.as_secs(), "Collaborator call timed out");
                    Err(StageError::Timeout {
                        operation,
                        secs: self.timeout.as_secs(),
                    })
                }
            },
        }
    }
}
