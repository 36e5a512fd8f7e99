//! Cancellation and deadline context threaded through every network call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Caller-supplied cancellation token plus an optional deadline.
///
/// Cloning shares the token, so cancelling any clone aborts every fetch
/// running under it, including pending retry sleeps.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl FetchContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fails fast when the context is already done.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.cancel.is_cancelled() {
            return Err(ApiError::cancelled("request cancelled"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ApiError::cancelled("request deadline exceeded"));
        }
        Ok(())
    }

    /// Run `future` until it completes, the token is cancelled or the
    /// deadline passes, whichever comes first.
    pub async fn run<F, T>(&self, future: F) -> Result<T, ApiError>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            output = future => Ok(output),
            _ = self.cancel.cancelled() => Err(ApiError::cancelled("request cancelled")),
            _ = deadline => Err(ApiError::cancelled("request deadline exceeded")),
        }
    }

    /// Sleep for `delay` unless the context ends first.
    pub async fn sleep(&self, delay: Duration) -> Result<(), ApiError> {
        self.run(tokio::time::sleep(delay)).await
    }
}
