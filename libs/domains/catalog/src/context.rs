//! Per-call cancellation state.
//!
//! A [`CallContext`] travels with one inbound request into the stores. Long
//! running loops poll [`CallContext::check`] once per unit of work so a
//! cancelled or expired call stops promptly instead of only at entry. Waits
//! that may block indefinitely (a full response channel, a silent client) go
//! through [`CallContext::run`] so they end at the same moment.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CatalogError, CatalogResult};

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Wrap an existing token, e.g. one owned by a stream watcher.
    pub fn from_token(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self { token, deadline }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail with `Canceled` or `DeadlineExceeded` if the call should stop.
    ///
    /// Explicit cancellation wins over an expired deadline.
    pub fn check(&self) -> CatalogResult<()> {
        if self.token.is_cancelled() {
            return Err(CatalogError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CatalogError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the call is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {}
            },
            None => self.token.cancelled().await,
        }
    }

    /// Drive `fut` until it completes or the call stops, whichever is first.
    ///
    /// A stopped call drops `fut` and yields the same error as [`check`](Self::check).
    pub async fn run<F: Future>(&self, fut: F) -> CatalogResult<F::Output> {
        tokio::select! {
            biased;
            _ = self.done() => Err(self.stopped()),
            output = fut => Ok(output),
        }
    }

    fn stopped(&self) -> CatalogError {
        if self.token.is_cancelled() {
            CatalogError::Canceled
        } else {
            CatalogError::DeadlineExceeded
        }
    }
}
