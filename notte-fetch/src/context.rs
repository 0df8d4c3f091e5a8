//! Cancellation and deadlines for outbound requests.
//!
//! Every remote call takes a [`RequestContext`]. The resilient transport
//! races its network I/O and inter-attempt sleeps against the context, so a
//! deadline or an explicit cancel stops the retry loop promptly.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

// ============================================================================
// Request Context
// ============================================================================

/// Deadline plus cancellation signal shared by a chain of calls.
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl RequestContext {
    /// A context that never times out on its own.
    pub fn background() -> Self {
        Self {
            deadline: None,
            token: CancellationToken::new(),
        }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            token: CancellationToken::new(),
        }
    }

    /// Derives a child that expires after `timeout` or with the parent,
    /// whichever comes first. Cancelling the parent cancels the child.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) => Some(parent.min(candidate)),
            None => Some(candidate),
        };
        Self {
            deadline,
            token: self.token.child_token(),
        }
    }

    /// Derives a child sharing this deadline, cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            deadline: self.deadline,
            token: self.token.child_token(),
        }
    }

    /// Cancels this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` means no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// The underlying token, for handing to components that speak
    /// `tokio_util` directly.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fails fast if the context is already done.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Cancelled`] or [`FetchError::DeadlineExceeded`].
    pub fn check(&self) -> Result<(), FetchError> {
        if self.token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if self.remaining().is_some_and(|left| left.is_zero()) {
            return Err(FetchError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves when the context is cancelled or its deadline passes,
    /// yielding the matching error.
    pub async fn done(&self) -> FetchError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => FetchError::Cancelled,
                () = tokio::time::sleep_until(deadline) => FetchError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                FetchError::Cancelled
            }
        }
    }

    /// Runs `fut` to completion unless the context finishes first.
    ///
    /// # Errors
    ///
    /// Returns the context's error if it wins the race.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, FetchError> {
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }

    /// Sleeps for `delay` unless the context finishes first.
    ///
    /// # Errors
    ///
    /// Returns the context's error if it wins the race.
    pub async fn sleep(&self, delay: Duration) -> Result<(), FetchError> {
        self.run(tokio::time::sleep(delay)).await
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}
