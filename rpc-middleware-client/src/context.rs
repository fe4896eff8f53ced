//! Call context: cancellation and deadline for one logical RPC call.
//!
//! A [`CallContext`] travels with every request through the interceptor
//! chain. Transports should stop work once [`CallContext::done`] resolves;
//! interceptors use [`CallContext::run`] to race their own waits against it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use rpc_middleware_core::Status;

/// Cancellation signal and optional deadline for an RPC call.
///
/// Cloning a context shares its cancellation signal. Children derived with
/// [`child_with_timeout`](CallContext::child_with_timeout) share the signal
/// too, and their deadline never exceeds the parent's.
///
/// # Example
///
/// ```
/// use rpc_middleware_client::CallContext;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = CallContext::with_timeout(Duration::from_secs(5));
/// assert!(!ctx.is_done());
///
/// ctx.cancel();
/// assert_eq!(ctx.err().unwrap().code(), rpc_middleware_client::Code::Canceled);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CallContext {
    cancel: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Create a context with no deadline that is never cancelled unless
    /// [`cancel`](CallContext::cancel) is called.
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            cancel: Arc::new(cancel),
            deadline: None,
        }
    }

    /// Create a context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().child_with_timeout(timeout)
    }

    /// Create a context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::new()
        }
    }

    /// Derive a child context expiring `timeout` from now.
    ///
    /// The child shares this context's cancellation signal. Its deadline is
    /// the earlier of the parent's deadline and `now + timeout`.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, own) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (Some(parent), None) => Some(parent),
            (None, own) => own,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline,
        }
    }

    /// Cancel the call. Every context sharing this signal observes it.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Whether [`cancel`](CallContext::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// The status describing why the context is done, or `None` while live.
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<Status> {
        if self.is_cancelled() {
            return Some(Status::cancelled("context canceled"));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Some(Status::deadline_exceeded("context deadline exceeded"))
            }
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) {
        let mut rx = self.cancel.subscribe();
        let cancelled = async move {
            // The sender lives as long as `self`; an error here means nobody
            // can cancel anymore, so wait forever.
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = cancelled => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => cancelled.await,
        }
    }

    /// Run `fut` until it completes or the context is done, whichever is
    /// first. A context that is already done does not poll `fut` at all.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Status>
    where
        F: Future<Output = Result<T, Status>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            result = fut => result,
            _ = self.done() => Err(self.err().unwrap_or_else(|| Status::cancelled("context canceled"))),
        }
    }

    /// Sleep for `duration` unless the context finishes first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Status> {
        if duration.is_zero() {
            return match self.err() {
                Some(err) => Err(err),
                None => Ok(()),
            };
        }
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}
