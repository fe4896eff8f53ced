//! Retry interceptor for unary and streaming calls.
//!
//! [`RetryInterceptor`] re-invokes a failed call while its status code is
//! retriable and the retry budget lasts, waiting out a backoff between
//! attempts. Streams are reopened transparently, replaying the messages the
//! caller already sent.
//!
//! # Decision rules
//!
//! After a failed attempt:
//! 1. If the caller's context is done, the error is returned as is.
//! 2. If the attempt ran out of its per-attempt timeout, it is retried.
//! 3. If the status code is not retriable, the error is returned as is.
//! 4. If the budget is spent, the last error is returned as is.
//! 5. Otherwise the on-retry callback runs, the backoff elapses (or the
//!    caller cancels, which ends the call with the cancellation status) and
//!    the next attempt starts.
//!
//! Errors are never wrapped: a call that fails after retries is
//! indistinguishable from a single failed attempt with the same status.
//!
//! # Example
//!
//! ```ignore
//! use rpc_middleware_client::{
//!     backoff_exponential_with_jitter, CallOptions, Code, Interceptor, RetryInterceptor,
//! };
//! use std::time::Duration;
//!
//! let retry = RetryInterceptor::new(
//!     CallOptions::new()
//!         .max_retries(3)
//!         .codes([Code::Unavailable])
//!         .backoff(backoff_exponential_with_jitter(Duration::from_millis(100), 0.1)),
//! );
//!
//! let call = retry.wrap_unary(transport_unary);
//! let response = call(request).await?;
//! ```

mod stream;
mod unary;

use std::future::Future;
use std::sync::Arc;

use http::HeaderMap;
use http::header::HeaderValue;

use crate::config::{ATTEMPT_HEADER, CallOptions, RetrySettings};
use crate::interceptor::{Interceptor, StreamFunc, UnaryFunc};
use crate::trace::{NoopTrace, RetryEvent, RetryTrace};
use crate::{CallContext, Status};

/// Client interceptor retrying failed unary calls and streams.
#[derive(Clone)]
pub struct RetryInterceptor {
    defaults: CallOptions,
    trace: Arc<dyn RetryTrace>,
}

impl std::fmt::Debug for RetryInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryInterceptor")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl RetryInterceptor {
    /// Create an interceptor applying `defaults` to every call. Per-call
    /// options carried by a request override them field by field.
    pub fn new(defaults: CallOptions) -> Self {
        Self {
            defaults,
            trace: Arc::new(NoopTrace),
        }
    }

    /// Report retry decisions to `trace`.
    pub fn with_trace<T>(mut self, trace: T) -> Self
    where
        T: RetryTrace + 'static,
    {
        self.trace = Arc::new(trace);
        self
    }

    /// The interceptor-level defaults.
    pub fn defaults(&self) -> &CallOptions {
        &self.defaults
    }
}

impl Default for RetryInterceptor {
    fn default() -> Self {
        Self::new(CallOptions::default())
    }
}

impl Interceptor for RetryInterceptor {
    fn wrap_unary(&self, next: UnaryFunc) -> UnaryFunc {
        unary::wrap(self.defaults.clone(), self.trace.clone(), next)
    }

    fn wrap_stream(&self, next: StreamFunc) -> StreamFunc {
        stream::wrap(self.defaults.clone(), self.trace.clone(), next)
    }
}

/// Metadata for attempt `attempt`, with the attempt header when enabled.
fn attempt_headers(base: &HeaderMap, settings: &RetrySettings, attempt: u32) -> HeaderMap {
    let mut headers = base.clone();
    if settings.include_header() && attempt > 0 {
        headers.insert(ATTEMPT_HEADER, HeaderValue::from(attempt));
    }
    headers
}

enum Verdict {
    Retry,
    Terminal,
}

/// The attempt loop shared by unary calls and stream (re)connection.
struct Attempts<'a> {
    settings: &'a RetrySettings,
    parent: &'a CallContext,
    procedure: &'a str,
    trace: &'a dyn RetryTrace,
}

impl Attempts<'_> {
    fn attempt_context(&self) -> CallContext {
        match self.settings.per_attempt_timeout() {
            Some(timeout) => self.parent.child_with_timeout(timeout),
            None => self.parent.clone(),
        }
    }

    fn classify(&self, attempt: u32, status: &Status) -> Verdict {
        if self.parent.is_done() {
            self.trace.record(&RetryEvent::ContextDone {
                procedure: self.procedure,
                attempt,
                status,
            });
            return Verdict::Terminal;
        }
        if status.code().is_context_error() && self.settings.per_attempt_timeout().is_some() {
            self.trace.record(&RetryEvent::AttemptTimedOut {
                procedure: self.procedure,
                attempt,
            });
            return Verdict::Retry;
        }
        if self.settings.is_retriable_code(status.code()) {
            Verdict::Retry
        } else {
            Verdict::Terminal
        }
    }

    /// Decide what follows failed attempt `attempt`.
    ///
    /// `Ok` means the backoff has elapsed and attempt `attempt + 1` may
    /// start. `Err` carries the status to hand back to the caller.
    async fn retry_or_fail(&self, attempt: u32, status: Status) -> Result<(), Status> {
        if let Verdict::Terminal = self.classify(attempt, &status) {
            return Err(status);
        }
        if attempt >= self.settings.max_retries() {
            self.trace.record(&RetryEvent::Exhausted {
                procedure: self.procedure,
                attempt,
                status: &status,
            });
            return Err(status);
        }

        let delay = self.settings.backoff_for(attempt);
        self.trace.record(&RetryEvent::Retrying {
            procedure: self.procedure,
            attempt,
            status: &status,
            delay,
        });
        self.settings.notify_retry(attempt + 1, &status);
        self.parent.sleep(delay).await
    }

    /// Run attempts starting at index `first` until one succeeds or the
    /// decision rules end the call. Returns the value and the index of the
    /// attempt that produced it.
    async fn run<T, F, Fut>(&self, first: u32, mut op: F) -> Result<(T, u32), Status>
    where
        F: FnMut(u32, CallContext) -> Fut,
        Fut: Future<Output = Result<T, Status>>,
    {
        let mut attempt = first;
        loop {
            if let Some(status) = self.parent.err() {
                self.trace.record(&RetryEvent::ContextDone {
                    procedure: self.procedure,
                    attempt,
                    status: &status,
                });
                return Err(status);
            }

            let context = self.attempt_context();
            let status = match context.run(op(attempt, context.clone())).await {
                Ok(value) => return Ok((value, attempt)),
                Err(status) => status,
            };

            self.retry_or_fail(attempt, status).await?;
            attempt += 1;
        }
    }
}
