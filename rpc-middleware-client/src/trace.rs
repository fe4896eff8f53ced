//! Trace hook for retry decisions.
//!
//! The retry interceptor reports what it does through [`RetryTrace`]. The
//! default, [`NoopTrace`], discards everything. With the `tracing` feature,
//! [`TracingTrace`] emits each event as a `tracing::debug!` record with
//! these fields:
//! - `rpc.method`: Full procedure name
//! - `attempt`: 0-based index of the attempt the event refers to
//! - `code`: Status code of the failed attempt, when there is one
//! - `delay_ms`: Backoff before the next attempt, for `Retrying`

use std::sync::Arc;
use std::time::Duration;

use rpc_middleware_core::Status;

/// Something the retry interceptor decided.
#[derive(Clone, Debug)]
pub enum RetryEvent<'a> {
    /// An attempt failed with a retriable status; the next attempt starts
    /// after `delay`.
    Retrying {
        procedure: &'a str,
        attempt: u32,
        status: &'a Status,
        delay: Duration,
    },
    /// The caller's context finished; no further attempts are made.
    ContextDone {
        procedure: &'a str,
        attempt: u32,
        status: &'a Status,
    },
    /// An attempt ran out of its own time while the call is still live.
    AttemptTimedOut { procedure: &'a str, attempt: u32 },
    /// The last allowed attempt failed.
    Exhausted {
        procedure: &'a str,
        attempt: u32,
        status: &'a Status,
    },
    /// A stream was reopened and `replayed` buffered messages were resent.
    StreamReconnected {
        procedure: &'a str,
        attempt: u32,
        replayed: usize,
    },
}

/// Receiver of [`RetryEvent`]s.
pub trait RetryTrace: Send + Sync {
    /// Record one event.
    fn record(&self, event: &RetryEvent<'_>);
}

impl<T: RetryTrace + ?Sized> RetryTrace for Arc<T> {
    fn record(&self, event: &RetryEvent<'_>) {
        (**self).record(event);
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTrace;

impl RetryTrace for NoopTrace {
    #[inline]
    fn record(&self, _event: &RetryEvent<'_>) {}
}

/// Forwards events to `tracing` at debug level.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTrace;

#[cfg(feature = "tracing")]
impl RetryTrace for TracingTrace {
    fn record(&self, event: &RetryEvent<'_>) {
        match event {
            RetryEvent::Retrying {
                procedure,
                attempt,
                status,
                delay,
            } => tracing::debug!(
                rpc.method = %procedure,
                attempt,
                code = %status.code(),
                delay_ms = delay.as_millis() as u64,
                error = %status,
                "retrying after retriable error"
            ),
            RetryEvent::ContextDone {
                procedure,
                attempt,
                status,
            } => tracing::debug!(
                rpc.method = %procedure,
                attempt,
                code = %status.code(),
                "call context finished, not retrying"
            ),
            RetryEvent::AttemptTimedOut { procedure, attempt } => tracing::debug!(
                rpc.method = %procedure,
                attempt,
                "attempt exceeded its per-attempt timeout"
            ),
            RetryEvent::Exhausted {
                procedure,
                attempt,
                status,
            } => tracing::debug!(
                rpc.method = %procedure,
                attempt,
                code = %status.code(),
                "retry budget exhausted"
            ),
            RetryEvent::StreamReconnected {
                procedure,
                attempt,
                replayed,
            } => tracing::debug!(
                rpc.method = %procedure,
                attempt,
                replayed,
                "stream reconnected"
            ),
        }
    }
}
