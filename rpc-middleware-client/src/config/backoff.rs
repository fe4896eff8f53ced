//! Backoff functions for retries.
//!
//! A [`BackoffFn`] maps a 0-based attempt index to the time to wait before
//! the next attempt. Backoff functions are pure: they hold no state and can
//! be shared by any number of concurrent calls.
//!
//! # Example
//!
//! ```
//! use rpc_middleware_client::backoff_exponential_with_jitter_bounded;
//! use std::time::Duration;
//!
//! let backoff = backoff_exponential_with_jitter_bounded(
//!     Duration::from_millis(100),
//!     0.2,
//!     Duration::from_secs(5),
//! );
//!
//! for attempt in 0..64 {
//!     assert!(backoff(attempt) <= Duration::from_secs(5));
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

/// A function from a 0-based attempt index to a wait duration.
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Largest exponent applied by the exponential backoffs. Higher attempt
/// indexes reuse it.
const MAX_EXPONENT: u32 = 62;

/// Wait a fixed duration between attempts.
pub fn backoff_linear(wait: Duration) -> BackoffFn {
    Arc::new(move |_attempt| wait)
}

/// Wait a fixed duration perturbed by up to `jitter` (a fraction, e.g. 0.1
/// for +/- 10%).
pub fn backoff_linear_with_jitter(wait: Duration, jitter: f64) -> BackoffFn {
    Arc::new(move |_attempt| jitter_up(wait, jitter))
}

/// Wait `scalar * 2^attempt`.
///
/// The exponent is clamped and the multiplication saturates at
/// [`Duration::MAX`], so very large attempt indexes never wrap.
pub fn backoff_exponential(scalar: Duration) -> BackoffFn {
    Arc::new(move |attempt| exponential(scalar, attempt))
}

/// Wait `scalar * 2^attempt`, perturbed by up to `jitter`.
pub fn backoff_exponential_with_jitter(scalar: Duration, jitter: f64) -> BackoffFn {
    Arc::new(move |attempt| jitter_up(exponential(scalar, attempt), jitter))
}

/// Like [`backoff_exponential_with_jitter`], but never waits longer than
/// `max`. The ceiling is applied after jitter.
pub fn backoff_exponential_with_jitter_bounded(
    scalar: Duration,
    jitter: f64,
    max: Duration,
) -> BackoffFn {
    Arc::new(move |attempt| jitter_up(exponential(scalar, attempt), jitter).min(max))
}

/// Multiply `duration` by a random factor drawn uniformly from
/// `[1 - jitter, 1 + jitter]`.
///
/// `jitter` is clamped to be non-negative; the result is never negative and
/// saturates at [`Duration::MAX`].
pub fn jitter_up(duration: Duration, jitter: f64) -> Duration {
    let jitter = if jitter.is_finite() { jitter.max(0.0) } else { 0.0 };
    if jitter == 0.0 || duration.is_zero() {
        return duration;
    }
    let factor = 1.0 + jitter * (rand::random::<f64>() * 2.0 - 1.0);
    let secs = duration.as_secs_f64() * factor;
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

fn exponential(scalar: Duration, attempt: u32) -> Duration {
    let exponent = attempt.min(MAX_EXPONENT);
    let nanos = scalar.as_nanos().saturating_mul(1u128 << exponent);
    match u64::try_from(nanos) {
        Ok(nanos) => Duration::from_nanos(nanos),
        Err(_) => Duration::MAX,
    }
}
