//! Retry configuration.
//!
//! This module contains everything that decides how a call is retried:
//! - [`CallOptions`]: Interceptor defaults and per-call overrides
//! - [`RetrySettings`]: The resolved configuration of one call
//! - Backoff functions such as [`backoff_exponential_with_jitter`]
//! - [`RetryConfig`]: Defaults loaded from a configuration file

mod backoff;
mod file;
mod options;

pub use backoff::{
    BackoffFn, backoff_exponential, backoff_exponential_with_jitter,
    backoff_exponential_with_jitter_bounded, backoff_linear, backoff_linear_with_jitter,
    jitter_up,
};
pub use file::{BackoffConfig, RetryConfig};
pub use options::{ATTEMPT_HEADER, CallOptions, ConfigError, OnRetryFn, RetrySettings, defaults};
