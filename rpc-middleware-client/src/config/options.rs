//! Retry options for interceptor defaults and per-call overrides.
//!
//! [`CallOptions`] leaves every field optional. An interceptor holds one
//! set of defaults; a call may carry another set whose fields take
//! precedence. Merging the two and filling in the remaining gaps yields
//! [`RetrySettings`], the concrete configuration of a single call.
//!
//! # Example
//!
//! ```
//! use rpc_middleware_client::{backoff_linear, CallOptions, Code};
//! use std::time::Duration;
//!
//! let defaults = CallOptions::new()
//!     .max_retries(3)
//!     .backoff(backoff_linear(Duration::from_millis(100)));
//!
//! // This call only retries when the server is unavailable.
//! let per_call = CallOptions::new().codes([Code::Unavailable]);
//!
//! let settings = defaults.merge(&per_call).resolve().unwrap();
//! assert_eq!(settings.max_retries(), 3);
//! assert!(settings.is_retriable_code(Code::Unavailable));
//! assert!(!settings.is_retriable_code(Code::ResourceExhausted));
//! ```

use std::sync::Arc;
use std::time::Duration;

use rpc_middleware_core::{Code, Status};

use super::backoff::{BackoffFn, backoff_linear_with_jitter};

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    use rpc_middleware_core::Code;

    /// Retries are disabled unless configured.
    pub const MAX_RETRIES: u32 = 0;

    /// Codes retried by default.
    pub const CODES: [Code; 2] = [Code::ResourceExhausted, Code::Unavailable];

    /// Base wait of the default linear backoff.
    pub const BACKOFF_WAIT: Duration = Duration::from_millis(50);

    /// Jitter of the default linear backoff (0.1 means +/- 10%).
    pub const BACKOFF_JITTER: f64 = 0.10;

    /// Whether retried attempts carry the attempt header.
    pub const INCLUDE_HEADER: bool = true;
}

/// Metadata key carrying the attempt number of a retried attempt.
pub const ATTEMPT_HEADER: &str = "x-retry-attempt";

/// Callback invoked after a failed attempt, before the next one.
///
/// Receives the number of the retry about to be made (starting at 1) and
/// the status of the failed attempt.
pub type OnRetryFn = Arc<dyn Fn(u32, &Status) + Send + Sync>;

/// Invalid retry configuration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Context codes describe the caller giving up; retrying them would
    /// ignore the caller.
    #[error("{0} reports a finished call context and cannot be retried")]
    ContextCodeNotRetriable(Code),

    /// `Ok` is not a failure.
    #[error("ok is not an error code and cannot be retried")]
    OkNotRetriable,

    /// Jitter must be a finite, non-negative fraction.
    #[error("jitter must be finite and >= 0.0, got {0}")]
    InvalidJitter(String),
}

impl From<ConfigError> for Status {
    fn from(err: ConfigError) -> Self {
        Status::invalid_argument(err.to_string())
    }
}

/// Retry options. Unset fields fall back to the next layer of defaults.
///
/// # Default Values
///
/// - `max_retries`: 0 (retries disabled)
/// - `codes`: `ResourceExhausted`, `Unavailable`
/// - `backoff`: 50ms linear with +/- 10% jitter
/// - `per_attempt_timeout`: disabled
/// - `include_header`: true
/// - `on_retry`: none
#[derive(Clone, Default)]
pub struct CallOptions {
    pub(crate) max_retries: Option<u32>,
    pub(crate) codes: Option<Vec<Code>>,
    pub(crate) backoff: Option<BackoffFn>,
    pub(crate) per_attempt_timeout: Option<Duration>,
    pub(crate) include_header: Option<bool>,
    pub(crate) on_retry: Option<OnRetryFn>,
}

impl std::fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallOptions")
            .field("max_retries", &self.max_retries)
            .field("codes", &self.codes)
            .field("backoff", &self.backoff.as_ref().map(|_| "<fn>"))
            .field("per_attempt_timeout", &self.per_attempt_timeout)
            .field("include_header", &self.include_header)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl CallOptions {
    /// Create options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable retries for this call.
    pub fn disable() -> Self {
        Self::new().max_retries(0)
    }

    /// Set the maximum number of retries (not counting the first attempt).
    ///
    /// Zero disables retrying: the call is made exactly once.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the status codes that are retried. Replaces the defaults.
    pub fn codes(mut self, codes: impl IntoIterator<Item = Code>) -> Self {
        self.codes = Some(codes.into_iter().collect());
        self
    }

    /// Set the backoff function.
    pub fn backoff(mut self, backoff: BackoffFn) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Bound the duration of each attempt.
    ///
    /// Each attempt gets a deadline of `now + timeout`, never later than the
    /// call's own deadline. An attempt that runs out of time is retried while
    /// the call's own deadline has not passed. `Duration::ZERO` disables the
    /// per-attempt timeout.
    pub fn per_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = Some(timeout);
        self
    }

    /// Whether retried attempts carry the [`ATTEMPT_HEADER`] metadata.
    pub fn include_header(mut self, include: bool) -> Self {
        self.include_header = Some(include);
        self
    }

    /// Set a callback invoked after each failed attempt that is retried.
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, &Status) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Get the configured maximum retries, if set.
    pub fn get_max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Get the configured per-attempt timeout, if set.
    pub fn get_per_attempt_timeout(&self) -> Option<Duration> {
        self.per_attempt_timeout
    }

    /// Merge `overrides` on top of `self`. Fields set in `overrides` win.
    pub fn merge(&self, overrides: &CallOptions) -> CallOptions {
        CallOptions {
            max_retries: overrides.max_retries.or(self.max_retries),
            codes: overrides.codes.clone().or_else(|| self.codes.clone()),
            backoff: overrides.backoff.clone().or_else(|| self.backoff.clone()),
            per_attempt_timeout: overrides.per_attempt_timeout.or(self.per_attempt_timeout),
            include_header: overrides.include_header.or(self.include_header),
            on_retry: overrides.on_retry.clone().or_else(|| self.on_retry.clone()),
        }
    }

    /// Validate the options without resolving them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for code in self.codes.iter().flatten() {
            if code.is_context_error() {
                return Err(ConfigError::ContextCodeNotRetriable(*code));
            }
            if *code == Code::Ok {
                return Err(ConfigError::OkNotRetriable);
            }
        }
        Ok(())
    }

    /// Fill unset fields with the [`defaults`] and validate the result.
    pub fn resolve(&self) -> Result<RetrySettings, ConfigError> {
        self.validate()?;
        Ok(RetrySettings {
            max_retries: self.max_retries.unwrap_or(defaults::MAX_RETRIES),
            codes: self
                .codes
                .clone()
                .unwrap_or_else(|| defaults::CODES.to_vec()),
            backoff: self.backoff.clone().unwrap_or_else(|| {
                backoff_linear_with_jitter(defaults::BACKOFF_WAIT, defaults::BACKOFF_JITTER)
            }),
            per_attempt_timeout: self.per_attempt_timeout.filter(|t| !t.is_zero()),
            include_header: self.include_header.unwrap_or(defaults::INCLUDE_HEADER),
            on_retry: self.on_retry.clone(),
        })
    }
}

/// The resolved, immutable retry configuration of one call.
#[derive(Clone)]
pub struct RetrySettings {
    max_retries: u32,
    codes: Vec<Code>,
    backoff: BackoffFn,
    per_attempt_timeout: Option<Duration>,
    include_header: bool,
    on_retry: Option<OnRetryFn>,
}

impl std::fmt::Debug for RetrySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrySettings")
            .field("max_retries", &self.max_retries)
            .field("codes", &self.codes)
            .field("per_attempt_timeout", &self.per_attempt_timeout)
            .field("include_header", &self.include_header)
            .field("on_retry", &self.on_retry.is_some())
            .finish_non_exhaustive()
    }
}

impl RetrySettings {
    /// Maximum number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether retries are disabled.
    pub fn is_disabled(&self) -> bool {
        self.max_retries == 0
    }

    /// The retriable codes.
    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// Whether `code` is in the retriable set.
    pub fn is_retriable_code(&self, code: Code) -> bool {
        self.codes.contains(&code)
    }

    /// The per-attempt timeout, `None` when disabled.
    pub fn per_attempt_timeout(&self) -> Option<Duration> {
        self.per_attempt_timeout
    }

    /// Whether retried attempts carry the attempt header.
    pub fn include_header(&self) -> bool {
        self.include_header
    }

    /// Wait before the attempt following the failed attempt `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    pub(crate) fn notify_retry(&self, retry: u32, status: &Status) {
        if let Some(on_retry) = &self.on_retry {
            on_retry(retry, status);
        }
    }
}
