//! Serde representation of retry defaults, for loading from config files.
//!
//! ```
//! use rpc_middleware_client::RetryConfig;
//!
//! let config: RetryConfig = serde_json::from_str(r#"{
//!     "max_retries": 4,
//!     "codes": ["unavailable", "aborted"],
//!     "per_attempt_timeout_ms": 2000,
//!     "backoff": { "kind": "exponential_jitter_bounded", "base_ms": 100, "jitter": 0.2, "max_ms": 5000 }
//! }"#).unwrap();
//!
//! let options = config.into_call_options().unwrap();
//! assert_eq!(options.get_max_retries(), Some(4));
//! ```

use std::time::Duration;

use serde::Deserialize;

use rpc_middleware_core::Code;

use super::backoff::{
    BackoffFn, backoff_exponential, backoff_exponential_with_jitter,
    backoff_exponential_with_jitter_bounded, backoff_linear, backoff_linear_with_jitter,
};
use super::options::{CallOptions, ConfigError};

/// Backoff described by configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffConfig {
    /// See [`backoff_linear`].
    Linear { wait_ms: u64 },
    /// See [`backoff_linear_with_jitter`].
    LinearJitter { wait_ms: u64, jitter: f64 },
    /// See [`backoff_exponential`].
    Exponential { base_ms: u64 },
    /// See [`backoff_exponential_with_jitter`].
    ExponentialJitter { base_ms: u64, jitter: f64 },
    /// See [`backoff_exponential_with_jitter_bounded`].
    ExponentialJitterBounded { base_ms: u64, jitter: f64, max_ms: u64 },
}

impl BackoffConfig {
    /// Build the backoff function.
    pub fn build(&self) -> Result<BackoffFn, ConfigError> {
        let backoff = match *self {
            BackoffConfig::Linear { wait_ms } => backoff_linear(Duration::from_millis(wait_ms)),
            BackoffConfig::LinearJitter { wait_ms, jitter } => {
                backoff_linear_with_jitter(Duration::from_millis(wait_ms), check_jitter(jitter)?)
            }
            BackoffConfig::Exponential { base_ms } => {
                backoff_exponential(Duration::from_millis(base_ms))
            }
            BackoffConfig::ExponentialJitter { base_ms, jitter } => {
                backoff_exponential_with_jitter(
                    Duration::from_millis(base_ms),
                    check_jitter(jitter)?,
                )
            }
            BackoffConfig::ExponentialJitterBounded {
                base_ms,
                jitter,
                max_ms,
            } => backoff_exponential_with_jitter_bounded(
                Duration::from_millis(base_ms),
                check_jitter(jitter)?,
                Duration::from_millis(max_ms),
            ),
        };
        Ok(backoff)
    }
}

fn check_jitter(jitter: f64) -> Result<f64, ConfigError> {
    if jitter.is_finite() && jitter >= 0.0 {
        Ok(jitter)
    } else {
        Err(ConfigError::InvalidJitter(jitter.to_string()))
    }
}

/// Retry defaults as they appear in a configuration file.
///
/// Every field is optional; missing fields keep the built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_retries: Option<u32>,
    pub codes: Option<Vec<Code>>,
    pub per_attempt_timeout_ms: Option<u64>,
    pub include_header: Option<bool>,
    pub backoff: Option<BackoffConfig>,
}

impl RetryConfig {
    /// Convert into [`CallOptions`], validating codes and jitter.
    pub fn into_call_options(self) -> Result<CallOptions, ConfigError> {
        let mut options = CallOptions::new();
        if let Some(max_retries) = self.max_retries {
            options = options.max_retries(max_retries);
        }
        if let Some(codes) = self.codes {
            options = options.codes(codes);
        }
        if let Some(ms) = self.per_attempt_timeout_ms {
            options = options.per_attempt_timeout(Duration::from_millis(ms));
        }
        if let Some(include) = self.include_header {
            options = options.include_header(include);
        }
        if let Some(backoff) = &self.backoff {
            options = options.backoff(backoff.build()?);
        }
        options.validate()?;
        Ok(options)
    }
}
