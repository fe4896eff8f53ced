//! Client interceptors for RPC calls: retries with backoff.
//!
//! This crate wraps the function that performs one RPC attempt (unary or
//! stream-opening) and returns a function of the same shape that retries
//! failed attempts.
//!
//! ## Features
//!
//! - Retries for unary calls and streams, keyed on status codes
//! - Linear and exponential backoff, with optional jitter and ceiling
//! - Per-call overrides of the interceptor defaults
//! - Per-attempt timeouts bounded by the call's own deadline
//! - Transparent stream reconnection replaying already-sent messages
//! - Defaults loadable from configuration files via serde
//! - Optional `tracing` integration (`tracing` feature)
//!
//! ## Example
//!
//! ```ignore
//! use rpc_middleware_client::{
//!     backoff_exponential_with_jitter_bounded, CallOptions, Code, Interceptor,
//!     RetryInterceptor, UnaryRequest,
//! };
//! use std::time::Duration;
//!
//! let retry = RetryInterceptor::new(
//!     CallOptions::new()
//!         .max_retries(4)
//!         .codes([Code::Unavailable, Code::ResourceExhausted])
//!         .backoff(backoff_exponential_with_jitter_bounded(
//!             Duration::from_millis(100),
//!             0.2,
//!             Duration::from_secs(5),
//!         )),
//! );
//!
//! // `transport` is any `UnaryFunc` that performs one attempt over the wire.
//! let call = retry.wrap_unary(transport);
//!
//! let response = call(UnaryRequest::new("greet.v1.GreetService/Greet", body)).await?;
//!
//! // Idempotency is the caller's call: opt a single request out.
//! let response = call(
//!     UnaryRequest::new("orders.v1.OrderService/Create", body)
//!         .with_options(CallOptions::disable()),
//! )
//! .await?;
//! ```
//!
//! ## Streams
//!
//! ```ignore
//! use rpc_middleware_client::{ClientStream, Interceptor, RetryInterceptor, StreamRequest};
//!
//! let open = retry.wrap_stream(transport_stream);
//! let mut stream = open(StreamRequest::new("chat.v1.ChatService/Talk")).await?;
//!
//! // If the connection drops here, the stream reopens and "hello" is resent.
//! stream.send(Bytes::from_static(b"hello")).await?;
//! stream.close_send().await?;
//! while let Some(message) = stream.recv().await? {
//!     println!("got {} bytes", message.len());
//! }
//! ```

mod config;
mod context;
mod interceptor;
mod retry;
mod trace;

// Re-export core types
pub use rpc_middleware_core::{Code, ErrorBody, ErrorDetail, ParseCodeError, Status};

// Re-export bytes for message payloads
pub use bytes::Bytes;

pub use config::{
    ATTEMPT_HEADER, BackoffConfig, BackoffFn, CallOptions, ConfigError, OnRetryFn, RetryConfig,
    RetrySettings, backoff_exponential, backoff_exponential_with_jitter,
    backoff_exponential_with_jitter_bounded, backoff_linear, backoff_linear_with_jitter, defaults,
    jitter_up,
};
pub use context::CallContext;
pub use interceptor::{
    BoxClientStream, BoxFuture, ClientStream, FnInterceptor, Interceptor, InterceptorChain,
    StreamFunc, StreamRequest, UnaryFunc, UnaryNext, UnaryRequest, UnaryResponse,
};
pub use retry::RetryInterceptor;
#[cfg(feature = "tracing")]
pub use trace::TracingTrace;
pub use trace::{NoopTrace, RetryEvent, RetryTrace};
