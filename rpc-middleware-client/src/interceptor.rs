//! Interceptors for RPC clients.
//!
//! An interceptor wraps the delegate that performs one RPC attempt and
//! returns a delegate of the same shape, so interceptors stack by plain
//! function composition. Typical uses:
//! - Retry logic
//! - Adding authentication headers
//! - Logging and metrics
//!
//! # Example
//!
//! ```ignore
//! use rpc_middleware_client::{CallOptions, InterceptorChain, RetryInterceptor};
//! use std::sync::Arc;
//!
//! let mut chain = InterceptorChain::new();
//! chain.push(Arc::new(RetryInterceptor::new(CallOptions::new().max_retries(3))));
//!
//! let call = chain.wrap_unary(transport_unary);
//! let response = call(UnaryRequest::new("pkg.Service/Method", body)).await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;

use crate::{CallContext, CallOptions, Status};

/// Type alias for a boxed future returning a result.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A unary RPC request.
///
/// This is a type-erased request: the body is the encoded message. Each
/// interceptor may modify it before passing it on.
#[derive(Debug, Clone)]
pub struct UnaryRequest {
    /// The procedure being called (e.g., "package.Service/Method").
    pub procedure: String,
    /// Outgoing metadata.
    pub headers: HeaderMap,
    /// Request body (encoded message).
    pub body: Bytes,
    /// Cancellation and deadline of the call.
    pub context: CallContext,
    /// Per-call retry options. Unset fields fall back to the interceptor's
    /// defaults.
    pub options: CallOptions,
}

impl UnaryRequest {
    /// Create a new unary request with empty headers, a fresh context and
    /// no per-call options.
    pub fn new(procedure: impl Into<String>, body: Bytes) -> Self {
        Self {
            procedure: procedure.into(),
            headers: HeaderMap::new(),
            body,
            context: CallContext::new(),
            options: CallOptions::default(),
        }
    }

    /// Set the call context.
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    /// Set per-call options.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Get a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

/// A unary RPC response with headers and body.
#[derive(Debug, Clone)]
pub struct UnaryResponse {
    /// Response metadata.
    pub headers: HeaderMap,
    /// Response body (encoded message).
    pub body: Bytes,
}

impl UnaryResponse {
    /// Create a new unary response.
    pub fn new(headers: HeaderMap, body: Bytes) -> Self {
        Self { headers, body }
    }

    /// Get a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

/// The signature of a unary RPC attempt.
///
/// Interceptors wrap this function to add logic before and after the call.
pub type UnaryFunc =
    Arc<dyn Fn(UnaryRequest) -> BoxFuture<'static, Result<UnaryResponse, Status>> + Send + Sync>;

/// The "next" function in the interceptor chain.
///
/// Call this to proceed to the next interceptor or the actual RPC call.
#[derive(Clone)]
pub struct UnaryNext {
    inner: UnaryFunc,
}

impl UnaryNext {
    /// Create a new UnaryNext wrapping a function.
    pub(crate) fn new(inner: UnaryFunc) -> Self {
        Self { inner }
    }

    /// Call the next interceptor or the actual RPC.
    pub async fn call(self, request: UnaryRequest) -> Result<UnaryResponse, Status> {
        (self.inner)(request).await
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// An open client stream.
///
/// The transport discipline applies: at most one `send` and one `recv` in
/// flight at a time.
pub trait ClientStream: Send {
    /// Send one encoded message.
    fn send(&mut self, message: Bytes) -> BoxFuture<'_, Result<(), Status>>;

    /// Receive the next message. `Ok(None)` signals the end of the stream.
    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, Status>>;

    /// Half-close: no more messages will be sent.
    fn close_send(&mut self) -> BoxFuture<'_, Result<(), Status>>;
}

/// A boxed, type-erased client stream.
pub type BoxClientStream = Box<dyn ClientStream>;

impl<S: ClientStream + ?Sized> ClientStream for Box<S> {
    fn send(&mut self, message: Bytes) -> BoxFuture<'_, Result<(), Status>> {
        (**self).send(message)
    }

    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, Status>> {
        (**self).recv()
    }

    fn close_send(&mut self) -> BoxFuture<'_, Result<(), Status>> {
        (**self).close_send()
    }
}

/// A request to open a stream.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// The procedure being called (e.g., "package.Service/Method").
    pub procedure: String,
    /// Outgoing metadata.
    pub headers: HeaderMap,
    /// Cancellation and deadline of the stream.
    pub context: CallContext,
    /// Per-call retry options.
    pub options: CallOptions,
}

impl StreamRequest {
    /// Create a new stream request with empty headers, a fresh context and
    /// no per-call options.
    pub fn new(procedure: impl Into<String>) -> Self {
        Self {
            procedure: procedure.into(),
            headers: HeaderMap::new(),
            context: CallContext::new(),
            options: CallOptions::default(),
        }
    }

    /// Set the call context.
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    /// Set per-call options.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }
}

/// The signature of a stream-opening attempt.
pub type StreamFunc = Arc<
    dyn Fn(StreamRequest) -> BoxFuture<'static, Result<BoxClientStream, Status>> + Send + Sync,
>;

// ============================================================================
// Interceptor
// ============================================================================

/// An interceptor that can wrap unary and streaming RPC calls.
///
/// Both methods default to passing the delegate through unchanged.
pub trait Interceptor: Send + Sync {
    /// Wrap a unary RPC call.
    fn wrap_unary(&self, next: UnaryFunc) -> UnaryFunc {
        next
    }

    /// Wrap the opening of a stream.
    fn wrap_stream(&self, next: StreamFunc) -> StreamFunc {
        next
    }
}

/// A chain of interceptors that are applied in order.
#[derive(Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("count", &self.interceptors.len())
            .finish()
    }
}

impl InterceptorChain {
    /// Create a new empty interceptor chain.
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Add an interceptor to the chain.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Get the number of interceptors in the chain.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Wrap a unary function with all interceptors in the chain.
    ///
    /// Interceptors are applied in reverse order so that the first interceptor
    /// added is the first to process the request.
    pub fn wrap_unary(&self, next: UnaryFunc) -> UnaryFunc {
        let mut wrapped = next;
        for interceptor in self.interceptors.iter().rev() {
            wrapped = interceptor.wrap_unary(wrapped);
        }
        wrapped
    }

    /// Wrap a stream-opening function with all interceptors in the chain.
    pub fn wrap_stream(&self, next: StreamFunc) -> StreamFunc {
        let mut wrapped = next;
        for interceptor in self.interceptors.iter().rev() {
            wrapped = interceptor.wrap_stream(wrapped);
        }
        wrapped
    }
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self::new()
    }
}

/// A function-based unary interceptor.
///
/// # Example
///
/// ```ignore
/// use rpc_middleware_client::{FnInterceptor, UnaryRequest, UnaryNext};
///
/// let logging = FnInterceptor::unary(|req: UnaryRequest, next: UnaryNext| {
///     Box::pin(async move {
///         println!("Calling: {}", req.procedure);
///         next.call(req).await
///     })
/// });
/// ```
pub struct FnInterceptor<F> {
    func: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(UnaryRequest, UnaryNext) -> BoxFuture<'static, Result<UnaryResponse, Status>>
        + Send
        + Sync
        + Clone
        + 'static,
{
    /// Create a new function-based unary interceptor.
    pub fn unary(func: F) -> Self {
        Self { func }
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(UnaryRequest, UnaryNext) -> BoxFuture<'static, Result<UnaryResponse, Status>>
        + Send
        + Sync
        + Clone
        + 'static,
{
    fn wrap_unary(&self, next: UnaryFunc) -> UnaryFunc {
        let func = self.func.clone();
        Arc::new(move |request: UnaryRequest| {
            let next = UnaryNext::new(next.clone());
            func(request, next)
        })
    }
}

impl<F> Clone for FnInterceptor<F>
where
    F: Clone,
{
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
        }
    }
}
