//! Retrying client streams.
//!
//! [`RetryingStream`] sits between the caller and the transport's stream.
//! When opening, sending, closing the send side, or receiving before the
//! first response message fails with a retriable status, it opens a new
//! underlying stream, replays every message the caller had sent (and the
//! half-close, if the caller had closed), and carries on. One attempt
//! counter covers the whole logical stream, so reconnects draw from the same
//! retry budget as the initial open.
//!
//! Once a response message has reached the caller, receive failures are
//! terminal: a new stream would deliver that message again.

use std::sync::Arc;

use bytes::Bytes;

use super::{Attempts, attempt_headers};
use crate::config::{CallOptions, RetrySettings};
use crate::interceptor::{BoxClientStream, BoxFuture, ClientStream, StreamFunc, StreamRequest};
use crate::trace::{RetryEvent, RetryTrace};
use crate::{CallContext, Status};

pub(super) fn wrap(
    defaults: CallOptions,
    trace: Arc<dyn RetryTrace>,
    next: StreamFunc,
) -> StreamFunc {
    Arc::new(
        move |request: StreamRequest| -> BoxFuture<'static, Result<BoxClientStream, Status>> {
            let settings = defaults.merge(&request.options).resolve();
            let next = next.clone();
            let trace = trace.clone();

            Box::pin(async move {
                let settings = settings?;
                if settings.is_disabled() {
                    return next(request).await;
                }
                let stream = RetryingStream::open(next, request, settings, trace).await?;
                Ok(Box::new(stream) as BoxClientStream)
            })
        },
    )
}

/// Lifecycle of a [`RetryingStream`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum StreamState {
    /// Opening an underlying stream and replaying buffered messages.
    Connecting,
    /// An underlying stream is open.
    Active,
    /// A terminal error ended the stream. Every later operation returns it.
    Failed(Status),
    /// The server ended the response stream.
    Closed,
}

/// A client stream that reconnects on retriable failures.
pub(crate) struct RetryingStream {
    next: StreamFunc,
    request: StreamRequest,
    settings: RetrySettings,
    trace: Arc<dyn RetryTrace>,
    /// The current underlying stream and the context bounding it.
    inner: Option<(BoxClientStream, CallContext)>,
    /// Index of the attempt that opened `inner`.
    attempt: u32,
    /// Messages to replay on reconnect.
    buffered: Vec<Bytes>,
    send_closed: bool,
    received: bool,
    state: StreamState,
}

impl RetryingStream {
    pub(crate) async fn open(
        next: StreamFunc,
        request: StreamRequest,
        settings: RetrySettings,
        trace: Arc<dyn RetryTrace>,
    ) -> Result<Self, Status> {
        let mut stream = Self {
            next,
            request,
            settings,
            trace,
            inner: None,
            attempt: 0,
            buffered: Vec::new(),
            send_closed: false,
            received: false,
            state: StreamState::Connecting,
        };
        stream.connect(0).await?;
        Ok(stream)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &StreamState {
        &self.state
    }

    fn attempts(&self) -> Attempts<'_> {
        Attempts {
            settings: &self.settings,
            parent: &self.request.context,
            procedure: &self.request.procedure,
            trace: &*self.trace,
        }
    }

    /// Open an underlying stream, starting at attempt `first`, and bring it
    /// up to date with what the caller has sent so far.
    async fn connect(&mut self, first: u32) -> Result<(), Status> {
        self.state = StreamState::Connecting;
        self.inner = None;

        let next = &self.next;
        let request = &self.request;
        let settings = &self.settings;
        let buffered = &self.buffered;
        let send_closed = self.send_closed;

        let result = self
            .attempts()
            .run(first, |attempt, context| {
                let mut retry = request.clone();
                retry.headers = attempt_headers(&request.headers, settings, attempt);
                retry.context = context.clone();
                let opening = next(retry);
                async move {
                    let mut stream = opening.await?;
                    for message in buffered {
                        stream.send(message.clone()).await?;
                    }
                    if send_closed {
                        stream.close_send().await?;
                    }
                    Ok::<_, Status>((stream, context))
                }
            })
            .await;

        match result {
            Ok((inner, attempt)) => {
                if attempt > 0 {
                    self.trace.record(&RetryEvent::StreamReconnected {
                        procedure: &self.request.procedure,
                        attempt,
                        replayed: self.buffered.len(),
                    });
                }
                self.inner = Some(inner);
                self.attempt = attempt;
                self.state = StreamState::Active;
                Ok(())
            }
            Err(status) => Err(self.fail(status)),
        }
    }

    /// Reconnect after the current stream failed with `status`, or fail the
    /// whole stream if the failure is terminal.
    async fn recover(&mut self, status: Status) -> Result<(), Status> {
        let outcome = self.attempts().retry_or_fail(self.attempt, status).await;
        if let Err(status) = outcome {
            return Err(self.fail(status));
        }
        self.connect(self.attempt + 1).await
    }

    fn fail(&mut self, status: Status) -> Status {
        self.inner = None;
        self.buffered.clear();
        self.state = StreamState::Failed(status.clone());
        status
    }

    /// The open underlying stream, reconnecting first if an earlier
    /// operation was dropped while reconnecting.
    async fn current(&mut self) -> Result<&mut (BoxClientStream, CallContext), Status> {
        match &self.state {
            StreamState::Failed(status) => return Err(status.clone()),
            StreamState::Closed => return Err(Status::failed_precondition("stream already ended")),
            StreamState::Connecting | StreamState::Active => {}
        }
        if self.inner.is_none() {
            self.connect(self.attempt + 1).await?;
        }
        self.inner
            .as_mut()
            .ok_or_else(|| Status::internal("stream is not connected"))
    }

    async fn send_message(&mut self, message: Bytes) -> Result<(), Status> {
        loop {
            let (stream, context) = self.current().await?;
            match context.run(stream.send(message.clone())).await {
                Ok(()) => {
                    if self.attempt < self.settings.max_retries() {
                        self.buffered.push(message);
                    }
                    return Ok(());
                }
                Err(status) => self.recover(status).await?,
            }
        }
    }

    async fn recv_message(&mut self) -> Result<Option<Bytes>, Status> {
        if self.state == StreamState::Closed {
            return Ok(None);
        }
        loop {
            let (stream, context) = self.current().await?;
            match context.run(stream.recv()).await {
                Ok(Some(message)) => {
                    self.received = true;
                    return Ok(Some(message));
                }
                Ok(None) => {
                    self.state = StreamState::Closed;
                    self.buffered.clear();
                    return Ok(None);
                }
                Err(status) if self.received => return Err(self.fail(status)),
                Err(status) => self.recover(status).await?,
            }
        }
    }

    async fn close(&mut self) -> Result<(), Status> {
        match &self.state {
            StreamState::Failed(status) => return Err(status.clone()),
            StreamState::Closed => return Ok(()),
            StreamState::Connecting | StreamState::Active => {}
        }
        if self.send_closed {
            return Ok(());
        }
        self.send_closed = true;
        if self.inner.is_none() {
            // Reconnecting replays the half-close.
            return self.connect(self.attempt + 1).await;
        }
        let (stream, context) = self.current().await?;
        match context.run(stream.close_send()).await {
            Ok(()) => Ok(()),
            // Reconnecting replays the half-close.
            Err(status) => self.recover(status).await,
        }
    }
}

impl ClientStream for RetryingStream {
    fn send(&mut self, message: Bytes) -> BoxFuture<'_, Result<(), Status>> {
        Box::pin(self.send_message(message))
    }

    fn recv(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, Status>> {
        Box::pin(self.recv_message())
    }

    fn close_send(&mut self) -> BoxFuture<'_, Result<(), Status>> {
        Box::pin(self.close())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::config::{ATTEMPT_HEADER, backoff_linear};
    use crate::interceptor::Interceptor;
    use crate::retry::RetryInterceptor;
    use crate::trace::NoopTrace;
    use crate::trace::testing::RecordingTrace;
    use crate::{CallOptions, Code};

    use super::*;

    /// Scripted outcomes for one underlying stream. Empty queues succeed.
    #[derive(Default)]
    struct Script {
        sends: VecDeque<Result<(), Status>>,
        closes: VecDeque<Result<(), Status>>,
        recvs: VecDeque<Result<Option<&'static str>, Status>>,
        /// Time the transport takes to open this stream.
        open_delay: Duration,
        /// Once `recvs` is drained, `recv` waits forever instead of ending.
        hang_when_drained: bool,
    }

    impl Script {
        fn send_fails_at(index: usize, status: Status) -> Self {
            let mut sends: VecDeque<_> = std::iter::repeat_n(Ok(()), index).collect();
            sends.push_back(Err(status));
            Self {
                sends,
                ..Self::default()
            }
        }

        fn recvs(recvs: impl IntoIterator<Item = Result<Option<&'static str>, Status>>) -> Self {
            Self {
                recvs: recvs.into_iter().collect(),
                ..Self::default()
            }
        }

        fn close_fails(status: Status) -> Self {
            Self {
                closes: VecDeque::from([Err(status)]),
                ..Self::default()
            }
        }

        fn slow_open(delay: Duration) -> Self {
            Self {
                open_delay: delay,
                ..Self::default()
            }
        }
    }

    struct MockStream {
        script: Script,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ClientStream for MockStream {
        fn send(&mut self, message: Bytes) -> BoxFuture<'_, Result<(), Status>> {
            Box::pin(async move {
                self.script.sends.pop_front().unwrap_or(Ok(()))?;
                let text = String::from_utf8(message.to_vec()).unwrap();
                self.log.lock().unwrap().push(text);
                Ok(())
            })
        }

        fn recv(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, Status>> {
            Box::pin(async move {
                if self.script.recvs.is_empty() && self.script.hang_when_drained {
                    std::future::pending::<()>().await;
                }
                let next = self.script.recvs.pop_front().unwrap_or(Ok(None))?;
                Ok(next.map(|text| Bytes::from_static(text.as_bytes())))
            })
        }

        fn close_send(&mut self) -> BoxFuture<'_, Result<(), Status>> {
            Box::pin(async move {
                self.script.closes.pop_front().unwrap_or(Ok(()))?;
                self.log.lock().unwrap().push("<close>".to_owned());
                Ok(())
            })
        }
    }

    /// A transport handing out scripted streams in order.
    struct Transport {
        opens: Mutex<VecDeque<Result<Script, Status>>>,
        /// Per opened stream: request headers and what the stream received.
        streams: Mutex<Vec<(http::HeaderMap, Arc<Mutex<Vec<String>>>)>>,
    }

    impl Transport {
        fn new(opens: impl IntoIterator<Item = Result<Script, Status>>) -> Arc<Self> {
            Arc::new(Self {
                opens: Mutex::new(opens.into_iter().collect()),
                streams: Mutex::new(Vec::new()),
            })
        }

        fn func(self: &Arc<Self>) -> StreamFunc {
            let this = self.clone();
            Arc::new(move |req: StreamRequest| -> BoxFuture<'static, Result<BoxClientStream, Status>> {
                let opened = this
                    .opens
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Err(Status::internal("no more streams")));
                let log = Arc::new(Mutex::new(Vec::new()));
                this.streams
                    .lock()
                    .unwrap()
                    .push((req.headers.clone(), log.clone()));
                Box::pin(async move {
                    let script = opened?;
                    tokio::time::sleep(script.open_delay).await;
                    Ok(Box::new(MockStream { script, log }) as BoxClientStream)
                })
            })
        }

        fn opens(&self) -> usize {
            self.streams.lock().unwrap().len()
        }

        fn received(&self, stream: usize) -> Vec<String> {
            self.streams.lock().unwrap()[stream].1.lock().unwrap().clone()
        }

        fn attempt_header(&self, stream: usize) -> Option<String> {
            self.streams.lock().unwrap()[stream]
                .0
                .get(ATTEMPT_HEADER)
                .map(|v| v.to_str().unwrap().to_owned())
        }
    }

    fn retrying(max_retries: u32) -> RetrySettings {
        CallOptions::new()
            .max_retries(max_retries)
            .backoff(backoff_linear(Duration::from_millis(10)))
            .resolve()
            .unwrap()
    }

    async fn open(transport: &Arc<Transport>, max_retries: u32) -> Result<RetryingStream, Status> {
        open_with(transport, retrying(max_retries)).await
    }

    async fn open_with(
        transport: &Arc<Transport>,
        settings: RetrySettings,
    ) -> Result<RetryingStream, Status> {
        RetryingStream::open(
            transport.func(),
            StreamRequest::new("test.v1.Chat/Talk"),
            settings,
            Arc::new(NoopTrace),
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_replays_buffered_messages_in_order() {
        let transport = Transport::new([
            Ok(Script::send_fails_at(3, Status::unavailable("reset"))),
            Ok(Script::default()),
        ]);
        let mut stream = open(&transport, 3).await.unwrap();

        for message in ["a", "b", "c", "d"] {
            stream.send(Bytes::from_static(message.as_bytes())).await.unwrap();
        }

        assert_eq!(transport.opens(), 2);
        assert_eq!(transport.received(0), vec!["a", "b", "c"]);
        assert_eq!(transport.received(1), vec!["a", "b", "c", "d"]);
        assert_eq!(transport.attempt_header(0), None);
        assert_eq!(transport.attempt_header(1), Some("1".to_owned()));
        assert_eq!(stream.state(), &StreamState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_is_retried() {
        let transport = Transport::new([
            Err(Status::unavailable("connect refused")),
            Err(Status::unavailable("connect refused")),
            Ok(Script::recvs([Ok(Some("pong"))])),
        ]);
        let mut stream = open(&transport, 2).await.unwrap();

        assert_eq!(stream.recv().await.unwrap(), Some(Bytes::from_static(b"pong")));
        assert_eq!(transport.opens(), 3);
        assert_eq!(transport.attempt_header(2), Some("2".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_non_retriable_fails() {
        let transport = Transport::new([Err(Status::permission_denied("nope"))]);

        let err = match open(&transport, 5).await {
            Ok(_) => panic!("expected open to fail"),
            Err(err) => err,
        };

        assert_eq!(err, Status::permission_denied("nope"));
        assert_eq!(transport.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_before_first_message_reconnects_and_replays_close() {
        let transport = Transport::new([
            Ok(Script::recvs([Err(Status::unavailable("reset"))])),
            Ok(Script::recvs([Ok(Some("reply"))])),
        ]);
        let mut stream = open(&transport, 2).await.unwrap();

        stream.send(Bytes::from_static(b"request")).await.unwrap();
        stream.close_send().await.unwrap();
        let reply = stream.recv().await.unwrap();

        assert_eq!(reply, Some(Bytes::from_static(b"reply")));
        assert_eq!(transport.received(0), vec!["request", "<close>"]);
        assert_eq!(transport.received(1), vec!["request", "<close>"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_after_delivered_message_is_terminal() {
        let transport = Transport::new([
            Ok(Script::recvs([Ok(Some("first")), Err(Status::unavailable("reset"))])),
            Ok(Script::default()),
        ]);
        let mut stream = open(&transport, 3).await.unwrap();

        assert_eq!(stream.recv().await.unwrap(), Some(Bytes::from_static(b"first")));
        let err = stream.recv().await.unwrap_err();

        assert_eq!(err, Status::unavailable("reset"));
        assert_eq!(transport.opens(), 1);
        assert_eq!(stream.state(), &StreamState::Failed(Status::unavailable("reset")));
        assert_eq!(
            stream.send(Bytes::from_static(b"more")).await.unwrap_err(),
            Status::unavailable("reset")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_share_one_budget() {
        let transport = Transport::new([
            Err(Status::unavailable("down")),
            Ok(Script::send_fails_at(0, Status::unavailable("reset"))),
            Ok(Script::send_fails_at(0, Status::unavailable("reset again"))),
            Ok(Script::default()),
        ]);
        let mut stream = open(&transport, 2).await.unwrap();

        let err = stream.send(Bytes::from_static(b"x")).await.unwrap_err();

        assert_eq!(err, Status::unavailable("reset again"));
        assert_eq!(transport.opens(), 3);
        assert!(matches!(stream.state(), StreamState::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retriable_send_failure_is_terminal() {
        let transport = Transport::new([
            Ok(Script::send_fails_at(0, Status::invalid_argument("bad message"))),
            Ok(Script::default()),
        ]);
        let mut stream = open(&transport, 3).await.unwrap();

        let err = stream.send(Bytes::from_static(b"x")).await.unwrap_err();

        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(transport.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_buffering_when_budget_is_spent() {
        let transport = Transport::new([
            Ok(Script::send_fails_at(1, Status::unavailable("reset"))),
            Ok(Script::default()),
        ]);
        let mut stream = open(&transport, 1).await.unwrap();

        stream.send(Bytes::from_static(b"a")).await.unwrap();
        assert_eq!(stream.buffered.len(), 1);

        stream.send(Bytes::from_static(b"b")).await.unwrap();
        stream.send(Bytes::from_static(b"c")).await.unwrap();

        assert_eq!(stream.attempt, 1);
        assert_eq!(stream.buffered.len(), 1);
        assert_eq!(transport.received(1), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_send_failure_reconnects_and_replays_close() {
        let transport = Transport::new([
            Ok(Script::close_fails(Status::unavailable("reset"))),
            Ok(Script::recvs([Ok(Some("reply"))])),
        ]);
        let mut stream = open(&transport, 2).await.unwrap();

        stream.send(Bytes::from_static(b"a")).await.unwrap();
        stream.close_send().await.unwrap();

        assert_eq!(transport.opens(), 2);
        assert_eq!(transport.received(0), vec!["a"]);
        assert_eq!(transport.received(1), vec!["a", "<close>"]);
        assert_eq!(stream.recv().await.unwrap(), Some(Bytes::from_static(b"reply")));

        // Already closed: no second half-close reaches the transport.
        stream.close_send().await.unwrap();
        assert_eq!(transport.received(1), vec!["a", "<close>"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_send_during_reconnect_resumes() {
        let transport = Transport::new([
            Ok(Script::send_fails_at(0, Status::unavailable("reset"))),
            Ok(Script::slow_open(Duration::from_secs(5))),
            Ok(Script::recvs([Ok(Some("reply"))])),
        ]);
        let mut stream = open(&transport, 3).await.unwrap();

        let dropped = tokio::time::timeout(
            Duration::from_secs(1),
            stream.send(Bytes::from_static(b"a")),
        )
        .await;
        assert!(dropped.is_err());
        assert_eq!(stream.state(), &StreamState::Connecting);

        stream.send(Bytes::from_static(b"b")).await.unwrap();
        assert_eq!(stream.recv().await.unwrap(), Some(Bytes::from_static(b"reply")));

        assert_eq!(transport.opens(), 3);
        assert_eq!(transport.received(2), vec!["b"]);
        assert_eq!(stream.state(), &StreamState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_close_during_reconnect_replays_close() {
        let transport = Transport::new([
            Ok(Script::close_fails(Status::unavailable("reset"))),
            Ok(Script::slow_open(Duration::from_secs(5))),
            Ok(Script::recvs([Ok(Some("reply"))])),
        ]);
        let mut stream = open(&transport, 3).await.unwrap();

        stream.send(Bytes::from_static(b"a")).await.unwrap();
        let dropped = tokio::time::timeout(Duration::from_secs(1), stream.close_send()).await;
        assert!(dropped.is_err());

        assert_eq!(stream.recv().await.unwrap(), Some(Bytes::from_static(b"reply")));
        assert_eq!(transport.received(2), vec!["a", "<close>"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_attempt_timeout_retries_hung_open() {
        let transport = Transport::new([
            Ok(Script::slow_open(Duration::from_secs(3600))),
            Ok(Script::recvs([Ok(Some("pong"))])),
        ]);
        let settings = CallOptions::new()
            .max_retries(2)
            .backoff(backoff_linear(Duration::from_millis(10)))
            .per_attempt_timeout(Duration::from_millis(100))
            .resolve()
            .unwrap();
        let mut stream = open_with(&transport, settings).await.unwrap();

        assert_eq!(transport.opens(), 2);
        assert_eq!(stream.recv().await.unwrap(), Some(Bytes::from_static(b"pong")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_attempt_timeout_after_delivered_message_is_terminal() {
        let transport = Transport::new([
            Ok(Script {
                hang_when_drained: true,
                ..Script::recvs([Ok(Some("first"))])
            }),
            Ok(Script::default()),
        ]);
        let settings = CallOptions::new()
            .max_retries(3)
            .backoff(backoff_linear(Duration::from_millis(10)))
            .per_attempt_timeout(Duration::from_millis(100))
            .resolve()
            .unwrap();
        let mut stream = open_with(&transport, settings).await.unwrap();

        assert_eq!(stream.recv().await.unwrap(), Some(Bytes::from_static(b"first")));
        let err = stream.recv().await.unwrap_err();

        assert_eq!(err.code(), Code::DeadlineExceeded);
        assert_eq!(transport.opens(), 1);
        assert!(matches!(stream.state(), StreamState::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_of_stream_closes() {
        let transport = Transport::new([Ok(Script::recvs([Ok(Some("only"))]))]);
        let mut stream = open(&transport, 1).await.unwrap();

        assert!(stream.recv().await.unwrap().is_some());
        assert_eq!(stream.recv().await.unwrap(), None);
        assert_eq!(stream.state(), &StreamState::Closed);
        assert_eq!(stream.recv().await.unwrap(), None);
        assert_eq!(
            stream.send(Bytes::from_static(b"late")).await.unwrap_err().code(),
            Code::FailedPrecondition
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_reconnect_backoff() {
        let transport = Transport::new([
            Ok(Script::send_fails_at(0, Status::unavailable("reset"))),
            Ok(Script::default()),
        ]);
        let request = StreamRequest::new("test.v1.Chat/Talk");
        let canceller = request.context.clone();
        let settings = CallOptions::new()
            .max_retries(3)
            .backoff(backoff_linear(Duration::from_secs(30)))
            .resolve()
            .unwrap();
        let mut stream = RetryingStream::open(transport.func(), request, settings, Arc::new(NoopTrace))
            .await
            .unwrap();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });
        let err = stream.send(Bytes::from_static(b"x")).await.unwrap_err();

        assert_eq!(err.code(), Code::Canceled);
        assert_eq!(transport.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interceptor_wraps_streams() {
        let transport = Transport::new([
            Ok(Script::send_fails_at(0, Status::unavailable("reset"))),
            Ok(Script::recvs([Ok(Some("done"))])),
        ]);
        let trace = Arc::new(RecordingTrace::default());
        let open_stream = RetryInterceptor::new(CallOptions::new().max_retries(2))
            .with_trace(trace.clone())
            .wrap_stream(transport.func());

        let mut stream = open_stream(StreamRequest::new("test.v1.Chat/Talk")).await.unwrap();
        stream.send(Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(stream.recv().await.unwrap(), Some(Bytes::from_static(b"done")));

        assert_eq!(trace.names(), vec!["retrying:0", "reconnected:1:0"]);
        assert_eq!(transport.received(1), vec!["hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_interceptor_returns_transport_stream() {
        let transport = Transport::new([Ok(Script::send_fails_at(0, Status::unavailable("reset")))]);
        let open_stream = RetryInterceptor::default().wrap_stream(transport.func());

        let mut stream = open_stream(StreamRequest::new("test.v1.Chat/Talk")).await.unwrap();
        let err = stream.send(Bytes::from_static(b"x")).await.unwrap_err();

        assert_eq!(err, Status::unavailable("reset"));
        assert_eq!(transport.opens(), 1);
    }
}
