//! First-match request routing over an event sequence.
//!
//! A [`Router`] consumes a [`Listener`](crate::Listener)'s (or any
//! compatible source's) event sequence, holds an ordered set of
//! (predicate, handler) pairs, and for each request event invokes the first
//! handler whose predicate matches, streaming its output back through the
//! event's reply capability.
//!
//! # Immutable Chaining
//!
//! [`with`](Router::with) never mutates: it returns a new router sharing the
//! same upstream source with the route appended at lowest priority. Earlier
//! router values remain valid and dispatch with their original tables only.
//!
//! ```rust,ignore
//! Router::from(listener)
//!     .with("/status", status_handler)
//!     .with("*", not_found_handler)
//!     .pipe()
//!     .await?;
//! ```
//!
//! # Dispatch Rules
//!
//! 1. Predicates are evaluated in insertion order; the first match wins.
//! 2. A request matching nothing is silently dropped: no response is sent
//!    and the connection is left to the transport's default handling.
//! 3. Events that are not requests are consumed with no effect beyond a log
//!    line.
//! 4. Each event is fully replied to (or dropped) before the next is pulled;
//!    dispatch is serialized by this loop regardless of how the transport
//!    queues connections.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::error::TransportResult;
use crate::event::{ListenerEvent, RequestMessage};
use crate::handler::{BoxedHandler, RequestHandler};
use crate::route::{RequestPredicate, RouteFilter};

/// One (predicate, handler) pair in a route table.
#[derive(Clone)]
struct Route {
    predicate: RequestPredicate,
    handler: BoxedHandler,
}

impl Route {
    fn matches(&self, message: &RequestMessage) -> bool {
        self.predicate.as_ref()(message)
    }
}

/// The outcome of dispatching one upstream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A route matched and its handler's output was streamed back.
    Handled,
    /// No predicate matched; the request was dropped without a response.
    Dropped,
    /// The event was not a request; consumed with no effect.
    Ignored,
    /// A route matched but the reply failed at the sink; the error was
    /// logged and the connection abandoned.
    Failed,
}

/// An immutable, chainable dispatch table over an upstream event sequence.
///
/// Routers are cheap to clone and extend: the route table is copied on each
/// [`with`](Self::with) (entries themselves are shared), and all routers
/// built from the same [`from`](Self::from) call share one upstream source.
pub struct Router<S> {
    source: Arc<Mutex<S>>,
    routes: Vec<Route>,
}

impl<S> Clone for Router<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            routes: self.routes.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("route_count", &self.routes.len())
            .finish_non_exhaustive()
    }
}

impl<S> Router<S> {
    /// Creates a router with no routes over the given upstream sequence.
    pub fn from(source: S) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            routes: Vec::new(),
        }
    }

    /// Returns a new router with `(filter, handler)` appended after all
    /// existing routes (lowest priority).
    ///
    /// `filter` is either a predicate closure over
    /// [`&RequestMessage`](crate::RequestMessage), or a path string
    /// shorthand: `"*"` matches every request, any other string matches GET
    /// requests whose path equals it exactly. This router is unaffected.
    pub fn with<F, H>(&self, filter: F, handler: H) -> Self
    where
        F: RouteFilter,
        H: RequestHandler + 'static,
    {
        let mut routes = self.routes.clone();
        routes.push(Route {
            predicate: filter.into_predicate(),
            handler: Arc::new(handler),
        });
        Self {
            source: Arc::clone(&self.source),
            routes,
        }
    }

    /// Returns the number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Dispatches a single event against this router's table.
    ///
    /// Request events are matched in insertion order and replied to through
    /// the first matching handler; everything else is consumed with no
    /// effect. Sink failures during the reply surface as the error.
    pub async fn dispatch(&self, event: ListenerEvent) -> TransportResult<Dispatch> {
        match event {
            ListenerEvent::Listening(ev) => {
                info!(addr = %ev.local_addr, "listener ready");
                Ok(Dispatch::Ignored)
            }
            ListenerEvent::Request(request) => {
                let matched = self
                    .routes
                    .iter()
                    .find(|route| route.matches(request.message()));

                match matched {
                    Some(route) => {
                        debug!(
                            method = %request.method(),
                            path = %request.path(),
                            "route matched, replying"
                        );
                        request.reply(&route.handler).await?;
                        Ok(Dispatch::Handled)
                    }
                    None => {
                        debug!(
                            method = %request.method(),
                            path = %request.path(),
                            "no route matched, dropping request"
                        );
                        Ok(Dispatch::Dropped)
                    }
                }
            }
        }
    }
}

impl<S> Router<S>
where
    S: Stream<Item = TransportResult<ListenerEvent>> + Send + Unpin,
{
    /// Returns the router's own produced sequence: one [`Dispatch`] outcome
    /// per upstream event.
    ///
    /// Upstream transport errors terminate the sequence with `Err`; reply
    /// failures are logged, yielded as [`Dispatch::Failed`] and the
    /// sequence continues (one broken connection cannot halt the server).
    pub fn into_stream(self) -> impl Stream<Item = TransportResult<Dispatch>> + Send {
        futures::stream::try_unfold(self, |router| async move {
            let next = {
                let mut source = router.source.lock().await;
                source.next().await
            };

            match next {
                None => Ok(None),
                Some(Err(err)) => Err(err),
                Some(Ok(event)) => {
                    let outcome = match router.dispatch(event).await {
                        Ok(outcome) => outcome,
                        Err(err) => {
                            error!(error = %err, "reply failed, abandoning connection");
                            Dispatch::Failed
                        }
                    };
                    Ok(Some((outcome, router)))
                }
            }
        })
    }

    /// Drives the router's sequence to completion, discarding outcomes.
    ///
    /// This is the terminal operation that runs the server. It returns only
    /// when the upstream sequence ends (`Ok`) or fails (`Err`); over a live
    /// transport that means it does not return under normal operation.
    pub async fn pipe(self) -> TransportResult<()> {
        let stream = self.into_stream();
        futures::pin_mut!(stream);
        while let Some(outcome) = stream.next().await {
            let outcome = outcome?;
            trace!(?outcome, "event consumed");
        }
        Ok(())
    }

    /// Like [`pipe`](Self::pipe), but also completes (with `Ok`) when
    /// `shutdown` is cancelled.
    ///
    /// The serving loop has no natural end, so process shutdown is
    /// integrated through an explicit cancellation signal rather than by
    /// waiting for the sequence to finish.
    pub async fn pipe_until(self, shutdown: CancellationToken) -> TransportResult<()> {
        tokio::select! {
            result = self.pipe() => result,
            () = shutdown.cancelled() => {
                info!("shutdown requested, stopping dispatch loop");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::event::{
        Head, ListeningEvent, Reply, RequestEvent, RequestMessage, ResponseMessage,
    };
    use crate::handler::handler_fn;
    use crate::transport::ResponseSink;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct NullSink;

    #[async_trait]
    impl ResponseSink for NullSink {
        async fn write_head(&mut self, _head: &Head) -> TransportResult<()> {
            Ok(())
        }

        async fn write_body(&mut self, _chunk: Bytes) -> TransportResult<()> {
            Ok(())
        }

        async fn end(&mut self) -> TransportResult<()> {
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl ResponseSink for FailingSink {
        async fn write_head(&mut self, _head: &Head) -> TransportResult<()> {
            Err(TransportError::ConnectionClosed("peer went away".into()))
        }

        async fn write_body(&mut self, _chunk: Bytes) -> TransportResult<()> {
            Err(TransportError::ConnectionClosed("peer went away".into()))
        }

        async fn end(&mut self) -> TransportResult<()> {
            Err(TransportError::ConnectionClosed("peer went away".into()))
        }
    }

    fn request(method: &str, path: &str) -> ListenerEvent {
        request_with_sink(method, path, Box::new(NullSink))
    }

    fn request_with_sink(
        method: &str,
        path: &str,
        sink: Box<dyn ResponseSink>,
    ) -> ListenerEvent {
        ListenerEvent::Request(RequestEvent::new(
            "127.0.0.1:8080".parse().unwrap(),
            RequestMessage::new(method, path),
            Reply::new(sink),
        ))
    }

    /// Handler that counts invocations and replies with a bare 200.
    fn counting_handler(counter: Arc<AtomicUsize>) -> impl RequestHandler {
        handler_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            stream::iter([ResponseMessage::head(200)])
        })
    }

    fn empty_source() -> impl Stream<Item = TransportResult<ListenerEvent>> + Send + Unpin {
        stream::iter(Vec::new())
    }

    #[tokio::test]
    async fn test_first_matching_route_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let router = Router::from(empty_source())
            .with("/status", counting_handler(Arc::clone(&first)))
            .with("/status", counting_handler(Arc::clone(&second)));

        let outcome = router.dispatch(request("GET", "/status")).await.unwrap();

        assert_eq!(outcome, Dispatch::Handled);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wildcard_catches_unmatched_get_requests() {
        let status = Arc::new(AtomicUsize::new(0));
        let fallback = Arc::new(AtomicUsize::new(0));

        let router = Router::from(empty_source())
            .with("/status", counting_handler(Arc::clone(&status)))
            .with("*", counting_handler(Arc::clone(&fallback)));

        router.dispatch(request("GET", "/missing")).await.unwrap();
        router.dispatch(request("GET", "/also-missing")).await.unwrap();

        assert_eq!(status.load(Ordering::SeqCst), 0);
        assert_eq!(fallback.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_path_shorthand_rejects_non_get_methods() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::from(empty_source()).with("/status", counting_handler(Arc::clone(&hits)));

        let outcome = router.dispatch(request("POST", "/status")).await.unwrap();

        assert_eq!(outcome, Dispatch::Dropped);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_predicate_routes_can_match_any_method() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::from(empty_source()).with(
            |req: &RequestMessage| req.method == "POST" && req.path == "/submit",
            counting_handler(Arc::clone(&hits)),
        );

        let outcome = router.dispatch(request("POST", "/submit")).await.unwrap();

        assert_eq!(outcome, Dispatch::Handled);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unmatched_requests_are_dropped_silently() {
        let router = Router::from(empty_source());
        let outcome = router.dispatch(request("GET", "/anything")).await.unwrap();
        assert_eq!(outcome, Dispatch::Dropped);
    }

    #[tokio::test]
    async fn test_lifecycle_events_are_ignored() {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::from(empty_source()).with("*", counting_handler(Arc::clone(&hits)));

        let event = ListenerEvent::Listening(ListeningEvent {
            local_addr: "127.0.0.1:8080".parse().unwrap(),
        });
        let outcome = router.dispatch(event).await.unwrap();

        assert_eq!(outcome, Dispatch::Ignored);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_with_does_not_affect_the_original_router() {
        let hits = Arc::new(AtomicUsize::new(0));

        let bare = Router::from(empty_source()).with("/a", counting_handler(Arc::clone(&hits)));
        let extended = bare.with("/b", counting_handler(Arc::clone(&hits)));

        assert_eq!(bare.route_count(), 1);
        assert_eq!(extended.route_count(), 2);

        // The original still dispatches with its original table only.
        let outcome = bare.dispatch(request("GET", "/b")).await.unwrap();
        assert_eq!(outcome, Dispatch::Dropped);

        let outcome = extended.dispatch(request("GET", "/b")).await.unwrap();
        assert_eq!(outcome, Dispatch::Handled);
    }

    #[tokio::test]
    async fn test_pipe_consumes_the_whole_source() {
        let hits = Arc::new(AtomicUsize::new(0));

        let source = stream::iter(vec![
            Ok(request("GET", "/a")),
            Ok(request("GET", "/b")),
            Ok(request("POST", "/a")),
        ]);
        let router = Router::from(source).with("/a", counting_handler(Arc::clone(&hits)));

        router.pipe().await.unwrap();

        // Only `GET /a` matches; the other events are consumed and dropped.
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pipe_propagates_upstream_errors() {
        let hits = Arc::new(AtomicUsize::new(0));

        let source = stream::iter(vec![
            Ok(request("GET", "/a")),
            Err(TransportError::Accept("socket torn down".into())),
            Ok(request("GET", "/b")),
        ]);
        let router = Router::from(source).with("*", counting_handler(Arc::clone(&hits)));

        let result = router.pipe().await;

        assert!(matches!(result, Err(TransportError::Accept(_))));
        // The event before the failure was still dispatched.
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reply_failures_do_not_stop_the_loop() {
        let hits = Arc::new(AtomicUsize::new(0));

        let source = stream::iter(vec![
            Ok(request_with_sink("GET", "/a", Box::new(FailingSink))),
            Ok(request("GET", "/b")),
        ]);
        let router = Router::from(source).with("*", counting_handler(Arc::clone(&hits)));

        router.pipe().await.unwrap();

        // Both events reached their handler despite the first sink failing.
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_into_stream_reports_outcomes_in_order() {
        let hits = Arc::new(AtomicUsize::new(0));

        let source = stream::iter(vec![
            Ok(ListenerEvent::Listening(ListeningEvent {
                local_addr: "127.0.0.1:8080".parse().unwrap(),
            })),
            Ok(request("GET", "/a")),
            Ok(request("PUT", "/a")),
            Ok(request_with_sink("GET", "/a", Box::new(FailingSink))),
        ]);
        let router = Router::from(source).with("/a", counting_handler(Arc::clone(&hits)));

        let outcomes: Vec<_> = router
            .into_stream()
            .map(Result::unwrap)
            .collect::<Vec<_>>()
            .await;

        assert_eq!(
            outcomes,
            vec![
                Dispatch::Ignored,
                Dispatch::Handled,
                Dispatch::Dropped,
                Dispatch::Failed,
            ]
        );
    }

    #[tokio::test]
    async fn test_pipe_until_stops_on_cancellation() {
        let router: Router<_> = Router::from(stream::pending());
        let token = CancellationToken::new();

        let handle = tokio::spawn(router.pipe_until(token.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("pipe_until did not stop after cancellation")
            .unwrap();
        assert!(result.is_ok());
    }
}
