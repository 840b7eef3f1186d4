//! Request handler trait and adapters.
//!
//! A handler is bound to one [`RequestMessage`] and produces a lazy, finite,
//! single-use sequence of [`ResponseMessage`]s. Handlers are not restartable:
//! each invocation produces one output stream, consumed exactly once by the
//! request's [`Reply`](crate::Reply).
//!
//! Most callers never implement [`RequestHandler`] directly; [`handler_fn`]
//! lifts any closure returning a response stream into the trait:
//!
//! ```rust,ignore
//! use futures::stream;
//! use rill_core::{ResponseMessage, handler_fn};
//!
//! let status = handler_fn(|_req| stream::iter([
//!     ResponseMessage::head_with_reason(200, "OK"),
//!     ResponseMessage::body("{\"status\":\"OK\"}"),
//! ]));
//! ```

use std::sync::Arc;

use futures::Stream;
use futures::stream::BoxStream;

use crate::event::{RequestMessage, ResponseMessage};

/// A handler's output sequence.
///
/// Lazy and finite; items are pulled one at a time by the reply capability
/// and written to the wire as produced.
pub type ResponseStream = BoxStream<'static, ResponseMessage>;

/// Produces a response sequence for one request.
pub trait RequestHandler: Send + Sync {
    /// Invokes the handler bound to `request`.
    fn handle(&self, request: RequestMessage) -> ResponseStream;
}

/// A type-erased, shareable handler, as stored in route tables.
pub type BoxedHandler = Arc<dyn RequestHandler>;

/// A closure adapter implementing [`RequestHandler`].
///
/// Created by [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

impl<F, S> RequestHandler for HandlerFn<F>
where
    F: Fn(RequestMessage) -> S + Send + Sync,
    S: Stream<Item = ResponseMessage> + Send + 'static,
{
    fn handle(&self, request: RequestMessage) -> ResponseStream {
        Box::pin((self.f)(request))
    }
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// Lifts a closure into a [`RequestHandler`].
///
/// The closure receives the request identity and returns any stream of
/// [`ResponseMessage`]s.
pub fn handler_fn<F, S>(f: F) -> HandlerFn<F>
where
    F: Fn(RequestMessage) -> S + Send + Sync,
    S: Stream<Item = ResponseMessage> + Send + 'static,
{
    HandlerFn { f }
}

impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    fn handle(&self, request: RequestMessage) -> ResponseStream {
        (**self).handle(request)
    }
}
