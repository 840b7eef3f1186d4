//! Event vocabulary for the rill core.
//!
//! This module provides the types that flow through an event sequence:
//!
//! - [`ListenerEvent`] - the tagged union yielded by a [`Listener`](crate::Listener)
//! - [`RequestMessage`] - the addressable identity of an inbound request
//! - [`ResponseMessage`] - one item of a handler's output (head or body)
//! - [`Reply`] - the one-shot capability that drains a handler's output onto
//!   the wire
//!
//! The source of truth for discrimination is the enum variant itself; there
//! are no runtime shape checks anywhere in the system.

use std::net::SocketAddr;

use bytes::Bytes;
use futures::StreamExt;

use crate::error::TransportResult;
use crate::handler::RequestHandler;
use crate::transport::BoxedSink;

// =============================================================================
// Listener Events
// =============================================================================

/// An event produced by a listener's event sequence.
///
/// Exactly two kinds of event exist today. Consumers are expected to match
/// exhaustively; a router treats anything that is not a request as
/// consumed-and-dropped, which keeps room for future lifecycle variants.
#[derive(Debug)]
pub enum ListenerEvent {
    /// The listening socket became ready to accept connections.
    ///
    /// Emitted exactly once per listen cycle, before any request.
    Listening(ListeningEvent),

    /// An inbound request arrived.
    Request(RequestEvent),
}

impl ListenerEvent {
    /// Returns the human-readable name of this event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Listening(_) => "listening",
            Self::Request(_) => "request",
        }
    }

    /// Returns `true` if this is a request event.
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Returns the address of the listener that produced this event.
    pub fn source(&self) -> SocketAddr {
        match self {
            Self::Listening(ev) => ev.local_addr,
            Self::Request(ev) => ev.source(),
        }
    }
}

/// Lifecycle event: the socket is bound and listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListeningEvent {
    /// The address the listener actually bound (port 0 resolves here).
    pub local_addr: SocketAddr,
}

/// An inbound request, paired with its exclusive [`Reply`] capability.
///
/// The event owns the only handle to the underlying exchange. Replying
/// consumes the event, so a second reply for the same request does not
/// compile. Dropping the event without replying sends nothing; what the
/// peer observes then is the transport's default (the shipped transport
/// closes the connection).
pub struct RequestEvent {
    source: SocketAddr,
    message: RequestMessage,
    reply: Reply,
}

impl RequestEvent {
    /// Creates a request event from its parts.
    ///
    /// Listeners call this once per accepted exchange; scripted event
    /// sources in tests can do the same.
    pub fn new(source: SocketAddr, message: RequestMessage, reply: Reply) -> Self {
        Self {
            source,
            message,
            reply,
        }
    }

    /// Returns the address of the listener that produced this event.
    pub fn source(&self) -> SocketAddr {
        self.source
    }

    /// Returns the request's addressable identity.
    pub fn message(&self) -> &RequestMessage {
        &self.message
    }

    /// Returns the request method.
    pub fn method(&self) -> &str {
        &self.message.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.message.path
    }

    /// Replies to this request by draining `handler`'s output onto the wire.
    ///
    /// Consumes the event: the reply capability can be exercised at most
    /// once, by construction. See [`Reply::send`] for the streaming
    /// contract.
    pub async fn reply<H>(self, handler: &H) -> TransportResult<()>
    where
        H: RequestHandler + ?Sized,
    {
        self.reply.send(self.message, handler).await
    }
}

impl std::fmt::Debug for RequestEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEvent")
            .field("source", &self.source)
            .field("method", &self.message.method)
            .field("path", &self.message.path)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Request Message
// =============================================================================

/// The addressable identity of an inbound request.
///
/// This is the value route predicates see and the value a handler is bound
/// to. Deliberately minimal: headers and bodies are out of scope for this
/// layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    /// The request method, as received (e.g. `GET`).
    pub method: String,
    /// The request path, as received (e.g. `/status`).
    pub path: String,
}

impl RequestMessage {
    /// Creates a request message.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

impl std::fmt::Display for RequestMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

// =============================================================================
// Response Messages
// =============================================================================

/// One item of a handler's output sequence.
///
/// A well-formed sequence contains at most one [`Head`], and if present it
/// must come first. Items are forwarded to the transport in production
/// order, never buffered or reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMessage {
    /// Status metadata. At most one, first.
    Head(Head),
    /// A payload chunk. Zero or more, order-significant.
    Body(Body),
}

impl ResponseMessage {
    /// Creates a head message with the given status code.
    pub fn head(status: u16) -> Self {
        Self::Head(Head::new(status))
    }

    /// Creates a head message with a status code and reason phrase.
    pub fn head_with_reason(status: u16, reason: impl Into<String>) -> Self {
        Self::Head(Head::new(status).with_reason(reason))
    }

    /// Creates a body message from anything byte-like.
    pub fn body(body: impl Into<Body>) -> Self {
        Self::Body(body.into())
    }

    /// Returns `true` if this is a head message.
    pub fn is_head(&self) -> bool {
        matches!(self, Self::Head(_))
    }

    /// Returns `true` if this is a body message.
    pub fn is_body(&self) -> bool {
        matches!(self, Self::Body(_))
    }
}

impl From<Head> for ResponseMessage {
    fn from(head: Head) -> Self {
        Self::Head(head)
    }
}

impl From<Body> for ResponseMessage {
    fn from(body: Body) -> Self {
        Self::Body(body)
    }
}

/// Response status metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    /// The HTTP status code.
    pub status: u16,
    /// Optional reason phrase; transports fall back to the canonical one.
    pub reason: Option<String>,
}

impl Head {
    /// Creates a head with the given status code and no reason phrase.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    /// Sets the reason phrase.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the reason phrase, falling back to the canonical phrase for
    /// the status code.
    pub fn reason_or_canonical(&self) -> &str {
        self.reason
            .as_deref()
            .unwrap_or_else(|| canonical_reason(self.status))
    }
}

/// Returns the canonical reason phrase for common status codes.
///
/// Unknown codes map to an empty phrase, which is valid on the wire.
pub fn canonical_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// A response payload chunk.
///
/// Cheap to clone; construction from string and byte types is lossless.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body(Bytes);

impl Body {
    /// Returns the chunk as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the chunk, returning the underlying bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Returns the chunk length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

// =============================================================================
// Reply Capability
// =============================================================================

/// The one-shot capability bound to a specific request's underlying
/// connection.
///
/// A `Reply` owns the transport's response sink for exactly one exchange.
/// [`send`](Self::send) consumes it, so the response can be written and
/// terminated at most once across the system. There is no way to clone or
/// re-arm a reply.
pub struct Reply {
    sink: BoxedSink,
}

impl Reply {
    /// Creates a reply over the given response sink.
    pub fn new(sink: BoxedSink) -> Self {
        Self { sink }
    }

    /// Invokes `handler` bound to `request` and streams its output to the
    /// sink.
    ///
    /// Each produced item is forwarded immediately: a [`Head`] becomes the
    /// status line, a [`Body`] chunk is written and flushed as-is. After the
    /// output sequence is exhausted the response is terminated exactly once.
    /// A handler sequence that never ends leaves the response open; that is
    /// the caller's responsibility, not guarded here.
    ///
    /// Sink failures abort the drain and surface unchanged; the response is
    /// not terminated in that case (the connection is abandoned to the
    /// transport's default handling).
    pub async fn send<H>(mut self, request: RequestMessage, handler: &H) -> TransportResult<()>
    where
        H: RequestHandler + ?Sized,
    {
        let mut output = handler.handle(request);
        while let Some(message) = output.next().await {
            match message {
                ResponseMessage::Head(head) => self.sink.write_head(&head).await?,
                ResponseMessage::Body(body) => self.sink.write_body(body.into_bytes()).await?,
            }
        }
        self.sink.end().await
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply").finish_non_exhaustive()
    }
}
