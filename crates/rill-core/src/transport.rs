//! Transport capability traits.
//!
//! The core never touches sockets. It consumes a listening-socket capability
//! through [`ServerTransport`] and writes responses through [`ResponseSink`];
//! `rill-transport` provides the production implementation, and tests inject
//! scripted doubles.
//!
//! The interface is deliberately narrow: bind once, pull exchanges one at a
//! time, and for each exchange a sink supporting exactly the three response
//! operations the system needs (status line, raw bytes, terminate).

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportResult;
use crate::event::{Head, RequestMessage};

/// A listening-socket capability.
///
/// Implementations may accept and queue connections however they like
/// (including concurrently); the contract here is purely sequential:
/// [`accept`](Self::accept) yields inbound exchanges one at a time, in
/// arrival order.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    /// Binds the listening socket on `port`.
    ///
    /// Resolves with the actual bound address once the socket is listening
    /// (port 0 requests an ephemeral port). Called exactly once per listen
    /// cycle.
    async fn bind(&self, port: u16) -> TransportResult<SocketAddr>;

    /// Waits for the next inbound request.
    ///
    /// Returns `Ok(None)` when the transport has closed and no further
    /// exchanges will arrive; a production transport does not do this while
    /// the process is serving, but scripted transports and shutdown paths
    /// do. Errors are fatal to the listen cycle.
    async fn accept(&self) -> TransportResult<Option<IncomingExchange>>;
}

/// A shared handle to a server transport.
pub type SharedTransport = Arc<dyn ServerTransport>;

/// One inbound request/response pair as delivered by a transport.
pub struct IncomingExchange {
    /// The request method, as received.
    pub method: String,
    /// The request path, as received.
    pub path: String,
    /// The response sink bound to this exchange's connection.
    pub sink: BoxedSink,
}

impl IncomingExchange {
    /// Creates an exchange from its parts.
    pub fn new(method: impl Into<String>, path: impl Into<String>, sink: BoxedSink) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            sink,
        }
    }

    /// Splits the exchange into the request identity and the sink.
    pub fn into_parts(self) -> (RequestMessage, BoxedSink) {
        (RequestMessage::new(self.method, self.path), self.sink)
    }
}

impl std::fmt::Debug for IncomingExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingExchange")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// The write side of one response.
///
/// Owned exclusively by one [`Reply`](crate::Reply). Items are written in
/// call order with no buffering; `end` terminates the response and must be
/// called at most once.
#[async_trait]
pub trait ResponseSink: Send {
    /// Writes the status line.
    async fn write_head(&mut self, head: &Head) -> TransportResult<()>;

    /// Writes and flushes one body chunk.
    async fn write_body(&mut self, chunk: Bytes) -> TransportResult<()>;

    /// Terminates the response.
    async fn end(&mut self) -> TransportResult<()>;
}

/// A boxed response sink, as carried by a [`Reply`](crate::Reply).
pub type BoxedSink = Box<dyn ResponseSink>;
