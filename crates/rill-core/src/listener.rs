//! Pull-based event sequence over a listening socket.
//!
//! [`Listener`] adapts a transport's listening socket into a
//! [`Stream`](futures::Stream) of [`ListenerEvent`]s. The stream has two
//! phases:
//!
//! 1. **Bind phase**: the first poll issues the transport's bind call; when
//!    the socket is listening, exactly one
//!    [`Listening`](ListenerEvent::Listening) event is yielded. This phase
//!    is never re-entered.
//! 2. **Serve phase**: every subsequent poll suspends on the transport's
//!    next inbound exchange; each exchange yields one
//!    [`Request`](ListenerEvent::Request) event carrying a fresh one-shot
//!    [`Reply`] bound to that exchange's connection.
//!
//! Nothing is buffered here: the consumer's poll *is* the suspension point,
//! so a slow consumer backpressures straight into the transport. Transport
//! errors are yielded unchanged as `Err` items and end the sequence; the
//! Listener has no retry policy of its own.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::TransportResult;
use crate::event::{ListenerEvent, ListeningEvent, Reply, RequestEvent};
use crate::transport::{IncomingExchange, ServerTransport, SharedTransport};

/// Fallback port when neither configuration nor environment provides one.
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable consulted when no port is configured.
pub const PORT_ENV_VAR: &str = "port";

/// Listener construction options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListenerConfig {
    /// Port to listen on. When absent, the `port` environment variable is
    /// consulted, then [`DEFAULT_PORT`].
    #[serde(default)]
    pub port: Option<u16>,
}

impl ListenerConfig {
    /// Creates an empty configuration (environment/default port).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Resolves the effective port: explicit configuration, else the `port`
    /// environment variable parsed as an integer, else [`DEFAULT_PORT`].
    pub fn resolve_port(&self) -> u16 {
        self.port
            .or_else(|| {
                std::env::var(PORT_ENV_VAR)
                    .ok()
                    .and_then(|raw| raw.parse().ok())
            })
            .unwrap_or(DEFAULT_PORT)
    }
}

enum ListenerState {
    /// Not yet bound; the next poll starts the bind call.
    Unbound,
    /// Bind in flight.
    Binding(BoxFuture<'static, TransportResult<SocketAddr>>),
    /// Bound and between requests; the next poll starts an accept.
    Ready(SocketAddr),
    /// Accept in flight.
    Accepting(SocketAddr, BoxFuture<'static, TransportResult<Option<IncomingExchange>>>),
    /// Terminal: transport closed or failed.
    Closed,
}

impl ListenerState {
    fn name(&self) -> &'static str {
        match self {
            Self::Unbound => "unbound",
            Self::Binding(_) => "binding",
            Self::Ready(_) => "ready",
            Self::Accepting(..) => "accepting",
            Self::Closed => "closed",
        }
    }
}

/// A lazy, unbounded sequence of listening-socket events.
///
/// Construction performs no I/O; the socket is bound when the sequence is
/// first polled. The transport handle is injectable, which is how test
/// doubles are substituted:
///
/// ```rust,ignore
/// use rill_core::{Listener, ListenerConfig};
///
/// let listener = Listener::new(transport, ListenerConfig::new().with_port(8080));
/// ```
pub struct Listener {
    transport: SharedTransport,
    port: u16,
    local_addr: Option<SocketAddr>,
    state: ListenerState,
}

impl Listener {
    /// Creates a listener over the given transport handle.
    pub fn new(transport: SharedTransport, config: ListenerConfig) -> Self {
        Self {
            transport,
            port: config.resolve_port(),
            local_addr: None,
            state: ListenerState::Unbound,
        }
    }

    /// Returns the port this listener will bind (or has bound).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the bound address, once the bind phase has completed.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("port", &self.port)
            .field("local_addr", &self.local_addr)
            .field("state", &self.state.name())
            .finish()
    }
}

impl Stream for Listener {
    type Item = TransportResult<ListenerEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match &mut this.state {
                ListenerState::Unbound => {
                    let transport = Arc::clone(&this.transport);
                    let port = this.port;
                    trace!(port, "starting bind");
                    this.state =
                        ListenerState::Binding(Box::pin(async move { transport.bind(port).await }));
                }

                ListenerState::Binding(bind) => match bind.as_mut().poll(cx) {
                    Poll::Ready(Ok(addr)) => {
                        debug!(%addr, "socket listening");
                        this.local_addr = Some(addr);
                        this.state = ListenerState::Ready(addr);
                        return Poll::Ready(Some(Ok(ListenerEvent::Listening(ListeningEvent {
                            local_addr: addr,
                        }))));
                    }
                    Poll::Ready(Err(err)) => {
                        this.state = ListenerState::Closed;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Pending => return Poll::Pending,
                },

                ListenerState::Ready(addr) => {
                    let addr = *addr;
                    let transport = Arc::clone(&this.transport);
                    this.state = ListenerState::Accepting(
                        addr,
                        Box::pin(async move { transport.accept().await }),
                    );
                }

                ListenerState::Accepting(addr, accept) => {
                    let addr = *addr;
                    match accept.as_mut().poll(cx) {
                        Poll::Ready(Ok(Some(exchange))) => {
                            trace!(method = %exchange.method, path = %exchange.path, "request accepted");
                            let (message, sink) = exchange.into_parts();
                            this.state = ListenerState::Ready(addr);
                            return Poll::Ready(Some(Ok(ListenerEvent::Request(
                                RequestEvent::new(addr, message, Reply::new(sink)),
                            ))));
                        }
                        Poll::Ready(Ok(None)) => {
                            debug!(%addr, "transport closed, ending event sequence");
                            this.state = ListenerState::Closed;
                            return Poll::Ready(None);
                        }
                        Poll::Ready(Err(err)) => {
                            this.state = ListenerState::Closed;
                            return Poll::Ready(Some(Err(err)));
                        }
                        Poll::Pending => return Poll::Pending,
                    }
                }

                ListenerState::Closed => return Poll::Ready(None),
            }
        }
    }
}
