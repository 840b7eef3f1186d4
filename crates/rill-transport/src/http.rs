//! Tokio TCP transport with minimal HTTP/1 framing.
//!
//! [`HttpTransport`] implements the [`ServerTransport`] capability:
//!
//! - **Accept side**: one accept loop owns the TCP listener; each accepted
//!   connection gets a task that reads the request line (`METHOD SP TARGET
//!   SP VERSION`) and nothing more, then hands the exchange (request
//!   identity plus a sink owning the socket) to a bounded queue the core
//!   pulls from. Connections with a malformed request line are logged and
//!   closed without ever reaching the core.
//! - **Response side**: [`write_head`](rill_core::ResponseSink::write_head)
//!   emits the status line, body chunks are written and flushed as-is, and
//!   `end` shuts the connection down. Every response closes its connection;
//!   keep-alive is out of scope.
//!
//! A response written body-first gets an implicit `200 OK` status line, and
//! so does a response that is terminated without any output, so a bare `end`
//! still puts a valid response on the wire.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use rill_core::{
    Head, IncomingExchange, ResponseSink, ServerTransport, TransportError, TransportResult,
};

/// Queue capacity between the accept side and the consuming event loop.
///
/// A full queue backpressures per-connection tasks, which in turn stops the
/// accept loop from racing ahead of dispatch.
const REQUEST_BACKLOG: usize = 64;

/// Upper bound on buffered request-head bytes per connection.
const MAX_REQUEST_LINE_BYTES: usize = 8 * 1024;

/// State established by a successful bind.
struct BoundState {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
}

/// TCP implementation of the [`ServerTransport`] capability.
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use rill_transport::HttpTransport;
///
/// let transport = Arc::new(HttpTransport::new());
/// let addr = transport.bind(8080).await?;
/// ```
pub struct HttpTransport {
    host: IpAddr,
    backlog: usize,
    bound: Mutex<Option<BoundState>>,
    incoming: AsyncMutex<Option<mpsc::Receiver<TransportResult<IncomingExchange>>>>,
}

impl HttpTransport {
    /// Creates a transport listening on all interfaces.
    pub fn new() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            backlog: REQUEST_BACKLOG,
            bound: Mutex::new(None),
            incoming: AsyncMutex::new(None),
        }
    }

    /// Sets the interface address to bind.
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Sets the request queue capacity.
    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.backlog = backlog;
        self
    }

    /// Returns the bound address, if the transport is listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.lock().as_ref().map(|state| state.local_addr)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("host", &self.host)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        if let Some(state) = self.bound.lock().take() {
            state.shutdown.cancel();
        }
    }
}

#[async_trait]
impl ServerTransport for HttpTransport {
    async fn bind(&self, port: u16) -> TransportResult<SocketAddr> {
        if self.bound.lock().is_some() {
            return Err(TransportError::BindFailed {
                port,
                reason: "transport already bound".into(),
            });
        }

        let listener = TcpListener::bind(SocketAddr::new(self.host, port))
            .await
            .map_err(|err| TransportError::BindFailed {
                port,
                reason: err.to_string(),
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| TransportError::BindFailed {
                port,
                reason: err.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(self.backlog);
        let shutdown = CancellationToken::new();
        tokio::spawn(accept_loop(listener, tx, shutdown.clone()));

        *self.incoming.lock().await = Some(rx);
        *self.bound.lock() = Some(BoundState {
            local_addr,
            shutdown,
        });

        debug!(%local_addr, "transport listening");
        Ok(local_addr)
    }

    async fn accept(&self) -> TransportResult<Option<IncomingExchange>> {
        let mut guard = self.incoming.lock().await;
        let rx = guard
            .as_mut()
            .ok_or_else(|| TransportError::Accept("transport is not bound".into()))?;

        match rx.recv().await {
            Some(Ok(exchange)) => Ok(Some(exchange)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }
}

/// Owns the TCP listener; runs until shutdown or a socket-level failure.
async fn accept_loop(
    listener: TcpListener,
    tx: mpsc::Sender<TransportResult<IncomingExchange>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("accept loop shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!(%peer, "connection accepted");
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        match read_exchange(stream, peer).await {
                            Ok(exchange) => {
                                // Blocks when the queue is full: backpressure
                                // from the dispatch loop reaches here.
                                let _ = tx.send(Ok(exchange)).await;
                            }
                            Err(err) => {
                                warn!(%peer, error = %err, "discarding connection");
                            }
                        }
                    });
                }
                Err(err) => {
                    let _ = tx
                        .send(Err(TransportError::Accept(err.to_string())))
                        .await;
                    break;
                }
            },
        }
    }
}

/// Reads the request line off a fresh connection and packages the exchange.
///
/// Anything after the first CRLF (headers, body) is left unread; this layer
/// never interprets it.
async fn read_exchange(mut stream: TcpStream, peer: SocketAddr) -> TransportResult<IncomingExchange> {
    let mut buf = BytesMut::with_capacity(1024);

    let line_end = loop {
        if let Some(pos) = buf.windows(2).position(|window| window == b"\r\n") {
            break pos;
        }
        if buf.len() > MAX_REQUEST_LINE_BYTES {
            return Err(TransportError::Io("request line too large".into()));
        }
        let read = stream.read_buf(&mut buf).await?;
        if read == 0 {
            return Err(TransportError::ConnectionClosed(format!(
                "{peer} closed before sending a request line"
            )));
        }
    };

    let line = std::str::from_utf8(&buf[..line_end])
        .map_err(|_| TransportError::Io("request line is not valid UTF-8".into()))?;
    let (method, path) = parse_request_line(line)?;

    debug!(%peer, %method, %path, "request line read");
    Ok(IncomingExchange::new(
        method,
        path,
        Box::new(TcpResponseSink::new(stream)),
    ))
}

/// Parses `METHOD SP TARGET [SP VERSION]` from a request line.
fn parse_request_line(line: &str) -> TransportResult<(String, String)> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => Ok((method.to_string(), target.to_string())),
        _ => Err(TransportError::Io(format!(
            "malformed request line: {line:?}"
        ))),
    }
}

/// Response sink owning one connection's socket.
struct TcpResponseSink {
    stream: TcpStream,
    head_sent: bool,
    ended: bool,
}

impl TcpResponseSink {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            head_sent: false,
            ended: false,
        }
    }

    async fn write_status_line(&mut self, head: &Head) -> TransportResult<()> {
        let line = format!(
            "HTTP/1.1 {} {}\r\nconnection: close\r\n\r\n",
            head.status,
            head.reason_or_canonical()
        );
        self.stream.write_all(line.as_bytes()).await?;
        self.head_sent = true;
        Ok(())
    }
}

#[async_trait]
impl ResponseSink for TcpResponseSink {
    async fn write_head(&mut self, head: &Head) -> TransportResult<()> {
        if self.ended {
            return Err(TransportError::AlreadyEnded);
        }
        if self.head_sent {
            return Err(TransportError::HeadAlreadySent);
        }
        self.write_status_line(head).await
    }

    async fn write_body(&mut self, chunk: Bytes) -> TransportResult<()> {
        if self.ended {
            return Err(TransportError::AlreadyEnded);
        }
        if !self.head_sent {
            self.write_status_line(&Head::new(200)).await?;
        }
        self.stream.write_all(&chunk).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn end(&mut self) -> TransportResult<()> {
        if self.ended {
            return Err(TransportError::AlreadyEnded);
        }
        if !self.head_sent {
            self.write_status_line(&Head::new(200)).await?;
        }
        self.ended = true;
        self.stream.flush().await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}
