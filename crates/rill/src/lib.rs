//! # Rill
//!
//! Pull-based HTTP event sequences with immutable chainable routing.
//!
//! Rill turns a listening socket into a single asynchronous stream of
//! lifecycle and request events, and routes each request to the first
//! handler whose predicate matches, streaming the handler's output straight
//! back onto the wire.
//!
//! ## Overview
//!
//! - **Listener** ([`rill_core::Listener`]): a lazy, unbounded event
//!   sequence over an injectable transport.
//! - **Router** ([`rill_core::Router`]): an immutable dispatch table built
//!   by chaining `.with(filter, handler)` calls; old routers stay valid.
//! - **Runtime** ([`rill_runtime::RillRuntime`]): config, logging, and a
//!   signal-integrated serving loop.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::stream;
//! use rill::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = RillRuntime::new();
//!
//!     let router = Router::from(runtime.listener())
//!         .with("/status", handler_fn(|_| stream::iter([
//!             ResponseMessage::head_with_reason(200, "OK"),
//!             ResponseMessage::body("{\"status\":\"OK\"}"),
//!             ResponseMessage::body("\n"),
//!         ])))
//!         .with("*", handler_fn(|_| stream::iter([
//!             ResponseMessage::head_with_reason(404, "Not Found"),
//!         ])));
//!
//!     runtime.serve(router).await?;
//!     Ok(())
//! }
//! ```

pub use rill_core as core;
pub use rill_runtime as runtime;
pub use rill_transport as transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use rill_core::prelude::*;

    pub use rill_core::{RequestPredicate, RouteFilter, SharedTransport};
    pub use rill_runtime::RillRuntime;
    pub use rill_transport::HttpTransport;
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;

    use futures::stream;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use rill_core::{
        Listener, ListenerConfig, ResponseMessage, Router, SharedTransport, handler_fn,
    };
    use rill_transport::HttpTransport;

    /// Polls until the transport has bound (the bind happens lazily, on the
    /// serving task's first pull).
    async fn wait_for_bind(transport: &HttpTransport) -> SocketAddr {
        for _ in 0..200 {
            if let Some(addr) = transport.local_addr() {
                return addr;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("transport never bound");
    }

    async fn roundtrip(addr: SocketAddr, request: &str) -> String {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        String::from_utf8(response).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_status_routing() {
        let transport = Arc::new(HttpTransport::new().with_host(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        let handle: SharedTransport = transport.clone();
        let listener = Listener::new(handle, ListenerConfig::new().with_port(0));

        let router = Router::from(listener)
            .with(
                "/status",
                handler_fn(|_| {
                    stream::iter([
                        ResponseMessage::head_with_reason(200, "OK"),
                        ResponseMessage::body(json!({ "status": "OK" }).to_string()),
                        ResponseMessage::body("\n"),
                    ])
                }),
            )
            .with(
                "*",
                handler_fn(|_| stream::iter([ResponseMessage::head_with_reason(404, "Not Found")])),
            );

        let server = tokio::spawn(router.pipe());
        let addr = wait_for_bind(&transport).await;

        // Matching route: full streamed body, in order.
        let response = roundtrip(addr, "GET /status HTTP/1.1\r\nhost: test\r\n\r\n").await;
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nconnection: close\r\n\r\n{\"status\":\"OK\"}\n"
        );

        // Unmatched GET falls through to the wildcard.
        let response = roundtrip(addr, "GET /missing HTTP/1.1\r\nhost: test\r\n\r\n").await;
        assert_eq!(response, "HTTP/1.1 404 Not Found\r\nconnection: close\r\n\r\n");

        // Method mismatch on the path shorthand also falls through.
        let response = roundtrip(addr, "POST /status HTTP/1.1\r\nhost: test\r\n\r\n").await;
        assert_eq!(response, "HTTP/1.1 404 Not Found\r\nconnection: close\r\n\r\n");

        server.abort();
    }

    #[tokio::test]
    async fn test_requests_without_a_matching_route_get_no_response() {
        let transport = Arc::new(HttpTransport::new().with_host(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        let handle: SharedTransport = transport.clone();
        let listener = Listener::new(handle, ListenerConfig::new().with_port(0));

        // A single non-wildcard route: everything else is dropped.
        let router = Router::from(listener).with(
            "/only",
            handler_fn(|_| stream::iter([ResponseMessage::head(200)])),
        );

        let server = tokio::spawn(router.pipe());
        let addr = wait_for_bind(&transport).await;

        let response = roundtrip(addr, "GET /elsewhere HTTP/1.1\r\n\r\n").await;
        assert!(response.is_empty());

        // The loop is still alive afterwards.
        let response = roundtrip(addr, "GET /only HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));

        server.abort();
    }
}
