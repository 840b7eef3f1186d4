//! # Rill Core
//!
//! The core engine of the rill HTTP toolkit.
//!
//! Rill exposes an HTTP server's lifecycle and incoming requests as a single
//! **pull-based asynchronous event sequence**, and layers an **immutable,
//! chainable router** on top that dispatches each request to the first
//! handler whose predicate matches, streaming the handler's output back as a
//! response.
//!
//! ## Architecture Layers
//!
//! This crate is organized around three concerns:
//!
//! - **Event vocabulary**: true tagged unions for everything that flows
//!   through the system ([`ListenerEvent`], [`ResponseMessage`]) plus the
//!   one-shot [`Reply`] capability bound to each request.
//! - **Listener**: adapts a transport's listening socket into a pull-based
//!   [`Stream`](futures::Stream) of events ([`Listener`]).
//! - **Router**: declarative first-match dispatch over any compatible event
//!   source ([`Router`]).
//!
//! The underlying TCP/HTTP transport is consumed through the narrow
//! [`ServerTransport`] / [`ResponseSink`] traits; a production
//! implementation lives in `rill-transport`, and test doubles can be
//! injected anywhere an `Arc<dyn ServerTransport>` is accepted.
//!
//! ## Control Flow
//!
//! ```text
//! ┌───────────┐      ┌──────────┐      ┌─────────┐      ┌──────────┐
//! │ Transport │─────▶│ Listener │─────▶│ Router  │─────▶│ Handler  │
//! │ (socket)  │      │ (stream) │      │ (match) │      │ (stream) │
//! └───────────┘      └──────────┘      └─────────┘      └────┬─────┘
//!       ▲                                                    │
//!       └──────────────────── reply ─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use rill_core::{Listener, ListenerConfig, ResponseMessage, Router, handler_fn};
//! use futures::stream;
//!
//! let listener = Listener::new(transport, ListenerConfig::default());
//!
//! Router::from(listener)
//!     .with("/status", handler_fn(|_| stream::iter([
//!         ResponseMessage::head_with_reason(200, "OK"),
//!         ResponseMessage::body("{\"status\":\"OK\"}"),
//!         ResponseMessage::body("\n"),
//!     ])))
//!     .with("*", handler_fn(|_| stream::iter([
//!         ResponseMessage::head_with_reason(404, "Not Found"),
//!     ])))
//!     .pipe()
//!     .await?;
//! ```

pub mod error;
pub mod event;
pub mod handler;
pub mod listener;
pub mod route;
pub mod router;
pub mod transport;

pub use error::{TransportError, TransportResult};
pub use event::{
    Body, Head, ListenerEvent, ListeningEvent, Reply, RequestEvent, RequestMessage,
    ResponseMessage,
};
pub use handler::{BoxedHandler, HandlerFn, RequestHandler, ResponseStream, handler_fn};
pub use listener::{DEFAULT_PORT, Listener, ListenerConfig, PORT_ENV_VAR};
pub use route::{RequestPredicate, RouteFilter};
pub use router::{Dispatch, Router};
pub use transport::{BoxedSink, IncomingExchange, ResponseSink, ServerTransport, SharedTransport};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::{TransportError, TransportResult};
    pub use super::event::{
        Body, Head, ListenerEvent, ListeningEvent, RequestEvent, RequestMessage, ResponseMessage,
    };
    pub use super::handler::{RequestHandler, handler_fn};
    pub use super::listener::{Listener, ListenerConfig};
    pub use super::router::{Dispatch, Router};
}
