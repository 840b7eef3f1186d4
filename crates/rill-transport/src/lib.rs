//! # Rill Transport
//!
//! Network transport implementation for the rill HTTP toolkit.
//!
//! This crate provides the production implementation of the transport
//! capability defined in `rill-core`: a tokio TCP listener with minimal
//! HTTP/1 framing. "Minimal" is deliberate: the transport reads exactly
//! the request line (method and path), and writes exactly a status line
//! followed by raw body bytes. Header and body *parsing* belong to a
//! different kind of system.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  rill-core           │  (Listener / Router)
//! ├──────────────────────┤
//! │  ServerTransport     │  (capability traits)
//! ├──────────────────────┤
//! │  rill-transport      │  <- this crate
//! ├──────────────────────┤
//! │  TCP (tokio)         │
//! └──────────────────────┘
//! ```
//!
//! Internally the transport is connection-driven: an accept loop takes
//! connections off the socket and per-connection tasks read request heads
//! concurrently. The pull interface the core sees is a bounded queue those
//! tasks feed; ordering within the queue and backpressure both fall out of
//! the channel.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rill_core::{Listener, ListenerConfig};
//! use rill_transport::HttpTransport;
//!
//! let transport = Arc::new(HttpTransport::new());
//! let listener = Listener::new(transport, ListenerConfig::default());
//! ```

pub mod http;

pub use http::HttpTransport;
