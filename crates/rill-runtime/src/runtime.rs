//! Serve-loop orchestration.
//!
//! [`RillRuntime`] wires the pieces the core keeps apart: it loads
//! configuration, initializes logging, builds the production transport and
//! listener, and drives [`Router::pipe_until`] with a cancellation token
//! connected to the process's shutdown signals.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rill_runtime::RillRuntime;
//!
//! // Auto-loads `rill.toml` / `RILL_*` environment variables.
//! let runtime = RillRuntime::new();
//!
//! let router = Router::from(runtime.listener())
//!     .with("/status", status_handler);
//!
//! // Runs until Ctrl+C / SIGTERM.
//! runtime.serve(router).await?;
//! ```

use std::sync::Arc;

use futures::Stream;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use rill_core::{Listener, ListenerConfig, ListenerEvent, Router, SharedTransport, TransportResult};
use rill_transport::HttpTransport;

use crate::config::{self, RillConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// Process-level wiring for a rill server.
#[derive(Debug, Clone)]
pub struct RillRuntime {
    config: RillConfig,
}

impl RillRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Looks for `rill.toml` in the working directory and applies `RILL_*`
    /// environment overrides; falls back to defaults if loading fails.
    pub fn new() -> Self {
        let config = config::load_config().unwrap_or_else(|err| {
            eprintln!("warning: failed to load config ({err}), using defaults");
            RillConfig::default()
        });
        Self::from_config(&config)
    }

    /// Creates a runtime from an explicit configuration.
    ///
    /// Initializes logging as a side effect (first caller wins).
    pub fn from_config(config: &RillConfig) -> Self {
        logging::init_from_config(&config.logging);
        info!(
            log_level = %config.logging.level,
            host = %config.server.host,
            "runtime initialized"
        );
        Self {
            config: config.clone(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &RillConfig {
        &self.config
    }

    /// Builds a listener over the production TCP transport.
    pub fn listener(&self) -> Listener {
        let transport = Arc::new(HttpTransport::new().with_host(self.config.server.host));
        self.listener_with_transport(transport)
    }

    /// Builds a listener over an injected transport handle.
    ///
    /// This is the seam test doubles go through; the configured port still
    /// applies.
    pub fn listener_with_transport(&self, transport: SharedTransport) -> Listener {
        let config = ListenerConfig {
            port: self.config.server.port,
        };
        Listener::new(transport, config)
    }

    /// Drives the router's serving loop until the upstream ends, fails, or
    /// the process receives a shutdown signal.
    pub async fn serve<S>(&self, router: Router<S>) -> RuntimeResult<()>
    where
        S: Stream<Item = TransportResult<ListenerEvent>> + Send + Unpin,
    {
        let shutdown = CancellationToken::new();
        tokio::spawn(cancel_on_signal(shutdown.clone()));

        info!("serving, press Ctrl+C to stop");
        let result = router.pipe_until(shutdown).await;
        info!("serving loop finished");
        result.map_err(Into::into)
    }
}

impl Default for RillRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels `token` when the process receives Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("received Ctrl+C, shutting down");
    }

    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_serve_returns_when_the_source_is_exhausted() {
        let runtime = RillRuntime::from_config(&RillConfig::default());
        let router = Router::from(stream::iter(Vec::new()));
        runtime.serve(router).await.unwrap();
    }

    #[test]
    fn test_listener_uses_the_configured_port() {
        let mut config = RillConfig::default();
        config.server.port = Some(9944);
        let runtime = RillRuntime::from_config(&config);

        let listener = runtime.listener();
        assert_eq!(listener.port(), 9944);
    }
}
