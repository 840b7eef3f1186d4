//! Rill Runtime - process wiring for the rill HTTP toolkit.
//!
//! This crate owns everything the core deliberately excludes: reading
//! configuration, initializing logging, constructing the production
//! transport, and driving the router's serving loop until the process is
//! told to stop.
//!
//! ```rust,ignore
//! use futures::stream;
//! use rill_core::{ResponseMessage, Router, handler_fn};
//! use rill_runtime::RillRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = RillRuntime::new();
//!
//!     let router = Router::from(runtime.listener())
//!         .with("/status", handler_fn(|_| stream::iter([
//!             ResponseMessage::head_with_reason(200, "OK"),
//!         ])));
//!
//!     runtime.serve(router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigResult, LogFormat, LogLevel, LoggingConfig, RillConfig, ServerConfig,
    load_config, load_config_from,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::RillRuntime;

// Re-export tracing for use by downstream binaries.
pub use tracing;
pub use tracing_subscriber;

/// Prelude module providing the commonly used logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
