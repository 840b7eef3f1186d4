//! Status Endpoint Demo
//!
//! The canonical rill wiring: one listener, two routes, one serving loop.
//!
//! - `GET /status` answers `200 OK` with a small JSON body, streamed as
//!   separate chunks.
//! - Everything else, whatever the method, falls through to the wildcard
//!   and gets a `404 Not Found` with no body.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package status-demo
//! # or with an explicit port:
//! port=3000 cargo run --package status-demo
//! ```

use anyhow::Result;
use futures::stream;
use serde_json::json;
use tracing::debug;

use rill::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = RillRuntime::new();

    let router = Router::from(runtime.listener())
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
            handler_fn(|req: RequestMessage| {
                debug!(path = %req.path, "unmatched path");
                stream::iter([ResponseMessage::head_with_reason(404, "Not Found")])
            }),
        );

    runtime.serve(router).await?;
    Ok(())
}
