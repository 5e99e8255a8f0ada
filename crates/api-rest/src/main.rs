//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development when only the HTTP surface is wanted. The workspace's main
//! `sticky-run` binary serves the same router and also loads a `.env` file.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use sticky_core::CoreConfig;

/// Main entry point for the sticky uploads REST API server
///
/// # Environment Variables
/// - `STICKY_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `STICKY_UPLOADS_*`: store and form configuration, see [`CoreConfig::from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("STICKY_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = CoreConfig::from_env()?;

    api_rest::serve(&addr, AppState::new(cfg)).await
}
