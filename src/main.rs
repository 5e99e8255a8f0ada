use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use sticky_core::CoreConfig;

/// Main entry point for the sticky uploads application
///
/// Loads `.env`, resolves configuration once and serves the REST API and demo form.
///
/// # Environment Variables
/// - `STICKY_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `STICKY_UPLOADS_DIR`: staging root (default: `<temp dir>/.sticky_files`)
/// - `STICKY_UPLOADS_STICKINESS`: seconds a staged file is kept (default: 3600)
/// - `STICKY_UPLOADS_MAX_FILES_PER_USER`: per-user file ceiling (default: 10)
/// - `STICKY_UPLOADS_MAX_STICKY_FILES`: global file ceiling (default: 1000)
/// - `STICKY_UPLOADS_TOKEN_FIELD`: anti-forgery field name (default: "csrf_token")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sticky_files=info".parse()?)
                .add_directive("sticky_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("STICKY_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = CoreConfig::from_env()?;

    tracing::info!(
        dir = %cfg.store().dir().display(),
        stickiness_secs = cfg.store().stickiness().as_secs(),
        token_field = cfg.token_field(),
        "++ Starting sticky uploads"
    );

    api_rest::serve(&rest_addr, AppState::new(cfg)).await
}
