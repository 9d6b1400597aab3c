//! Binary entrypoint for the Slate API server.
use slate_api::{run, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // SLATE_ADDR, ANCHOR_SET_VERSION, MODEL_REVISION and SLATE_PROFILE
    let config = ServerConfig::from_env()?;
    run(config).await
}
