//! Slate API: run registry and REST endpoints
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod store;

pub use config::ServerConfig;
pub use metrics::StageMetrics;
pub use store::{CreateRun, RunStore, StoreError};

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use slate_stages::FixtureSource;

pub fn create_app(store: Arc<RunStore>) -> Router {
    Router::new()
        .route("/runs", post(handlers::create_run))
        .route("/runs/{id}", get(handlers::get_run))
        .route("/runs/{id}/stages", get(handlers::list_stages))
        .route("/runs/{id}/resume", post(handlers::resume_run))
        .route("/runs/{id}/artifacts", get(handlers::list_artifacts))
        .route("/runs/{id}/ssr", get(handlers::get_ssr))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::trace())
        .layer(middleware::cors())
        .with_state(store)
}

/// Store backed by the built-in fixture content
pub fn default_store(config: ServerConfig) -> anyhow::Result<Arc<RunStore>> {
    let metrics = StageMetrics::new()?;
    Ok(Arc::new(RunStore::new(
        config,
        Arc::new(FixtureSource::default()),
        metrics,
    )))
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.addr.clone();
    let app = create_app(default_store(config)?);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Slate API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
