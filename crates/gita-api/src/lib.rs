//! Gita API: REST and SSE endpoints over the research pipeline
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod sse;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};

pub use config::{AppConfig, ConfigError};
pub use error::ApiError;
pub use state::{AppState, StateError};

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/research", post(handlers::research))
        .route("/api/research/stream", post(handlers::research_stream))
        .route("/api/verses", get(handlers::list_verses))
        .route("/api/verses/{verse_id}", get(handlers::get_verse))
        .route("/api/stats", get(handlers::stats))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::cors())
        .layer(middleware::trace())
}

/// Serves until ctrl-c.
pub async fn run(addr: &str, state: AppState) -> std::io::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Gita API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, stopping server");
}
