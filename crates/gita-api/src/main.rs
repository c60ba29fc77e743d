//! Binary entrypoint for the Gita API server.
use std::sync::Arc;

use anyhow::Context;
use gita_api::{run, AppConfig, AppState};
use gita_corpus::JsonVerseStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("loading configuration")?;

    let catalog = match JsonVerseStore::load(&config.corpus.path) {
        Ok(store) => store,
        Err(err) => {
            tracing::warn!(error = %err, "verse corpus unavailable, starting with an empty catalog");
            JsonVerseStore::default()
        }
    };
    if config.llm.api_key.is_none() {
        tracing::warn!(provider = %config.llm.provider, "no API key configured, research requests will fail");
    }

    let catalog = Arc::new(catalog);
    let state = tokio::task::spawn_blocking({
        let config = config.clone();
        move || AppState::from_config(&config, catalog)
    })
    .await
    .context("building application state")?
    .context("building application state")?;
    run(&config.server.addr, state)
        .await
        .with_context(|| format!("serving on {}", config.server.addr))
}
