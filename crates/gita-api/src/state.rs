//! Shared application state handed to every handler.
use std::sync::Arc;
use std::time::Duration;

use gita_core::stream::DEFAULT_POLL_INTERVAL;
use gita_core::{CollaboratorError, FanoutObserver, PipelineRunner, ProgressObserver, TracingObserver};
use gita_corpus::{research_services, JsonVerseStore};
use gita_stages::research_stages;
use thiserror::Error;

use crate::config::AppConfig;
use crate::metrics::Metrics;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("METRICS/{0}")]
    Metrics(#[from] prometheus::Error),

    #[error("{0}")]
    Generator(#[from] CollaboratorError),
}

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<PipelineRunner>,
    pub catalog: Arc<JsonVerseStore>,
    pub metrics: Arc<Metrics>,
    pub poll_interval: Duration,
}

impl AppState {
    pub fn new(runner: PipelineRunner, catalog: Arc<JsonVerseStore>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            runner: Arc::new(runner),
            catalog,
            metrics: Arc::new(Metrics::new()?),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Production wiring: lexical search and the chat-completions generator
    /// over `catalog`. The generator owns a blocking HTTP client, so call
    /// this off the async runtime.
    pub fn from_config(config: &AppConfig, catalog: Arc<JsonVerseStore>) -> Result<Self, StateError> {
        let services = research_services(catalog.clone(), config.generator_config())?;
        let runner = PipelineRunner::new(research_stages(&services, config.corpus.search_limit));
        Ok(Self::new(runner, catalog)?.with_poll_interval(config.poll_interval()))
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Progress sinks shared by both research modes.
    pub fn observer(&self) -> Arc<dyn ProgressObserver> {
        let tracing: Arc<dyn ProgressObserver> = Arc::new(TracingObserver);
        Arc::new(FanoutObserver::new(vec![tracing, self.metrics.clone()]))
    }
}
