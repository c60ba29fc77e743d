//! Progress observers: injected sinks for run progress and log lines.
//!
//! Stages never know where their progress goes. The API composes a
//! [`FanoutObserver`] out of tracing, metrics and the progress bus; the
//! blocking endpoint leaves the bus out.
use std::sync::Arc;

use crate::data_model::ProgressEvent;

pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, _event: &ProgressEvent) {}

    fn on_log(&self, _message: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Forwards progress to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        tracing::debug!(step = event.step.as_str(), "{}", event.message);
    }

    fn on_log(&self, message: &str) {
        tracing::info!("Agent: {}", message);
    }
}

#[derive(Default, Clone)]
pub struct FanoutObserver {
    sinks: Vec<Arc<dyn ProgressObserver>>,
}

impl FanoutObserver {
    pub fn new(sinks: Vec<Arc<dyn ProgressObserver>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn ProgressObserver>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ProgressObserver for FanoutObserver {
    fn on_event(&self, event: &ProgressEvent) {
        for sink in &self.sinks {
            sink.on_event(event);
        }
    }

    fn on_log(&self, message: &str) {
        for sink in &self.sinks {
            sink.on_log(message);
        }
    }
}
