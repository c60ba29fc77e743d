//! Execution Context: per-run identity, observer and cancellation
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::data_model::ProgressEvent;
use crate::observer::{NoopObserver, ProgressObserver};

#[derive(Clone)]
pub struct ExecutionContext {
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            observer: Arc::new(NoopObserver),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Best-effort: dropped once the run is cancelled.
    pub fn emit(&self, event: ProgressEvent) {
        if self.cancel.is_cancelled() {
            tracing::debug!(trace_id = %self.trace_id, step = event.step.as_str(), "run cancelled, dropping event");
            return;
        }
        self.observer.on_event(&event);
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.observer.on_log(message.as_ref());
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("trace_id", &self.trace_id)
            .field("started_at", &self.started_at)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
