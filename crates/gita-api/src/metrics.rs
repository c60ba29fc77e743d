//! Prometheus counters for research runs and progress events.
use gita_core::{ProgressEvent, ProgressObserver};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    runs: IntCounterVec,
    progress_events: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let runs = IntCounterVec::new(
            Opts::new("gita_research_runs_total", "Research runs by mode and outcome"),
            &["mode", "outcome"],
        )?;
        let progress_events = IntCounterVec::new(
            Opts::new("gita_progress_events_total", "Progress events emitted by step"),
            &["step"],
        )?;
        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(progress_events.clone()))?;

        Ok(Self {
            registry,
            runs,
            progress_events,
        })
    }

    /// `mode` is `blocking` or `stream`; `outcome` is the terminal step name.
    pub fn record_run(&self, mode: &str, outcome: &str) {
        self.runs.with_label_values(&[mode, outcome]).inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

impl ProgressObserver for Metrics {
    fn on_event(&self, event: &ProgressEvent) {
        self.progress_events
            .with_label_values(&[event.step.as_str()])
            .inc();
    }
}
