//! Stream Controller: turns a background run plus its progress bus into a
//! stream of wire events.
//!
//! The stream always starts with a `connected` acknowledgement and always
//! ends with exactly one terminal event. Idle polls become heartbeats.
//! Dropping the stream before the terminal event cancels the run.
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::{progress_bus, Polled, ProgressReceiver};
use crate::context::ExecutionContext;
use crate::data_model::{ProgressEvent, Query};
use crate::error::ResearchError;
use crate::observer::{FanoutObserver, ProgressObserver};
use crate::runner::{PipelineRunner, RunOutcome};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const SERIALIZE_FALLBACK: &str =
    r#"{"step":"error","message":"Error serializing progress data","details":{}}"#;

#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    Data(ProgressEvent),
    Heartbeat,
}

impl WireEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Data(event) if event.is_terminal())
    }

    /// JSON payload of a data event, `None` for heartbeats.
    pub fn to_json(&self) -> Option<String> {
        match self {
            Self::Heartbeat => None,
            Self::Data(event) => Some(serde_json::to_string(event).unwrap_or_else(|err| {
                tracing::error!(error = %err, "failed to serialize progress event");
                SERIALIZE_FALLBACK.to_string()
            })),
        }
    }
}

type RunHandle = JoinHandle<Result<RunOutcome, ResearchError>>;

pub struct StreamController {
    receiver: ProgressReceiver,
    run: RunHandle,
    cancel: CancellationToken,
    poll_interval: Duration,
}

impl StreamController {
    pub fn new(receiver: ProgressReceiver, run: RunHandle, cancel: CancellationToken) -> Self {
        Self {
            receiver,
            run,
            cancel,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn into_stream(self) -> impl Stream<Item = WireEvent> + Send + 'static {
        let Self {
            mut receiver,
            mut run,
            cancel,
            poll_interval,
        } = self;
        // Owned by the generator from the start, so dropping an unpolled
        // stream still cancels the run.
        let guard = CancelOnDrop::new(cancel);

        async_stream::stream! {
            let mut guard = guard;
            yield WireEvent::Data(ProgressEvent::connected());

            loop {
                let event = match receiver.poll(poll_interval).await {
                    Polled::Event(event) => event,
                    Polled::Empty if !run.is_finished() => {
                        yield WireEvent::Heartbeat;
                        continue;
                    }
                    Polled::Empty | Polled::Closed => match receiver.try_poll() {
                        Polled::Event(event) => event,
                        _ => settle(&mut run).await,
                    },
                };

                let terminal = event.is_terminal();
                yield WireEvent::Data(event);
                if terminal {
                    break;
                }
            }

            guard.disarm();
        }
    }
}

/// Terminal event for a run that stopped without queuing one.
async fn settle(run: &mut RunHandle) -> ProgressEvent {
    match run.await {
        Ok(Ok(_)) => ProgressEvent::error("Research completed unexpectedly"),
        Ok(Err(err)) => ProgressEvent::error(err.to_string()),
        Err(err) => ProgressEvent::error(format!("research task failed: {}", err)),
    }
}

struct CancelOnDrop {
    cancel: CancellationToken,
    armed: bool,
}

impl CancelOnDrop {
    fn new(cancel: CancellationToken) -> Self {
        Self { cancel, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed && !self.cancel.is_cancelled() {
            tracing::info!("client disconnected, cancelling research run");
            self.cancel.cancel();
        }
    }
}

/// Starts `runner.run_streaming` on a blocking worker and returns the
/// controller that drains its progress.
pub fn spawn_streaming_run(
    runner: Arc<PipelineRunner>,
    query: Query,
    observer: Arc<dyn ProgressObserver>,
) -> StreamController {
    let cancel = CancellationToken::new();
    let (bus, receiver) = progress_bus(cancel.clone());
    let sink = FanoutObserver::new(vec![observer, Arc::new(bus)]);
    let ctx = ExecutionContext::new()
        .with_observer(Arc::new(sink))
        .with_cancellation(cancel.clone());

    tracing::info!(trace_id = %ctx.trace_id, "spawning streaming research run");
    let run = tokio::task::spawn_blocking(move || runner.run_streaming(&query, &ctx));

    StreamController::new(receiver, run, cancel)
}
