//! Progress Bus: unbounded FIFO between the background run and the stream.
//!
//! One writer per run (the run's observer chain), one reader (the stream
//! controller). Pushing never blocks and never fails the run: once the run
//! is cancelled or the reader is gone, events are counted as dropped.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::data_model::ProgressEvent;
use crate::observer::ProgressObserver;

#[derive(Debug, Default)]
pub struct BusStats {
    pushed: AtomicU64,
    dropped: AtomicU64,
}

impl BusStats {
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Creates the writer/reader pair for one run.
pub fn progress_bus(cancel: CancellationToken) -> (ProgressBus, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stats = Arc::new(BusStats::default());
    (
        ProgressBus {
            tx,
            cancel,
            stats: stats.clone(),
        },
        ProgressReceiver { rx, stats },
    )
}

#[derive(Debug, Clone)]
pub struct ProgressBus {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    cancel: CancellationToken,
    stats: Arc<BusStats>,
}

impl ProgressBus {
    /// Returns whether the event was queued.
    pub fn push(&self, event: ProgressEvent) -> bool {
        if self.cancel.is_cancelled() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(step = event.step.as_str(), "bus cancelled, dropping progress event");
            return false;
        }

        match self.tx.send(event) {
            Ok(()) => {
                self.stats.pushed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::SendError(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(step = event.step.as_str(), "progress reader gone, dropping event");
                false
            }
        }
    }

    pub fn stats(&self) -> Arc<BusStats> {
        self.stats.clone()
    }
}

impl ProgressObserver for ProgressBus {
    fn on_event(&self, event: &ProgressEvent) {
        self.push(event.clone());
    }
}

#[derive(Debug, PartialEq)]
pub enum Polled {
    Event(ProgressEvent),
    /// Nothing arrived within the poll timeout.
    Empty,
    /// Every writer is gone and the queue is drained.
    Closed,
}

#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
    stats: Arc<BusStats>,
}

impl ProgressReceiver {
    pub async fn poll(&mut self, timeout: Duration) -> Polled {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => Polled::Event(event),
            Ok(None) => Polled::Closed,
            Err(_) => Polled::Empty,
        }
    }

    /// Non-waiting poll, used to drain events that raced a completion check.
    pub fn try_poll(&mut self) -> Polled {
        match self.rx.try_recv() {
            Ok(event) => Polled::Event(event),
            Err(mpsc::error::TryRecvError::Empty) => Polled::Empty,
            Err(mpsc::error::TryRecvError::Disconnected) => Polled::Closed,
        }
    }

    pub fn stats(&self) -> Arc<BusStats> {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::ProgressStep;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (bus, mut rx) = progress_bus(CancellationToken::new());
        bus.push(ProgressEvent::new(ProgressStep::Analyzing, "one"));
        bus.push(ProgressEvent::new(ProgressStep::Researching, "two"));

        let first = rx.poll(Duration::from_millis(50)).await;
        let second = rx.poll(Duration::from_millis(50)).await;

        assert_eq!(first, Polled::Event(ProgressEvent::new(ProgressStep::Analyzing, "one")));
        assert_eq!(second, Polled::Event(ProgressEvent::new(ProgressStep::Researching, "two")));
        assert_eq!(rx.poll(Duration::from_millis(10)).await, Polled::Empty);
        assert_eq!(bus.stats().pushed(), 2);
    }

    #[tokio::test]
    async fn test_closed_after_writer_dropped() {
        let (bus, mut rx) = progress_bus(CancellationToken::new());
        bus.push(ProgressEvent::new(ProgressStep::Analyzing, "last"));
        drop(bus);

        assert!(matches!(rx.poll(Duration::from_millis(50)).await, Polled::Event(_)));
        assert_eq!(rx.poll(Duration::from_millis(50)).await, Polled::Closed);
    }

    #[test]
    fn test_push_after_cancel_is_dropped() {
        let cancel = CancellationToken::new();
        let (bus, mut rx) = progress_bus(cancel.clone());
        cancel.cancel();

        assert!(!bus.push(ProgressEvent::new(ProgressStep::Analyzing, "late")));
        assert_eq!(bus.stats().pushed(), 0);
        assert_eq!(bus.stats().dropped(), 1);
        assert_eq!(rx.try_poll(), Polled::Empty);
    }

    #[test]
    fn test_push_without_reader_does_not_fail_the_writer() {
        let (bus, rx) = progress_bus(CancellationToken::new());
        drop(rx);

        assert!(!bus.push(ProgressEvent::new(ProgressStep::Analyzing, "nobody")));
        assert_eq!(bus.stats().dropped(), 1);
    }
}
