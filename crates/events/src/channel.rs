//! Progress channel between a pipeline run and its observer

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::types::{EventEnvelope, ProgressEvent};

/// What a consumer gets from a timed read
#[derive(Debug, Clone)]
pub enum ProgressItem {
    Event(EventEnvelope),
    /// Nothing arrived within the timeout
    Heartbeat,
}

/// Unbounded ordered queue from the active pipeline run to one consumer.
///
/// Each run obtains a [`ProgressPublisher`] through [`ProgressChannel::begin_run`],
/// which drains whatever the previous run left unread. Envelopes carry their
/// run id, so late events from a superseded run are discarded on read.
pub struct ProgressChannel {
    sender: mpsc::UnboundedSender<EventEnvelope>,
    receiver: Mutex<mpsc::UnboundedReceiver<EventEnvelope>>,
    active_run: RwLock<Option<Uuid>>,
    /// Number of events published across all runs (for monitoring)
    event_count: Arc<AtomicUsize>,
}

impl ProgressChannel {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            active_run: RwLock::new(None),
            event_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start a new run: drop queued events and hand out a publisher bound to a
    /// fresh run id.
    ///
    /// Waits for an in-flight [`recv_timeout`](Self::recv_timeout) to return,
    /// which is bounded by that call's timeout.
    pub async fn begin_run(&self) -> ProgressPublisher {
        let run_id = Uuid::new_v4();

        let mut receiver = self.receiver.lock().await;
        *self
            .active_run
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(run_id);

        let mut drained = 0usize;
        while receiver.try_recv().is_ok() {
            drained += 1;
        }
        drop(receiver);

        debug!(run_id = %run_id, drained, "Progress channel reset for new run");

        ProgressPublisher {
            run_id,
            sender: self.sender.clone(),
            sequence: Arc::new(AtomicU64::new(0)),
            event_count: Arc::clone(&self.event_count),
        }
    }

    /// Wait up to `timeout` for the next event of the active run.
    pub async fn recv_timeout(&self, timeout: Duration) -> ProgressItem {
        let deadline = Instant::now() + timeout;
        let mut receiver = self.receiver.lock().await;

        loop {
            match tokio::time::timeout_at(deadline, receiver.recv()).await {
                Ok(Some(envelope)) => {
                    if self.active_run() == Some(envelope.run_id) {
                        return ProgressItem::Event(envelope);
                    }
                    debug!(run_id = %envelope.run_id, "Discarding event from superseded run");
                }
                // The channel keeps its own sender, so `None` only happens on teardown
                Ok(None) | Err(_) => return ProgressItem::Heartbeat,
            }
        }
    }

    /// Run id of the most recently started run
    pub fn active_run(&self) -> Option<Uuid> {
        *self
            .active_run
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the total number of events published
    pub fn event_count(&self) -> usize {
        self.event_count.load(Ordering::Relaxed)
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressChannel")
            .field("active_run", &self.active_run())
            .field("event_count", &self.event_count())
            .finish()
    }
}

/// Producer half handed to one pipeline run
#[derive(Clone)]
pub struct ProgressPublisher {
    run_id: Uuid,
    sender: mpsc::UnboundedSender<EventEnvelope>,
    sequence: Arc<AtomicU64>,
    event_count: Arc<AtomicUsize>,
}

impl ProgressPublisher {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Publish an event with the next sequence number.
    ///
    /// Returns `false` if the channel is gone.
    pub fn publish(&self, event: ProgressEvent) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.event_count.fetch_add(1, Ordering::Relaxed);
        self.sender
            .send(EventEnvelope::new(self.run_id, sequence, event))
            .is_ok()
    }

    /// Number of events this publisher has emitted
    pub fn published(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ProgressPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressPublisher")
            .field("run_id", &self.run_id)
            .field("published", &self.published())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    async fn next_event(channel: &ProgressChannel) -> EventEnvelope {
        match channel.recv_timeout(Duration::from_secs(1)).await {
            ProgressItem::Event(envelope) => envelope,
            ProgressItem::Heartbeat => panic!("expected an event, got heartbeat"),
        }
    }

    #[tokio::test]
    async fn test_publish_receive_in_order() {
        let channel = ProgressChannel::new();
        let publisher = channel.begin_run().await;

        assert!(publisher.publish(ProgressEvent::start(2)));
        assert!(publisher.publish(ProgressEvent::final_analysis_start()));
        assert!(publisher.publish(ProgressEvent::complete()));

        let first = next_event(&channel).await;
        let second = next_event(&channel).await;
        let third = next_event(&channel).await;

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(third.sequence, 2);
        assert_eq!(first.event.event_type(), "start");
        assert_eq!(third.event.event_type(), "complete");
        assert_eq!(first.run_id, publisher.run_id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_on_timeout() {
        let channel = ProgressChannel::new();
        let _publisher = channel.begin_run().await;

        let item = channel.recv_timeout(Duration::from_secs(1)).await;
        assert!(matches!(item, ProgressItem::Heartbeat));
    }

    #[tokio::test]
    async fn test_begin_run_drains_stale_events() {
        let channel = ProgressChannel::new();
        let old = channel.begin_run().await;
        old.publish(ProgressEvent::start(5));
        old.publish(ProgressEvent::final_analysis_start());

        let new = channel.begin_run().await;
        new.publish(ProgressEvent::start(1));

        let envelope = next_event(&channel).await;
        assert_eq!(envelope.run_id, new.run_id());
        assert_eq!(envelope.event, ProgressEvent::start(1));
        assert!(matches!(
            channel.recv_timeout(SHORT).await,
            ProgressItem::Heartbeat
        ));
    }

    #[tokio::test]
    async fn test_late_events_from_superseded_run_are_discarded() {
        let channel = ProgressChannel::new();
        let old = channel.begin_run().await;
        let new = channel.begin_run().await;

        old.publish(ProgressEvent::error("late"));
        new.publish(ProgressEvent::complete());

        let envelope = next_event(&channel).await;
        assert_eq!(envelope.run_id, new.run_id());
        assert!(envelope.event.is_terminal());
    }

    #[tokio::test]
    async fn test_active_run_tracks_latest() {
        let channel = ProgressChannel::new();
        assert!(channel.active_run().is_none());

        let publisher = channel.begin_run().await;
        assert_eq!(channel.active_run(), Some(publisher.run_id()));
    }

    #[tokio::test]
    async fn test_event_count() {
        let channel = ProgressChannel::new();
        assert_eq!(channel.event_count(), 0);

        let publisher = channel.begin_run().await;
        publisher.publish(ProgressEvent::start(0));
        publisher.publish(ProgressEvent::complete());

        assert_eq!(channel.event_count(), 2);
        assert_eq!(publisher.published(), 2);
    }

    #[tokio::test]
    async fn test_publisher_clone_shares_sequence() {
        let channel = ProgressChannel::new();
        let publisher = channel.begin_run().await;
        let clone = publisher.clone();

        publisher.publish(ProgressEvent::start(1));
        clone.publish(ProgressEvent::complete());

        assert_eq!(next_event(&channel).await.sequence, 0);
        assert_eq!(next_event(&channel).await.sequence, 1);
    }

    #[tokio::test]
    async fn test_producer_on_other_task() {
        let channel = Arc::new(ProgressChannel::new());
        let publisher = channel.begin_run().await;

        let producer = tokio::spawn(async move {
            for total in 0..10 {
                publisher.publish(ProgressEvent::start(total));
            }
        });
        producer.await.unwrap();

        for expected in 0..10u64 {
            assert_eq!(next_event(&channel).await.sequence, expected);
        }
    }
}
