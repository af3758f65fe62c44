//! Event types for the recordings index
//!
//! Provides refresh progress events and the EventBus that carries them to
//! whoever drives the UI (progress bar, "refreshing" spinner).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Index event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IndexEvent {
    /// A refresh pass started
    RefreshStarted {
        /// Number of audio files found in the directory listing
        total: usize,
        /// When the pass started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One more audio file was processed by the running refresh pass
    RefreshProgress {
        /// Files processed so far (1-based)
        processed: usize,
        /// Total files in this pass
        total: usize,
        /// processed / total, in (0, 1]
        fraction: f64,
    },

    /// A refresh pass finished and its result was persisted
    RefreshCompleted {
        /// Recordings built from scratch in this pass
        added: usize,
        /// Recordings dropped because their audio file disappeared
        removed: usize,
        /// Recordings in the index after the pass
        total: usize,
        /// When the pass finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A refresh pass aborted; nothing was committed
    RefreshFailed {
        /// Human-readable failure reason
        message: String,
    },
}

impl IndexEvent {
    /// Build a progress event, computing the fraction
    pub fn progress(processed: usize, total: usize) -> Self {
        let fraction = if total == 0 {
            1.0
        } else {
            processed as f64 / total as f64
        };
        IndexEvent::RefreshProgress {
            processed,
            total,
            fraction,
        }
    }
}

/// Broadcast channel for index events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IndexEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IndexEvent,
    ) -> Result<usize, broadcast::error::SendError<IndexEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress events are fire-and-forget: a refresh pass never fails
    /// because nobody is watching it.
    pub fn emit_lossy(&self, event: IndexEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        match IndexEvent::progress(1, 4) {
            IndexEvent::RefreshProgress { fraction, .. } => assert!((fraction - 0.25).abs() < 1e-9),
            other => panic!("unexpected event {:?}", other),
        }
        match IndexEvent::progress(0, 0) {
            IndexEvent::RefreshProgress { fraction, .. } => assert_eq!(fraction, 1.0),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(IndexEvent::progress(1, 1)).is_err());
        // lossy variant never fails
        bus.emit_lossy(IndexEvent::progress(1, 1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(IndexEvent::progress(2, 3));
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            IndexEvent::RefreshProgress {
                processed: 2,
                total: 3,
                fraction: 2.0 / 3.0
            }
        );
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(IndexEvent::RefreshFailed {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "RefreshFailed");
        assert_eq!(json["message"], "boom");
    }
}
