//! Event bus and refresh triggers
//!
//! Triggers flow into the scheduler; engine events flow out to observers
//! over a `tokio::broadcast` channel.

use crate::models::UsageSnapshot;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Why a reconciliation pass was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshTrigger {
    /// Engine start
    Startup,
    /// Explicit refresh call
    Manual,
    /// Safety-net interval tick
    Timer,
    /// History log was written
    HistoryChanged,
    /// Stats cache was rewritten
    StatsCacheChanged,
    /// Quota configuration changed
    ConfigChanged,
}

impl RefreshTrigger {
    /// Bursty triggers go through the debouncer; the others run directly
    pub fn is_debounced(self) -> bool {
        matches!(
            self,
            RefreshTrigger::HistoryChanged
                | RefreshTrigger::StatsCacheChanged
                | RefreshTrigger::ConfigChanged
        )
    }
}

/// Events emitted by the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A new snapshot replaced the previous one
    SnapshotPublished(Arc<UsageSnapshot>),
    /// The last pass degraded these sources to empty
    PassDegraded(Vec<String>),
    /// Watcher encountered an error
    WatcherError(String),
}

/// Event bus for broadcasting engine events
///
/// Uses tokio::broadcast for multi-consumer support.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create with default capacity (64 events)
    pub fn default_capacity() -> Self {
        Self::new(64)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: EngineEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Get current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::default_capacity()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
