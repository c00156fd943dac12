//! Snapshot store
//!
//! Holds the last published snapshot behind a `parking_lot::RwLock`. Publish
//! swaps one `Arc` under the write lock, so a reader gets either the old or
//! the new snapshot and never a mix of both.

use crate::event::{EngineEvent, EventBus};
use crate::models::UsageSnapshot;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Latest published usage snapshot
pub struct SnapshotStore {
    current: RwLock<Option<Arc<UsageSnapshot>>>,
    event_bus: EventBus,
}

impl SnapshotStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            current: RwLock::new(None),
            event_bus,
        }
    }

    /// Latest snapshot, `None` until the first pass publishes
    pub fn get(&self) -> Option<Arc<UsageSnapshot>> {
        self.current.read().clone()
    }

    /// Replace the current snapshot and notify subscribers
    pub fn publish(&self, snapshot: UsageSnapshot) -> Arc<UsageSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Some(Arc::clone(&snapshot));
        debug!(
            five_hour = snapshot.five_hour_count,
            weekly = snapshot.weekly_count,
            "Snapshot published"
        );
        self.event_bus
            .publish(EngineEvent::SnapshotPublished(Arc::clone(&snapshot)));
        snapshot
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
