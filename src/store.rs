//! Local copy of the server's download queue.
//!
//! Snapshots are the convergence mechanism: they replace everything. Item and
//! progress deltas are applied on top of whatever is held, and are written so
//! that any later snapshot fully overwrites their effect. Deltas carry no
//! sequence number, so nothing here tries to detect gaps or duplicates.

use log::debug;

use crate::model::{DownloadItem, Queue, Upsert};

#[derive(Debug, Default)]
pub struct QueueStore {
    queue: Queue,
    snapshots: u64,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole model. Applying the same snapshot twice is the same
    /// as applying it once.
    pub fn apply_snapshot(&mut self, queue: Queue) {
        debug!(
            "store: snapshot with {} items (had {})",
            queue.len(),
            self.queue.len()
        );
        self.queue = queue;
        self.snapshots += 1;
    }

    /// Inserts an unseen id at the end, or replaces the held item in place.
    pub fn apply_item_update(&mut self, item: DownloadItem) -> Upsert {
        let id = item.id.clone();
        let outcome = self.queue.upsert(item);
        if outcome == Upsert::Inserted {
            debug!("store: item {} arrived ahead of a snapshot", id);
        }
        outcome
    }

    /// Patches `progress` and `details` only. Returns `false` (and changes
    /// nothing) when the id is not held, which happens when a removal or
    /// completion overtakes a stale progress tick.
    pub fn apply_progress_update(&mut self, id: &str, progress: f64, details: &str) -> bool {
        match self.queue.get_mut(id) {
            Some(item) => {
                item.progress = progress;
                item.details = details.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&mut self, id: &str) -> bool {
        self.queue.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn snapshot(&self) -> &Queue {
        &self.queue
    }

    pub fn get(&self, id: &str) -> Option<&DownloadItem> {
        self.queue.get(id)
    }

    /// Number of snapshots applied since creation.
    pub fn snapshot_count(&self) -> u64 {
        self.snapshots
    }
}
