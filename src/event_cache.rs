use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::model::EventSnapshot;

/// Read-through, append-only cache of event snapshots keyed by event key.
///
/// The lock is released while a snapshot is fetched, so two first-time readers of the
/// same key may both fetch; the later insert wins.
#[derive(Debug, Default)]
pub struct EventCache {
    entries: Mutex<HashMap<String, Arc<EventSnapshot>>>,
}

impl EventCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, event_key: &str) -> Option<Arc<EventSnapshot>> {
        let guard = self.entries.lock().expect("event cache lock poisoned");
        guard.get(event_key).cloned()
    }

    pub fn insert(&self, event_key: &str, snapshot: EventSnapshot) -> Arc<EventSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.entries.lock().expect("event cache lock poisoned");
        guard.insert(event_key.to_string(), Arc::clone(&snapshot));
        snapshot
    }

    /// Failed fetches are not cached.
    pub fn get_or_fetch(
        &self,
        event_key: &str,
        fetch: impl FnOnce() -> Result<EventSnapshot>,
    ) -> Result<Arc<EventSnapshot>> {
        if let Some(hit) = self.get(event_key) {
            return Ok(hit);
        }
        let snapshot = fetch()?;
        Ok(self.insert(event_key, snapshot))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("event cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
