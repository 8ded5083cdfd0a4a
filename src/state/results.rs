use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::config_item::ConfigItem;

/// Latest observable state of executed items, keyed by GUID.
///
/// Producers (the tick and input events) insert clones, the frontend consumer drains.
/// Draining takes the whole map under the same lock the producers use, so an entry is
/// either in the drained batch or still in the map, never lost in between.
#[derive(Debug, Default)]
pub struct ResultMap {
    items: Mutex<HashMap<String, ConfigItem>>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ConfigItem>> {
        // A panicking producer leaves the map itself consistent
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace the entry for `item.guid`. Last write wins.
    pub fn insert(&self, item: ConfigItem) {
        self.lock().insert(item.guid.clone(), item);
    }

    /// Merge a batch, e.g. the result of one input dispatch.
    pub fn extend(&self, items: HashMap<String, ConfigItem>) {
        self.lock().extend(items);
    }

    /// Take every entry and leave the map empty, atomically.
    pub fn drain(&self) -> HashMap<String, ConfigItem> {
        std::mem::take(&mut *self.lock())
    }

    pub fn get(&self, guid: &str) -> Option<ConfigItem> {
        self.lock().get(guid).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
