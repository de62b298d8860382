//! In-memory metadata store.

use super::MetadataStore;
use crate::error::Result;
use crate::types::StoredSubscription;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Metadata store backed by a process-local map.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, StoredSubscription>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records.
    pub fn with_items(items: HashMap<String, StoredSubscription>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredSubscription> {
        self.items.read().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl MetadataStore for MemoryStore {
    fn get_all(&self) -> Result<HashMap<String, StoredSubscription>> {
        Ok(self.items.read().clone())
    }

    fn set_item(&self, key: &str, record: &StoredSubscription) -> Result<()> {
        self.items.write().insert(key.to_string(), *record);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.items.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn stored(count: u64) -> StoredSubscription {
        StoredSubscription {
            created_at: Timestamp(1),
            updated_at: Timestamp(2),
            count,
        }
    }

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set_item("a", &stored(1)).unwrap();
        store.set_item("a", &stored(2)).unwrap();
        store.set_item("b", &stored(5)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap().count, 2);

        store.remove_item("a").unwrap();
        store.remove_item("missing").unwrap();
        assert!(store.get("a").is_none());

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["b"].count, 5);

        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
