use lru::LruCache;
use std::num::NonZeroUsize;

use crate::infrastructure::database::StoredDocument;

/// LRU cache of stored documents keyed by (collection, id).
///
/// Every invalidation bumps `generation`. A reader that loaded a document
/// from the store only caches it if no invalidation happened since the
/// read began, so a write racing the read can never be shadowed.
pub struct DocumentCache {
    inner: LruCache<(String, String), StoredDocument>,
    generation: u64,
}

impl DocumentCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        DocumentCache {
            inner: LruCache::new(capacity),
            generation: 0,
        }
    }

    pub fn get(&mut self, collection: &str, id: &str) -> Option<&StoredDocument> {
        self.inner.get(&(collection.to_string(), id.to_string()))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn insert(&mut self, doc: StoredDocument) {
        self.inner.put((doc.collection.clone(), doc.id.clone()), doc);
    }

    /// Cache `doc` unless a write invalidated anything after `read_generation`
    pub fn insert_if_unchanged(&mut self, doc: StoredDocument, read_generation: u64) -> bool {
        if self.generation != read_generation {
            return false;
        }
        self.insert(doc);
        true
    }

    pub fn invalidate(&mut self, collection: &str, id: &str) -> Option<StoredDocument> {
        self.generation += 1;
        self.inner.pop(&(collection.to_string(), id.to_string()))
    }

    /// Drop every cached document of `collection`
    pub fn invalidate_collection(&mut self, collection: &str) -> usize {
        self.generation += 1;
        let stale: Vec<(String, String)> = self
            .inner
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            self.inner.pop(key);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(collection: &str, id: &str) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            collection: collection.to_string(),
            data: json!({ "id": id }),
            version: 1,
            created_time: 0,
            updated_time: 0,
        }
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = DocumentCache::new(NonZeroUsize::new(2).unwrap());
        cache.insert(doc("events", "a"));
        cache.insert(doc("events", "b"));
        assert!(cache.get("events", "a").is_some());
        cache.insert(doc("events", "c"));

        assert!(cache.get("events", "b").is_none());
        assert_eq!(cache.len(), 2);
        assert!(cache.invalidate("events", "a").is_some());
    }

    #[test]
    fn test_invalidate_collection_keeps_others() {
        let mut cache = DocumentCache::new(NonZeroUsize::new(8).unwrap());
        cache.insert(doc("rsvps", "r1"));
        cache.insert(doc("rsvps", "r2"));
        cache.insert(doc("events", "e1"));

        assert_eq!(cache.invalidate_collection("rsvps"), 2);
        assert!(cache.get("events", "e1").is_some());
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_read_started_before_a_write_is_not_cached() {
        let mut cache = DocumentCache::new(NonZeroUsize::new(4).unwrap());
        let read_generation = cache.generation();
        cache.invalidate("events", "e1");

        assert!(!cache.insert_if_unchanged(doc("events", "e1"), read_generation));
        assert!(cache.get("events", "e1").is_none());

        let read_generation = cache.generation();
        assert!(cache.insert_if_unchanged(doc("events", "e1"), read_generation));
        assert!(cache.get("events", "e1").is_some());
    }
}
