// Typed Documents - entity-aware access to the document store
// Adds serde (de)serialization, validation and an LRU read cache on top of DocumentStore

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::infrastructure::cache::DocumentCache;
use crate::infrastructure::database::{DocumentQuery, DocumentStore, FieldDelta, StoredDocument};

/// Attempts made by `update_with` before giving up on a contended document
const MAX_SWAP_ATTEMPTS: usize = 8;

/// Implemented by every persisted entity
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name in the document store
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Schema constraints; an empty list means the document is valid.
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }
}

impl DocumentQuery {
    pub fn of<T: Document>() -> Self {
        Self::new(T::COLLECTION)
    }
}

#[derive(Clone)]
pub struct Documents {
    store: Arc<dyn DocumentStore>,
    cache: Option<Arc<Mutex<DocumentCache>>>,
}

impl Documents {
    /// A capacity of zero disables the read cache.
    pub fn new(store: Arc<dyn DocumentStore>, cache_capacity: usize) -> Self {
        let cache = NonZeroUsize::new(cache_capacity).map(|cap| Arc::new(Mutex::new(DocumentCache::new(cap))));
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    async fn fetch(&self, collection: &str, id: &str) -> AppResult<Option<StoredDocument>> {
        let Some(cache) = &self.cache else {
            return self.store.get(collection, id).await;
        };

        let read_generation = {
            let mut cache = cache.lock().await;
            if let Some(doc) = cache.get(collection, id).cloned() {
                return Ok(Some(doc));
            }
            cache.generation()
        };

        let doc = self.store.get(collection, id).await?;
        if let Some(doc) = &doc {
            cache.lock().await.insert_if_unchanged(doc.clone(), read_generation);
        }
        Ok(doc)
    }

    async fn invalidate(&self, collection: &str, id: &str) {
        if let Some(cache) = &self.cache {
            cache.lock().await.invalidate(collection, id);
        }
    }

    async fn invalidate_collection(&self, collection: &str) {
        if let Some(cache) = &self.cache {
            cache.lock().await.invalidate_collection(collection);
        }
    }

    fn decode<T: Document>(doc: StoredDocument) -> AppResult<T> {
        serde_json::from_value(doc.data).map_err(|e| {
            AppError::DeserializationError(format!(
                "Failed to decode {}/{}: {}",
                doc.collection, doc.id, e
            ))
        })
    }

    fn encode<T: Document>(doc: &T) -> AppResult<Value> {
        let errors = doc.validate();
        if !errors.is_empty() {
            return Err(AppError::Validation(format!(
                "Validation failed: {}",
                errors.join(", ")
            )));
        }
        serde_json::to_value(doc).map_err(|e| AppError::SerializationError(e.to_string()))
    }

    pub async fn get<T: Document>(&self, id: &str) -> AppResult<Option<T>> {
        self.fetch(T::COLLECTION, id)
            .await?
            .map(Self::decode::<T>)
            .transpose()
    }

    /// Load a document or fail with `NotFound`
    pub async fn require<T: Document>(&self, id: &str) -> AppResult<T> {
        self.get::<T>(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::COLLECTION, id)))
    }

    pub async fn exists<T: Document>(&self, id: &str) -> AppResult<bool> {
        Ok(self.fetch(T::COLLECTION, id).await?.is_some())
    }

    pub async fn create<T: Document>(&self, doc: &T) -> AppResult<()> {
        let data = Self::encode(doc)?;
        self.store.insert(T::COLLECTION, doc.id(), data).await?;
        self.invalidate(T::COLLECTION, doc.id()).await;
        Ok(())
    }

    /// Insert or overwrite the whole document
    pub async fn save<T: Document>(&self, doc: &T) -> AppResult<()> {
        let data = Self::encode(doc)?;
        self.store.put(T::COLLECTION, doc.id(), data).await?;
        self.invalidate(T::COLLECTION, doc.id()).await;
        Ok(())
    }

    /// Apply a JSON merge patch to an existing document
    pub async fn merge<T: Document>(&self, id: &str, patch: Value) -> AppResult<()> {
        let found = self.store.merge(T::COLLECTION, id, patch).await?;
        self.invalidate(T::COLLECTION, id).await;
        if found {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("{} {} not found", T::COLLECTION, id)))
        }
    }

    pub async fn delete<T: Document>(&self, id: &str) -> AppResult<bool> {
        let deleted = self.store.delete(T::COLLECTION, id).await?;
        self.invalidate(T::COLLECTION, id).await;
        Ok(deleted)
    }

    pub async fn query<T: Document>(&self, query: DocumentQuery) -> AppResult<Vec<T>> {
        debug_assert_eq!(query.collection, T::COLLECTION);
        tracing::debug!(collection = %query.collection, filters = query.filters.len(), "document query");
        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(Self::decode::<T>)
            .collect()
    }

    pub async fn first<T: Document>(&self, query: DocumentQuery) -> AppResult<Option<T>> {
        Ok(self.query::<T>(query.limit(1)).await?.into_iter().next())
    }

    pub async fn count(&self, query: &DocumentQuery) -> AppResult<u64> {
        self.store.count(query).await
    }

    pub async fn delete_where(&self, query: &DocumentQuery) -> AppResult<u64> {
        let deleted = self.store.delete_where(query).await?;
        if deleted > 0 {
            self.invalidate_collection(&query.collection).await;
        }
        Ok(deleted)
    }

    /// Atomic counter update. Returns false when the document does not exist.
    pub async fn increment<T: Document>(&self, id: &str, deltas: &[FieldDelta]) -> AppResult<bool> {
        let found = self.store.increment(T::COLLECTION, id, deltas).await?;
        self.invalidate(T::COLLECTION, id).await;
        Ok(found)
    }

    /// Versioned read-modify-write: re-read and re-apply `apply` until the
    /// write lands on the version it was computed from.
    pub async fn update_with<T, F>(&self, id: &str, mut apply: F) -> AppResult<T>
    where
        T: Document,
        F: FnMut(&mut T) -> AppResult<()> + Send,
    {
        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let stored = self
                .store
                .get(T::COLLECTION, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::COLLECTION, id)))?;
            let version = stored.version;
            let mut doc: T = Self::decode(stored)?;
            apply(&mut doc)?;
            let data = Self::encode(&doc)?;

            if self
                .store
                .compare_and_swap(T::COLLECTION, id, version, data)
                .await?
            {
                self.invalidate(T::COLLECTION, id).await;
                return Ok(doc);
            }
            tracing::debug!(collection = T::COLLECTION, id, attempt, "version conflict, retrying");
        }

        Err(AppError::Conflict(format!(
            "{} {} is being modified concurrently",
            T::COLLECTION,
            id
        )))
    }
}
