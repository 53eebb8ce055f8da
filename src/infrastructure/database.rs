// Document Store Interface - Low-level operations on JSON documents
// Every entity lives in a named collection and is addressed by (collection, id)

use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::Value;

/// Current time in milliseconds since Unix epoch
pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A document as persisted by the store, with bookkeeping columns
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub collection: String,
    pub data: Value,
    pub version: u64,
    pub created_time: i64,
    pub updated_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    ArrayContains,
    In,
}

#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Query over a single collection. Field names are dotted paths into the
/// document (`location.address`, `stats.reviews`).
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub order_by: Vec<(String, SortDirection)>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

impl DocumentQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    fn filter(mut self, field: &str, op: FilterOp, value: Value) -> Self {
        self.filters.push(FieldFilter {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value.into())
    }

    pub fn where_lt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Lt, value.into())
    }

    pub fn where_lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Lte, value.into())
    }

    pub fn where_gt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Gt, value.into())
    }

    pub fn where_gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Gte, value.into())
    }

    pub fn array_contains(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::ArrayContains, value.into())
    }

    pub fn where_in<V: Into<Value>>(self, field: &str, values: Vec<V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filter(field, FilterOp::In, Value::Array(values))
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by.push((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Signed change applied to a numeric field by `DocumentStore::increment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDelta {
    pub field: String,
    pub delta: i64,
}

impl FieldDelta {
    pub fn new(field: &str, delta: i64) -> Self {
        Self {
            field: field.to_string(),
            delta,
        }
    }
}

/// Document store trait used by the typed `Documents` layer
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<StoredDocument>>;

    /// Insert a new document; `Conflict` if the id is taken.
    async fn insert(&self, collection: &str, id: &str, data: Value) -> AppResult<()>;

    /// Insert or overwrite a document.
    async fn put(&self, collection: &str, id: &str, data: Value) -> AppResult<()>;

    /// Apply a JSON merge patch. Returns false when the document is missing.
    async fn merge(&self, collection: &str, id: &str, patch: Value) -> AppResult<bool>;

    /// Overwrite only if the stored version still equals `expected_version`.
    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        data: Value,
    ) -> AppResult<bool>;

    /// Atomically apply every delta in one write. Results are clamped at zero.
    /// Returns false when the document is missing.
    async fn increment(&self, collection: &str, id: &str, deltas: &[FieldDelta])
        -> AppResult<bool>;

    async fn delete(&self, collection: &str, id: &str) -> AppResult<bool>;

    async fn query(&self, query: &DocumentQuery) -> AppResult<Vec<StoredDocument>>;

    async fn count(&self, query: &DocumentQuery) -> AppResult<u64>;

    /// Delete every document matching the query filters (ordering and limits ignored).
    async fn delete_where(&self, query: &DocumentQuery) -> AppResult<u64>;
}
