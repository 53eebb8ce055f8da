use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{
    current_time_millis, DocumentQuery, DocumentStore, FieldDelta, FilterOp, SortDirection,
    StoredDocument,
};

const DOCUMENT_COLUMNS: &str = "SELECT id, collection, data, version, time_created, time_updated FROM documents";

/// SQLite implementation of the document store. Documents are stored as JSON
/// text and filtered with SQLite's JSON1 functions.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let in_memory = is_memory_url(database_url);
        if !in_memory {
            ensure_parent_dir(database_url).await?;
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid DATABASE_URL {}: {}", database_url, e))
            })?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // An in-memory database lives and dies with its connection, so keep exactly one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to connect to {}: {}", database_url, e))
        })?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create the documents table and its indexes
    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                time_created INTEGER NOT NULL,
                time_updated INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create documents table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection_updated ON documents(collection, time_updated DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create documents index: {}", e)))?;

        Ok(())
    }

    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

async fn ensure_parent_dir(url: &str) -> AppResult<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// JSON path for a dotted field name. Only identifier characters are accepted.
fn json_path(field: &str) -> AppResult<String> {
    let valid = !field.is_empty()
        && field
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if !valid {
        return Err(AppError::Validation(format!("Invalid field path: {}", field)));
    }
    Ok(format!("$.{}", field))
}

fn push_scalar(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) -> AppResult<()> {
    match value {
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        Value::Bool(b) => {
            qb.push_bind(i64::from(*b));
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                qb.push_bind(i);
            } else if let Some(f) = n.as_f64() {
                qb.push_bind(f);
            } else {
                return Err(AppError::Validation(format!("Unsupported number: {}", n)));
            }
        }
        other => {
            return Err(AppError::Validation(format!(
                "Filter values must be scalars, got {}",
                other
            )))
        }
    }
    Ok(())
}

fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, query: &DocumentQuery) -> AppResult<()> {
    qb.push(" WHERE collection = ");
    qb.push_bind(query.collection.clone());

    for filter in &query.filters {
        let path = json_path(&filter.field)?;
        qb.push(" AND ");
        match filter.op {
            FilterOp::ArrayContains => {
                qb.push("EXISTS (SELECT 1 FROM json_each(documents.data, ");
                qb.push_bind(path);
                qb.push(") WHERE json_each.value = ");
                push_scalar(qb, &filter.value)?;
                qb.push(")");
            }
            FilterOp::In => {
                let values = filter.value.as_array().cloned().unwrap_or_default();
                if values.is_empty() {
                    qb.push("0");
                    continue;
                }
                qb.push("json_extract(data, ");
                qb.push_bind(path);
                qb.push(") IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    push_scalar(qb, value)?;
                }
                qb.push(")");
            }
            FilterOp::Eq if filter.value.is_null() => {
                qb.push("json_extract(data, ");
                qb.push_bind(path);
                qb.push(") IS NULL");
            }
            op => {
                let sql_op = match op {
                    FilterOp::Eq => " = ",
                    FilterOp::Lt => " < ",
                    FilterOp::Lte => " <= ",
                    FilterOp::Gt => " > ",
                    FilterOp::Gte => " >= ",
                    FilterOp::ArrayContains | FilterOp::In => unreachable!("handled above"),
                };
                qb.push("json_extract(data, ");
                qb.push_bind(path);
                qb.push(")");
                qb.push(sql_op);
                push_scalar(qb, &filter.value)?;
            }
        }
    }
    Ok(())
}

fn row_to_document(row: SqliteRow) -> AppResult<StoredDocument> {
    let raw: String = row.try_get("data")?;
    let data: Value = serde_json::from_str(&raw)?;
    Ok(StoredDocument {
        id: row.try_get("id")?,
        collection: row.try_get("collection")?,
        data,
        version: row.try_get::<i64, _>("version")? as u64,
        created_time: row.try_get("time_created")?,
        updated_time: row.try_get("time_updated")?,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<StoredDocument>> {
        let row = sqlx::query(&format!("{} WHERE collection = ? AND id = ?", DOCUMENT_COLUMNS))
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to get {}/{}: {}", collection, id, e))
            })?;

        row.map(row_to_document).transpose()
    }

    async fn insert(&self, collection: &str, id: &str, data: Value) -> AppResult<()> {
        let now = current_time_millis();
        let result = sqlx::query(
            "INSERT INTO documents (collection, id, data, version, time_created, time_updated) VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(collection)
        .bind(id)
        .bind(data.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                format!("Document {}/{} already exists", collection, id),
            )),
            Err(e) => Err(AppError::DatabaseError(format!(
                "Failed to insert {}/{}: {}",
                collection, id, e
            ))),
        }
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> AppResult<()> {
        let now = current_time_millis();
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, version, time_created, time_updated)
            VALUES (?, ?, ?, 1, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                data = excluded.data,
                version = documents.version + 1,
                time_updated = excluded.time_updated
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(data.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to put {}/{}: {}", collection, id, e)))?;
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, patch: Value) -> AppResult<bool> {
        let now = current_time_millis();
        let result = sqlx::query(
            "UPDATE documents SET data = json_patch(data, ?), version = version + 1, time_updated = ? WHERE collection = ? AND id = ?",
        )
        .bind(patch.to_string())
        .bind(now)
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to merge {}/{}: {}", collection, id, e))
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        data: Value,
    ) -> AppResult<bool> {
        let now = current_time_millis();
        let result = sqlx::query(
            "UPDATE documents SET data = ?, version = version + 1, time_updated = ? WHERE collection = ? AND id = ? AND version = ?",
        )
        .bind(data.to_string())
        .bind(now)
        .bind(collection)
        .bind(id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to swap {}/{}: {}", collection, id, e))
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        deltas: &[FieldDelta],
    ) -> AppResult<bool> {
        // Fold repeated fields so each JSON path is written once.
        let mut merged: BTreeMap<String, i64> = BTreeMap::new();
        for d in deltas {
            *merged.entry(json_path(&d.field)?).or_insert(0) += d.delta;
        }
        merged.retain(|_, delta| *delta != 0);
        if merged.is_empty() {
            return Ok(self.get(collection, id).await?.is_some());
        }

        let now = current_time_millis();
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE documents SET data = json_set(data");
        for (path, delta) in merged {
            qb.push(", ");
            qb.push_bind(path.clone());
            qb.push(", MAX(0, COALESCE(json_extract(data, ");
            qb.push_bind(path);
            qb.push("), 0) + ");
            qb.push_bind(delta);
            qb.push(")");
        }
        qb.push("), version = version + 1, time_updated = ");
        qb.push_bind(now);
        qb.push(" WHERE collection = ");
        qb.push_bind(collection.to_string());
        qb.push(" AND id = ");
        qb.push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to increment {}/{}: {}", collection, id, e))
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to delete {}/{}: {}", collection, id, e))
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, query: &DocumentQuery) -> AppResult<Vec<StoredDocument>> {
        let mut qb = QueryBuilder::<Sqlite>::new(DOCUMENT_COLUMNS);
        push_where(&mut qb, query)?;

        qb.push(" ORDER BY ");
        for (field, direction) in &query.order_by {
            qb.push("json_extract(data, ");
            qb.push_bind(json_path(field)?);
            qb.push(match direction {
                SortDirection::Asc => ") ASC, ",
                SortDirection::Desc => ") DESC, ",
            });
        }
        qb.push("time_created ASC, id ASC");

        match (query.limit, query.offset) {
            (Some(limit), offset) => {
                qb.push(" LIMIT ");
                qb.push_bind(limit as i64);
                if let Some(offset) = offset {
                    qb.push(" OFFSET ");
                    qb.push_bind(offset as i64);
                }
            }
            (None, Some(offset)) => {
                qb.push(" LIMIT -1 OFFSET ");
                qb.push_bind(offset as i64);
            }
            (None, None) => {}
        }

        let rows = qb.build().fetch_all(&self.pool).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to query {}: {}", query.collection, e))
        })?;

        rows.into_iter().map(row_to_document).collect()
    }

    async fn count(&self, query: &DocumentQuery) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS count FROM documents");
        push_where(&mut qb, query)?;
        let row = qb.build().fetch_one(&self.pool).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to count {}: {}", query.collection, e))
        })?;
        Ok(row.try_get::<i64, _>("count")? as u64)
    }

    async fn delete_where(&self, query: &DocumentQuery) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM documents");
        push_where(&mut qb, query)?;
        let result = qb.build().execute(&self.pool).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to delete from {}: {}", query.collection, e))
        })?;
        Ok(result.rows_affected())
    }
}
