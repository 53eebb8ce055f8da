// Core infrastructure modules
pub mod database;        // Document store interface and query model
pub mod sqlite_database; // SQLite implementation of the document store
pub mod cache;           // LRU cache
pub mod documents;       // Typed, cached document access
pub mod blob_storage;    // Binary object storage
pub mod viewer;          // Viewer context

// Re-export core infrastructure components
pub use blob_storage::{BlobStore, LocalBlobStore};
pub use database::{DocumentQuery, DocumentStore, FieldDelta, SortDirection};
pub use documents::{Document, Documents};
pub use sqlite_database::SqliteDocumentStore;
pub use viewer::{Vc, ViewerContext};
