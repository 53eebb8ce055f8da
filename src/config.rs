use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub queries: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Zero disables the document cache
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: String,
}

/// Candidate batch ceilings for client-side filtered reads
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueryConfig {
    pub nearby_event_batch: u32,
    pub nearby_venue_batch: u32,
    pub search_batch: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            nearby_event_batch: 50,
            nearby_venue_batch: 100,
            search_batch: 100,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let queries = QueryConfig::default();
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/happen.db".to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("SERVER_PORT", 3000),
            },
            cache: CacheConfig {
                capacity: env_or("CACHE_CAPACITY", 1000),
            },
            storage: StorageConfig {
                root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "data/blobs".to_string()),
            },
            queries: QueryConfig {
                nearby_event_batch: env_or("NEARBY_EVENT_BATCH", queries.nearby_event_batch),
                nearby_venue_batch: env_or("NEARBY_VENUE_BATCH", queries.nearby_venue_batch),
                search_batch: env_or("SEARCH_BATCH", queries.search_batch),
            },
        })
    }

    /// In-memory database and the given blob root; used by tests and local runs
    pub fn in_memory(storage_root: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            cache: CacheConfig { capacity: 1000 },
            storage: StorageConfig {
                root: storage_root.into(),
            },
            queries: QueryConfig::default(),
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
