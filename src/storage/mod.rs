use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ConfigPaths, StorageBackend, StorageOptions};

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("storage task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// String-keyed persistent store. Each `set` replaces the whole value in one
/// step; there is no read-modify-write primitive.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

pub fn init(paths: &ConfigPaths, options: &StorageOptions) -> Result<Arc<dyn KeyValueStore>> {
    match options.backend {
        StorageBackend::Sqlite => {
            let db_path = options.database_path(paths);
            let store = SqliteStore::open(db_path, options)
                .with_context(|| format!("opening note storage {}", db_path.display()))?;
            tracing::debug!(path = %db_path.display(), "using sqlite storage");
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::debug!("using in-memory storage; notes will not outlive the process");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
