use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::{schema, KeyValueStore, StorageError};
use crate::config::StorageOptions;

/// Key-value pairs in a single `kv` table of a WAL-mode SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
    wal_autocheckpoint: u32,
}

impl SqliteStore {
    pub fn open(db_path: &Path, options: &StorageOptions) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = Self {
            db_path: Arc::new(db_path.to_path_buf()),
            wal_autocheckpoint: options.wal_autocheckpoint,
        };
        let conn = store.connect()?;
        schema::apply(&conn)?;
        Ok(store)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&*self.db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(
            None,
            "wal_autocheckpoint",
            self.wal_autocheckpoint.to_string(),
        )?;
        Ok(conn)
    }

    async fn with_connection<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.connect()?;
            f(&conn).map_err(StorageError::from)
        })
        .await?
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map(|_| ())
        })
        .await
    }
}
