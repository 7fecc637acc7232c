//! Translation between the in-memory [`NoteCollection`] and the single
//! serialized value kept under one storage key.
//!
//! Every screen loads its own copy; nothing here is cached. The helpers that
//! read, mutate and write back ([`NoteStore::append`],
//! [`NoteStore::update_note`], [`NoteStore::delete_note`]) do a fresh load in
//! the same call, but the gap between that load and the final write is not
//! locked. Two overlapping read-modify-write sequences resolve as last write
//! wins: the earlier one's change is lost.

use std::sync::Arc;

use thiserror::Error;

use crate::note::{sanitize_note, validate_note, Note, NoteCollection, StaleIndex, ValidationError};
use crate::storage::{KeyValueStore, StorageError};

pub const DEFAULT_NOTES_KEY: &str = "notes";

#[derive(Debug, Error)]
pub enum NoteStoreError {
    #[error("note rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    StaleIndex(#[from] StaleIndex),

    #[error("note storage unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("encoding notes: {0}")]
    Encode(#[from] serde_json::Error),
}

impl NoteStoreError {
    /// Whether repeating the same save later could succeed without the caller
    /// changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NoteStoreError::Storage(_))
    }
}

#[derive(Clone)]
pub struct NoteStore {
    kv: Arc<dyn KeyValueStore>,
    key: Arc<str>,
}

impl NoteStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, DEFAULT_NOTES_KEY)
    }

    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: Arc::from(key.into()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the collection. A missing key or a value that does not decode as
    /// a note array both read as an empty collection; only I/O failures are
    /// returned.
    pub async fn load(&self) -> Result<NoteCollection, NoteStoreError> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            tracing::debug!(key = %self.key, "no stored notes yet");
            return Ok(NoteCollection::new());
        };
        match serde_json::from_str::<NoteCollection>(&raw) {
            Ok(notes) => {
                tracing::debug!(key = %self.key, count = notes.len(), "loaded notes");
                Ok(notes)
            }
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "stored notes are unreadable, treating as empty"
                );
                Ok(NoteCollection::new())
            }
        }
    }

    /// Writes the whole collection as one value, overwriting whatever is
    /// stored regardless of what other readers hold.
    pub async fn replace_all(&self, notes: &NoteCollection) -> Result<(), NoteStoreError> {
        let raw = serde_json::to_string(notes)?;
        self.kv.set(&self.key, &raw).await?;
        tracing::debug!(key = %self.key, count = notes.len(), "saved notes");
        Ok(())
    }

    /// Sanitizes, validates, stamps and appends `note`. Returns the new
    /// position together with the note as stored.
    pub async fn append(&self, note: Note) -> Result<(usize, Note), NoteStoreError> {
        let mut note = sanitize_note(note);
        validate_note(&note)?;
        note.stamp();
        let mut notes = self.load().await?;
        let index = notes.push(note.clone());
        self.replace_all(&notes).await?;
        tracing::info!(index, kind = %note.kind, "added note");
        Ok((index, note))
    }

    /// Positional read against a fresh load. `None` when the index is past
    /// the end.
    pub async fn get(&self, index: usize) -> Result<Option<Note>, NoteStoreError> {
        let notes = self.load().await?;
        Ok(notes.get(index).cloned())
    }

    /// Fresh load, [`NoteCollection::update_at`], write back.
    pub async fn update_note(&self, index: usize, note: Note) -> Result<Note, NoteStoreError> {
        let mut notes = self.load().await?;
        let stored = notes.update_at(index, note)?.clone();
        self.replace_all(&notes).await?;
        tracing::info!(index, "updated note");
        Ok(stored)
    }

    /// Fresh load, [`NoteCollection::delete_at`], write back. Positions after
    /// `index` shift down by one.
    pub async fn delete_note(&self, index: usize) -> Result<Note, NoteStoreError> {
        let mut notes = self.load().await?;
        let removed = notes.delete_at(index)?;
        self.replace_all(&notes).await?;
        tracing::info!(index, remaining = notes.len(), "deleted note");
        Ok(removed)
    }
}
