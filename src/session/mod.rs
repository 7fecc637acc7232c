use crate::note::{Note, NoteKind, StaleIndex};
use crate::store::{NoteStore, NoteStoreError};

/// Where a draft lands when saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    Append,
    At(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Clean,
    Dirty,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Unchanged,
    Saved { index: usize, last_edited: i64 },
}

#[derive(Debug, Clone)]
pub struct EditFailure {
    pub message: String,
    pub retryable: bool,
}

/// One screen's editing session over a single note.
///
/// A failed save keeps the draft and returns to `Dirty`; retrying is up to
/// the caller.
#[derive(Debug, Clone)]
pub struct EditSession {
    target: SaveTarget,
    draft: Note,
    state: EditState,
    last_error: Option<EditFailure>,
}

impl EditSession {
    pub fn compose(kind: NoteKind) -> Self {
        Self {
            target: SaveTarget::Append,
            draft: Note::empty(kind),
            state: EditState::Clean,
            last_error: None,
        }
    }

    pub async fn open(store: &NoteStore, index: usize) -> Result<Self, NoteStoreError> {
        let notes = store.load().await?;
        let draft = notes.get(index).cloned().ok_or(StaleIndex {
            index,
            len: notes.len(),
        })?;
        Ok(Self {
            target: SaveTarget::At(index),
            draft,
            state: EditState::Clean,
            last_error: None,
        })
    }

    pub fn target(&self) -> SaveTarget {
        self.target
    }

    pub fn draft(&self) -> &Note {
        &self.draft
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn last_error(&self) -> Option<&EditFailure> {
        self.last_error.as_ref()
    }

    /// A session abandoned mid-save still counts as unsaved.
    pub fn has_unsaved_changes(&self) -> bool {
        self.state != EditState::Clean
    }

    /// Applies a field edit. The note's kind is fixed for the session.
    pub fn edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Note),
    {
        let kind = self.draft.kind;
        let before = self.draft.clone();
        f(&mut self.draft);
        self.draft.kind = kind;
        if self.draft != before {
            self.state = EditState::Dirty;
        }
    }

    pub async fn save(&mut self, store: &NoteStore) -> Result<SaveOutcome, NoteStoreError> {
        if self.state == EditState::Clean {
            return Ok(SaveOutcome::Unchanged);
        }
        self.state = EditState::Saving;
        let result = match self.target {
            SaveTarget::Append => store.append(self.draft.clone()).await,
            SaveTarget::At(index) => store
                .update_note(index, self.draft.clone())
                .await
                .map(|note| (index, note)),
        };
        match result {
            Ok((index, stored)) => {
                let last_edited = stored.last_edited.unwrap_or_default();
                self.target = SaveTarget::At(index);
                self.draft = stored;
                self.state = EditState::Clean;
                self.last_error = None;
                Ok(SaveOutcome::Saved { index, last_edited })
            }
            Err(err) => {
                tracing::warn!(save_target = ?self.target, error = %err, "save failed, keeping draft");
                self.state = EditState::Dirty;
                self.last_error = Some(EditFailure {
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{NoteColor, ValidationError};
    use crate::storage::MemoryStore;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn store() -> NoteStore {
        NoteStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn compose_then_save_moves_dirty_to_clean() -> anyhow::Result<()> {
        let store = store();
        let mut session = EditSession::compose(NoteKind::Preaching);
        assert_eq!(session.save(&store).await?, SaveOutcome::Unchanged);

        session.edit(|note| {
            note.title = " Sunday ".into();
            note.content = "<p>John 3</p>".into();
            note.speaker = Some("Ana".into());
        });
        assert_eq!(session.state(), EditState::Dirty);

        let outcome = session.save(&store).await?;
        assert_matches!(outcome, SaveOutcome::Saved { index: 0, .. });
        assert_eq!(session.state(), EditState::Clean);
        assert_eq!(session.target(), SaveTarget::At(0));
        assert_eq!(session.draft().title, "Sunday");

        // Later saves update in place instead of appending again.
        session.edit(|note| note.color = Some(NoteColor::Pink));
        session.save(&store).await?;
        let notes = store.load().await?;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes.get(0).and_then(|n| n.color), Some(NoteColor::Pink));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_save_keeps_the_draft_dirty() -> anyhow::Result<()> {
        let store = store();
        let mut session = EditSession::compose(NoteKind::Preaching);
        session.edit(|note| note.content = "only content".into());

        let err = session.save(&store).await.unwrap_err();
        assert_matches!(err, NoteStoreError::Validation(ValidationError::MissingTitle));
        assert_eq!(session.state(), EditState::Dirty);
        assert_eq!(session.draft().content, "only content");
        assert!(!session.last_error().map(|e| e.retryable).unwrap_or(true));
        assert!(store.load().await?.is_empty());
        Ok(())
    }

    #[test]
    fn edit_cannot_change_kind() {
        let mut session = EditSession::compose(NoteKind::Free);
        session.edit(|note| note.kind = NoteKind::Preaching);
        assert_eq!(session.draft().kind, NoteKind::Free);
        assert_eq!(session.state(), EditState::Clean);
    }

    #[tokio::test]
    async fn open_reports_stale_index_after_external_delete() -> anyhow::Result<()> {
        let store = store();
        store.append(Note::free("A", "")).await?;
        store.append(Note::free("B", "")).await?;

        let mut session = EditSession::open(&store, 1).await?;
        store.delete_note(0).await?;

        session.edit(|note| note.title = "B2".into());
        let err = session.save(&store).await.unwrap_err();
        assert_matches!(err, NoteStoreError::StaleIndex(StaleIndex { index: 1, len: 1 }));
        assert!(session.has_unsaved_changes());

        assert_matches!(
            EditSession::open(&store, 4).await,
            Err(NoteStoreError::StaleIndex(_))
        );
        Ok(())
    }
}
