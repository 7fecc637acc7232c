use thiserror::Error;

use super::{Note, NoteKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("preaching notes need a title")]
    MissingTitle,
    #[error("preaching notes need content")]
    MissingContent,
    #[error("note needs a title or some content")]
    Empty,
    #[error("cannot turn a {stored} note into a {submitted} note")]
    KindChanged {
        stored: NoteKind,
        submitted: NoteKind,
    },
}

/// Trims every text field and drops the ones the note's kind does not carry.
pub fn sanitize_note(note: Note) -> Note {
    let (speaker, date) = match note.kind {
        NoteKind::Preaching => (trim_optional(note.speaker), trim_optional(note.date)),
        NoteKind::Free => (None, None),
    };
    Note {
        kind: note.kind,
        title: note.title.trim().to_string(),
        content: note.content.trim().to_string(),
        speaker,
        date,
        last_edited: note.last_edited,
        color: note.color,
    }
}

pub fn validate_note(note: &Note) -> Result<(), ValidationError> {
    let has_title = !note.title.trim().is_empty();
    let has_content = !note.content.trim().is_empty();
    match note.kind {
        NoteKind::Preaching if !has_title => Err(ValidationError::MissingTitle),
        NoteKind::Preaching if !has_content => Err(ValidationError::MissingContent),
        NoteKind::Free if !has_title && !has_content => Err(ValidationError::Empty),
        _ => Ok(()),
    }
}

pub fn is_valid_note(note: &Note) -> bool {
    validate_note(note).is_ok()
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
