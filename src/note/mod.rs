use std::slice;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;
use time::OffsetDateTime;

use crate::store::NoteStoreError;

pub mod sanitize;

pub use sanitize::{is_valid_note, sanitize_note, validate_note, ValidationError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoteKind {
    Free,
    Preaching,
}

/// Background tag for a note card. Persisted as the lowercase hex value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(try_from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NoteColor {
    White,
    Yellow,
    Blue,
    Green,
    Pink,
    Purple,
}

impl NoteColor {
    pub fn hex(self) -> &'static str {
        match self {
            NoteColor::White => "#ffffff",
            NoteColor::Yellow => "#fef3c7",
            NoteColor::Blue => "#dbeafe",
            NoteColor::Green => "#dcfce7",
            NoteColor::Pink => "#fce7f3",
            NoteColor::Purple => "#e9d5ff",
        }
    }

    pub fn from_hex(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        // The editors used to preselect the shorthand white.
        if normalized == "#fff" {
            return Some(NoteColor::White);
        }
        NoteColor::iter().find(|color| color.hex() == normalized)
    }

    pub fn palette() -> impl Iterator<Item = NoteColor> {
        NoteColor::iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a palette color")]
pub struct UnknownColor(String);

impl TryFrom<String> for NoteColor {
    type Error = UnknownColor;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        NoteColor::from_hex(&raw).ok_or_else(|| {
            tracing::warn!(color = %raw, "dropping unknown note color");
            UnknownColor(raw)
        })
    }
}

impl From<NoteColor> for String {
    fn from(color: NoteColor) -> Self {
        color.hex().to_string()
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "type")]
    pub kind: NoteKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited: Option<i64>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<NoteColor>,
}

impl Note {
    pub fn empty(kind: NoteKind) -> Self {
        Self {
            kind,
            title: String::new(),
            content: String::new(),
            speaker: None,
            date: None,
            last_edited: None,
            color: None,
        }
    }

    pub fn free(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::empty(NoteKind::Free)
        }
    }

    pub fn preaching(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::empty(NoteKind::Preaching)
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_color(mut self, color: NoteColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }

    pub(crate) fn stamp(&mut self) {
        self.last_edited = Some(now_millis());
    }
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Positional mutation target that no longer exists in the collection it was
/// applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("note index {index} is out of range for {len} note(s)")]
pub struct StaleIndex {
    pub index: usize,
    pub len: usize,
}

/// Ordered notes as persisted. A note's position is its only identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteCollection(Vec<Note>);

impl NoteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.0.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Note> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Note] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Note> {
        self.0
    }

    pub(crate) fn push(&mut self, note: Note) -> usize {
        self.0.push(note);
        self.0.len() - 1
    }

    fn check_index(&self, index: usize) -> Result<(), StaleIndex> {
        if index < self.0.len() {
            Ok(())
        } else {
            Err(StaleIndex {
                index,
                len: self.0.len(),
            })
        }
    }

    /// Replaces the note at `index` wholesale and stamps `lastEdited`.
    ///
    /// The replacement is sanitized and validated first. Any error leaves the
    /// collection untouched; the stored kind may not change.
    pub fn update_at(&mut self, index: usize, note: Note) -> Result<&Note, NoteStoreError> {
        self.check_index(index)?;
        let mut note = sanitize_note(note);
        let stored = self.0[index].kind;
        if stored != note.kind {
            return Err(ValidationError::KindChanged {
                stored,
                submitted: note.kind,
            }
            .into());
        }
        validate_note(&note)?;
        note.stamp();
        self.0[index] = note;
        Ok(&self.0[index])
    }

    /// Removes the note at `index`; every later note moves down one position.
    pub fn delete_at(&mut self, index: usize) -> Result<Note, StaleIndex> {
        self.check_index(index)?;
        Ok(self.0.remove(index))
    }
}

impl From<Vec<Note>> for NoteCollection {
    fn from(notes: Vec<Note>) -> Self {
        Self(notes)
    }
}

impl FromIterator<Note> for NoteCollection {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for NoteCollection {
    type Item = Note;
    type IntoIter = std::vec::IntoIter<Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a NoteCollection {
    type Item = &'a Note;
    type IntoIter = slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn abc() -> NoteCollection {
        vec![
            Note::free("A", "alpha"),
            Note::free("B", "beta"),
            Note::free("C", "gamma"),
        ]
        .into()
    }

    #[test]
    fn decodes_legacy_shorthand_white_and_drops_unknown_colors() -> anyhow::Result<()> {
        let raw = r##"[
            {"type":"free","title":"a","content":"x","color":"#fff"},
            {"type":"free","title":"b","content":"y","color":"#123456"},
            {"type":"preaching","title":"c","content":"z","color":"#FEF3C7","lastEdited":5}
        ]"##;
        let notes: NoteCollection = serde_json::from_str(raw)?;
        assert_eq!(notes.len(), 3);
        assert_eq!(notes.as_slice()[0].color, Some(NoteColor::White));
        assert_eq!(notes.as_slice()[1].color, None);
        assert_eq!(notes.as_slice()[2].color, Some(NoteColor::Yellow));
        assert_eq!(notes.as_slice()[2].last_edited, Some(5));
        Ok(())
    }

    #[test]
    fn serializes_with_wire_field_names() -> anyhow::Result<()> {
        let mut note = Note::preaching("Grace", "<p>body</p>")
            .with_speaker("Ana")
            .with_color(NoteColor::Blue);
        note.last_edited = Some(1_700_000_000_000);
        let json = serde_json::to_string(&note)?;
        insta::assert_snapshot!(json, @r###"{"type":"preaching","title":"Grace","content":"<p>body</p>","speaker":"Ana","lastEdited":1700000000000,"color":"#dbeafe"}"###);
        Ok(())
    }

    #[test]
    fn palette_has_six_entries_and_parses_names() {
        assert_eq!(NoteColor::palette().count(), 6);
        assert_eq!("Purple".parse::<NoteColor>().ok(), Some(NoteColor::Purple));
        assert_eq!(NoteColor::Pink.to_string(), "pink");
    }

    #[test]
    fn update_at_replaces_wholesale_and_stamps() {
        let mut notes = abc();
        let before = now_millis();
        let stored = notes
            .update_at(1, Note::free("  B2 ", ""))
            .expect("in range")
            .clone();
        assert_eq!(stored.title, "B2");
        assert_eq!(stored.content, "");
        assert!(stored.last_edited.unwrap_or_default() >= before);
        assert_eq!(notes.len(), 3);
        assert_eq!(notes.get(0).map(|n| n.title.as_str()), Some("A"));
    }

    #[test]
    fn update_at_out_of_range_is_a_noop() {
        let mut notes = abc();
        let result = notes.update_at(5, Note::free("Z", ""));
        assert_matches!(
            result,
            Err(NoteStoreError::StaleIndex(StaleIndex { index: 5, len: 3 }))
        );
        assert_eq!(notes, abc());
    }

    #[test]
    fn update_at_rejects_kind_change_and_invalid_notes() {
        let mut notes = abc();
        assert_matches!(
            notes.update_at(0, Note::preaching("A", "alpha")),
            Err(NoteStoreError::Validation(ValidationError::KindChanged { .. }))
        );
        assert_matches!(
            notes.update_at(0, Note::free("  ", " ")),
            Err(NoteStoreError::Validation(ValidationError::Empty))
        );
        assert_eq!(notes, abc());
    }

    #[test]
    fn delete_at_shifts_later_positions_down() {
        let mut notes = abc();
        let removed = notes.delete_at(1).expect("in range");
        assert_eq!(removed.title, "B");
        // The same index now addresses what used to be C.
        let removed = notes.delete_at(1).expect("still in range");
        assert_eq!(removed.title, "C");
        assert_eq!(notes.len(), 1);
        assert_matches!(notes.delete_at(1), Err(StaleIndex { index: 1, len: 1 }));
    }
}
