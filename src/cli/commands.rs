use std::fmt::Write as _;
use std::io::{self, IsTerminal, Read};

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};

use crate::config::AppConfig;
use crate::note::{Note, NoteColor, NoteKind};
use crate::session::{EditSession, SaveOutcome};
use crate::store::{NoteStore, NoteStoreError};
use crate::text::{contrast_color, format_last_edited, preview_snippet, strip_html_tags};

#[derive(Args, Debug, Clone, Default)]
pub struct NoteFields {
    /// Note title
    #[arg(long)]
    pub title: Option<String>,
    /// Note content (HTML or plain text). Read from stdin when omitted on add.
    #[arg(long)]
    pub content: Option<String>,
    /// Speaker (preaching notes only)
    #[arg(long)]
    pub speaker: Option<String>,
    /// Date as free text (preaching notes only)
    #[arg(long)]
    pub date: Option<String>,
    /// Card color: white, yellow, blue, green, pink or purple
    #[arg(long)]
    pub color: Option<NoteColor>,
}

impl NoteFields {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.speaker.is_none()
            && self.date.is_none()
            && self.color.is_none()
    }

    fn check_kind(&self, kind: NoteKind) -> Result<()> {
        if kind == NoteKind::Free && (self.speaker.is_some() || self.date.is_some()) {
            bail!("speaker and date only apply to preaching notes");
        }
        Ok(())
    }

    fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(speaker) = self.speaker {
            note.speaker = Some(speaker);
        }
        if let Some(date) = self.date {
            note.date = Some(date);
        }
        if let Some(color) = self.color {
            note.color = Some(color);
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum AddCommand {
    /// Title and/or free-form content
    Free(NoteFields),
    /// Sermon notes: title and content required, speaker and date optional
    Preaching(NoteFields),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[command(subcommand)]
    pub kind: AddCommand,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// List position as printed by `pnotes list`
    pub index: usize,
    /// Print stored content without stripping markup
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// List position as printed by `pnotes list`
    pub index: usize,
    #[command(flatten)]
    pub fields: NoteFields,
    /// Remove the card color
    #[arg(long, conflicts_with = "color")]
    pub clear_color: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// List position as printed by `pnotes list`
    pub index: usize,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

pub async fn list_notes(config: &AppConfig, store: &NoteStore) -> Result<String> {
    let notes = store.load().await?;
    if notes.is_empty() {
        return Ok(
            "No notes yet. Add one with `pnotes add free` or `pnotes add preaching`.\n".into(),
        );
    }
    let mut out = String::new();
    for (index, note) in notes.iter().enumerate() {
        let mut headline = format!("#{index}  {}", note.display_title());
        if note.kind == NoteKind::Preaching {
            headline.push_str("  [PREACHING]");
        }
        if let Some(color) = note.color {
            let _ = write!(&mut headline, "  ({color})");
        }
        let _ = writeln!(&mut out, "{headline}");
        if let Some(speaker) = &note.speaker {
            let _ = writeln!(&mut out, "    speaker {speaker}");
        }
        if let Some(date) = &note.date {
            let _ = writeln!(&mut out, "    date    {date}");
        }
        let edited = format_last_edited(note.last_edited);
        if !edited.is_empty() {
            let _ = writeln!(&mut out, "    edited  {edited}");
        }
        if let Some(snippet) = preview_snippet(note, config.list.preview_chars) {
            let _ = writeln!(&mut out, "    {snippet}");
        }
        out.push('\n');
    }
    Ok(out)
}

pub async fn show_note(store: &NoteStore, args: ShowArgs) -> Result<String> {
    let Some(note) = store.get(args.index).await? else {
        return Err(stale_hint(args.index));
    };
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", note.display_title());
    let _ = writeln!(&mut out, "kind    {}", note.kind);
    if let Some(speaker) = &note.speaker {
        let _ = writeln!(&mut out, "speaker {speaker}");
    }
    if let Some(date) = &note.date {
        let _ = writeln!(&mut out, "date    {date}");
    }
    if let Some(color) = note.color {
        let _ = writeln!(
            &mut out,
            "color   {color} {} (text {})",
            color.hex(),
            contrast_color(color.hex())
        );
    }
    let edited = format_last_edited(note.last_edited);
    if !edited.is_empty() {
        let _ = writeln!(&mut out, "edited  {edited}");
    }
    out.push('\n');
    if args.raw {
        out.push_str(&note.content);
    } else {
        out.push_str(&strip_html_tags(&note.content));
    }
    out.push('\n');
    Ok(out)
}

pub async fn add_note(store: &NoteStore, args: AddArgs) -> Result<String> {
    let (kind, mut fields) = match args.kind {
        AddCommand::Free(fields) => (NoteKind::Free, fields),
        AddCommand::Preaching(fields) => (NoteKind::Preaching, fields),
    };
    fields.check_kind(kind)?;
    if fields.content.is_none() {
        fields.content = read_stdin()?;
    }

    let mut session = EditSession::compose(kind);
    session.edit(|note| fields.apply(note));
    match session.save(store).await {
        Ok(SaveOutcome::Saved { index, .. }) => Ok(format!(
            "Added {kind} note #{index} ({})\n",
            session.draft().display_title()
        )),
        Ok(SaveOutcome::Unchanged) => bail!("nothing to save; give a title or some content"),
        Err(err) => Err(explain(err, None)),
    }
}

pub async fn edit_note(store: &NoteStore, args: EditArgs) -> Result<String> {
    let EditArgs {
        index,
        fields,
        clear_color,
    } = args;
    if fields.is_empty() && !clear_color {
        bail!("nothing to change; pass at least one field to edit");
    }
    let mut session = EditSession::open(store, index)
        .await
        .map_err(|err| explain(err, Some(index)))?;
    fields.check_kind(session.draft().kind)?;

    session.edit(|note| {
        fields.apply(note);
        if clear_color {
            note.color = None;
        }
    });
    match session.save(store).await {
        Ok(SaveOutcome::Saved { index, .. }) => Ok(format!(
            "Updated note #{index} ({})\n",
            session.draft().display_title()
        )),
        Ok(SaveOutcome::Unchanged) => Ok(format!("Note #{index} already up to date\n")),
        Err(err) => Err(explain(err, Some(index))),
    }
}

pub async fn delete_note(store: &NoteStore, args: DeleteArgs) -> Result<String> {
    let index = args.index;
    if !args.yes {
        let Some(note) = store.get(index).await? else {
            return Err(stale_hint(index));
        };
        let answer = prompt(&format!(
            "Delete note #{index} ({})? [y/N]",
            note.display_title()
        ))?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            return Ok("Kept note\n".into());
        }
    }
    let removed = store
        .delete_note(index)
        .await
        .map_err(|err| explain(err, Some(index)))?;
    Ok(format!(
        "Deleted note #{index} ({}); later notes moved up one position\n",
        removed.display_title()
    ))
}

pub fn palette() -> String {
    let mut out = String::new();
    for color in NoteColor::palette() {
        let _ = writeln!(
            &mut out,
            "{:<7} {}  text {}",
            color.to_string(),
            color.hex(),
            contrast_color(color.hex())
        );
    }
    out
}

fn stale_hint(index: usize) -> anyhow::Error {
    anyhow!(
        "note #{index} may have been changed or removed elsewhere; run `pnotes list` and try again"
    )
}

fn explain(err: NoteStoreError, index: Option<usize>) -> anyhow::Error {
    match (err, index) {
        (NoteStoreError::StaleIndex(_), Some(index)) => stale_hint(index),
        (err @ NoteStoreError::Validation(_), _) => anyhow!(err).context("nothing was saved"),
        (err, _) if err.is_retryable() => {
            anyhow!(err).context("nothing was saved; run the command again to retry")
        }
        (err, _) => anyhow!(err),
    }
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{label} ")?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(Some(buf))
}
