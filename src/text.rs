use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::note::Note;

const LUMINANCE_THRESHOLD: f64 = 186.0;
const BRIGHTNESS_THRESHOLD: f64 = 150.0;

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| case_insensitive(r"(?s)<script\b.*?</script>"));
static STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| case_insensitive(r"(?s)<style\b.*?</style>"));
static BLOCK_CLOSE: Lazy<Regex> = Lazy::new(|| case_insensitive(r"</(p|div|li|br|h[1-6])>"));
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| case_insensitive(r"<li>"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| case_insensitive(r"<[^>]*>"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| case_insensitive(r"\n{3,}"));

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid html stripping pattern")
}

fn parse_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&expanded[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Black or white text for a card with the given background, by luminance.
pub fn contrast_color(background: &str) -> &'static str {
    let Some((r, g, b)) = parse_rgb(background) else {
        return "#000";
    };
    let luminance = f64::from(r) * 0.299 + f64::from(g) * 0.587 + f64::from(b) * 0.114;
    if luminance > LUMINANCE_THRESHOLD {
        "#000"
    } else {
        "#fff"
    }
}

/// Sidebar variant with the perceived-brightness formula and long-form output.
pub fn contrasting_text_color(background: &str) -> &'static str {
    if background.is_empty() {
        return "#000";
    }
    let Some((r, g, b)) = parse_rgb(background) else {
        return "#000";
    };
    let brightness =
        (f64::from(r) * 299.0 + f64::from(g) * 587.0 + f64::from(b) * 114.0) / 1000.0;
    if brightness > BRIGHTNESS_THRESHOLD {
        "#000000"
    } else {
        "#FFFFFF"
    }
}

/// Plain-text rendition of rich note content.
pub fn strip_html_tags(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = SCRIPT_BLOCK.replace_all(html, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = BLOCK_CLOSE.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "• ");
    let text = ANY_TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    BLANK_RUN.replace_all(&text, "\n\n").trim().to_string()
}

pub fn format_last_edited(last_edited: Option<i64>) -> String {
    let Some(millis) = last_edited else {
        return String::new();
    };
    let format = format_description!(
        "[month repr:short] [day padding:none], [year], [hour repr:12]:[minute] [period]"
    );
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|stamp| stamp.format(format).ok())
        .unwrap_or_default()
}

/// Single-line excerpt of a note's content for list cards.
pub fn preview_snippet(note: &Note, max_chars: usize) -> Option<String> {
    if max_chars == 0 {
        return None;
    }
    let plain = strip_html_tags(&note.content);
    let joined = plain
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        return None;
    }
    let mut snippet: String = joined.chars().take(max_chars).collect();
    if joined.chars().count() > max_chars {
        snippet.push('…');
    }
    Some(snippet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contrast_color_picks_readable_text() {
        assert_eq!(contrast_color("#000000"), "#fff");
        assert_eq!(contrast_color("#ffffff"), "#000");
        assert_eq!(contrast_color("#fff"), "#000");
        assert_eq!(contrast_color("#dbeafe"), "#000");
        assert_eq!(contrast_color("not a color"), "#000");
    }

    #[test]
    fn contrasting_text_color_uses_brightness() {
        assert_eq!(contrasting_text_color(""), "#000");
        assert_eq!(contrasting_text_color("#101010"), "#FFFFFF");
        assert_eq!(contrasting_text_color("#e9d5ff"), "#000000");
    }

    #[test]
    fn contrasting_text_color_keeps_fractional_brightness() {
        // 150.299 is over the threshold; 149.701 is not.
        assert_eq!(contrasting_text_color("#979696"), "#000000");
        assert_eq!(contrasting_text_color("#959696"), "#FFFFFF");
    }

    #[test]
    fn strips_markup_and_decodes_entities() {
        let html = "<style>p{}</style><h1>Title</h1><p>Fish &amp; chips&nbsp;today</p>\
                    <ul><li>one</li><li>two</li></ul><script>alert(1)</script>";
        assert_eq!(
            strip_html_tags(html),
            "Title\nFish & chips today\n• one\n• two"
        );
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(strip_html_tags("<p>a</p><p></p><p></p><p>b</p>"), "a\n\nb");
    }

    #[test]
    fn formats_last_edited_in_utc() {
        assert_eq!(format_last_edited(None), "");
        assert_eq!(
            format_last_edited(Some(1_700_000_000_000)),
            "Nov 14, 2023, 10:13 PM"
        );
        assert_eq!(
            format_last_edited(Some(1_699_000_000_000)),
            "Nov 3, 2023, 08:26 AM"
        );
    }

    #[test]
    fn snippet_truncates_plain_text() {
        let note = Note::free("t", "<p>first line</p><p>second line</p>");
        assert_eq!(
            preview_snippet(&note, 10).as_deref(),
            Some("first line…")
        );
        assert_eq!(
            preview_snippet(&note, 80).as_deref(),
            Some("first line second line")
        );
        assert_eq!(preview_snippet(&Note::free("t", ""), 10), None);
    }
}
