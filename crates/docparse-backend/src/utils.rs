//! Text normalization helpers shared by the parsers

use once_cell::sync::Lazy;
use regex::Regex;

/// Two or more spaces
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("valid regex"));

/// Three or more newlines
static MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Word tokens (Unicode-aware)
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Byte order mark as decoded into text
pub const BOM_CHAR: char = '\u{FEFF}';

/// Convert CRLF and lone CR to LF
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Full text normalization
///
/// Drops a leading BOM, collapses runs of spaces, converts line endings to LF,
/// collapses three or more newlines into a single blank line and trims.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let text = text.strip_prefix(BOM_CHAR).unwrap_or(text);
    let text = MULTI_SPACE.replace_all(text, " ");
    let text = normalize_line_endings(&text);
    let text = MULTI_NEWLINE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Count Unicode word tokens
#[must_use]
pub fn word_count(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Count blank-line separated paragraphs
#[must_use]
pub fn paragraph_count(text: &str) -> usize {
    text.split("\n\n").filter(|p| !p.trim().is_empty()).count()
}
