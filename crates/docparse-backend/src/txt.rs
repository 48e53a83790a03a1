//! Plain text parser
//!
//! Decodes with the most confident candidate from [`crate::encoding`], then
//! normalizes whitespace and infers headers and lists heuristically.
//!
//! Header levels:
//! - 1: line underlined with `===`
//! - 2: line underlined with `---`
//! - 3: ALL-CAPS line
//! - 4: short standalone line between blank lines

use crate::encoding::{self, EncodingCandidate};
use crate::traits::{DocumentParser, TxtOptions};
use crate::utils;
use docparse_core::{
    Header, InputFormat, ListBlock, Metadata, ParseError, ParsedDocument, Result, StructureInfo,
    TxtStructure,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// Bullet (`-`, `*`, `+`, `•`) or number (`1.`, `2)`) marker followed by content
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+[.)]|[-*+•])\s+(.+)$").expect("regex is compile-time constant")
});

/// Maximum length of a standalone line treated as a header
const MAX_STANDALONE_HEADER_CHARS: usize = 60;

/// Plain text parser
#[derive(Debug, Clone, Copy, Default)]
pub struct TxtParser {
    options: TxtOptions,
}

impl TxtParser {
    /// Create a parser with the given confidence policy
    #[inline]
    #[must_use]
    pub const fn new(options: TxtOptions) -> Self {
        Self { options }
    }

    /// Confidence policy in use
    #[inline]
    #[must_use]
    pub const fn options(&self) -> &TxtOptions {
        &self.options
    }

    /// Pick and decode with the best candidate, applying the confidence policy
    fn decode(&self, content: &[u8]) -> Result<(String, EncodingCandidate)> {
        let candidate = Self::top_candidate(content)?;

        if candidate.confidence < self.options.hard_confidence_floor {
            return Err(ParseError::Encoding {
                message: format!(
                    "encoding confidence below hard floor {:.2}",
                    self.options.hard_confidence_floor
                ),
                encoding: candidate.name.to_string(),
                confidence: candidate.confidence,
            });
        }
        if candidate.confidence < self.options.soft_confidence_threshold {
            log::warn!(
                "Low confidence ({:.2}) in encoding detection: {}",
                candidate.confidence,
                candidate.name
            );
        }

        let (text, had_errors) = candidate.decode(content);
        if had_errors {
            log::debug!("{} decode replaced malformed sequences", candidate.name);
        }
        Ok((utils::normalize_text(&text), candidate))
    }

    /// Top candidate for non-empty content, or a validation error
    fn top_candidate(content: &[u8]) -> Result<EncodingCandidate> {
        match encoding::best_candidate(content) {
            Some(candidate) if candidate.confidence > 0.0 => Ok(candidate),
            Some(_) => Err(ParseError::validation(
                InputFormat::Txt,
                "content is not decodable as text (binary data)",
            )),
            None => Err(ParseError::validation(InputFormat::Txt, "empty content")),
        }
    }

    fn text_metadata(text: &str, candidate: Option<&EncodingCandidate>) -> Metadata {
        let (name, confidence) = candidate.map_or((TxtStructure::UNKNOWN_ENCODING, 0.0), |c| {
            (c.name, c.confidence)
        });

        let mut metadata = Metadata::new();
        metadata.insert("line_count".to_string(), text.lines().count().into());
        metadata.insert("word_count".to_string(), utils::word_count(text).into());
        metadata.insert("char_count".to_string(), text.chars().count().into());
        metadata.insert(
            "paragraph_count".to_string(),
            utils::paragraph_count(text).into(),
        );
        metadata.insert("encoding".to_string(), name.into());
        metadata.insert(
            "confidence".to_string(),
            serde_json::json!(round_confidence(confidence)),
        );
        metadata
    }
}

/// Round to three decimals so JSON output does not carry f32 noise
fn round_confidence(confidence: f32) -> f64 {
    (f64::from(confidence) * 1000.0).round() / 1000.0
}

impl DocumentParser for TxtParser {
    #[inline]
    fn format(&self) -> InputFormat {
        InputFormat::Txt
    }

    fn validate(&self, content: &[u8]) -> Result<()> {
        Self::top_candidate(content).map(|_| ())
    }

    fn parse(&self, content: &[u8]) -> Result<ParsedDocument> {
        if content.is_empty() {
            return Ok(ParsedDocument::new(
                String::new(),
                StructureInfo::Txt(TxtStructure::unknown()),
                Self::text_metadata("", None),
            ));
        }

        let (text, candidate) = self.decode(content)?;
        let (headers, lists) = infer_structure(&text);
        log::debug!(
            "TXT: {} ({:.2}), {} headers, {} lists",
            candidate.name,
            candidate.confidence,
            headers.len(),
            lists.len()
        );

        let metadata = Self::text_metadata(&text, Some(&candidate));
        let structure = TxtStructure {
            headers,
            lists,
            encoding: candidate.name.to_string(),
            confidence: candidate.confidence,
        };
        Ok(ParsedDocument::new(
            text,
            StructureInfo::Txt(structure),
            metadata,
        ))
    }

    fn extract_metadata(&self, content: &[u8]) -> Result<Metadata> {
        if content.is_empty() {
            return Ok(Self::text_metadata("", None));
        }
        let (text, candidate) = self.decode(content)?;
        Ok(Self::text_metadata(&text, Some(&candidate)))
    }
}

/// Python-style `isupper`: at least one cased character, none lowercase
fn is_all_caps(line: &str) -> bool {
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

/// Underline made of `=` or `-` only; returns the header level it implies
fn underline_level(line: &str) -> Option<u8> {
    let line = line.trim();
    if line.is_empty() || !line.chars().all(|c| c == '=' || c == '-') {
        return None;
    }
    Some(if line.contains('=') { 1 } else { 2 })
}

/// Short line set off by blank lines; rules such as `---` or `***` are not headers
fn is_standalone_header(line: &str, prev_blank: bool, next_blank: bool) -> bool {
    prev_blank
        && next_blank
        && underline_level(line).is_none()
        && line.chars().any(char::is_alphanumeric)
        && line.chars().count() <= MAX_STANDALONE_HEADER_CHARS
        && !line.ends_with(['.', ',', ';', '!', '?'])
}

/// Infer headers and list blocks from normalized text
fn infer_structure(text: &str) -> (Vec<Header>, Vec<ListBlock>) {
    let lines: Vec<&str> = text.lines().collect();
    let mut headers = Vec::new();
    let mut lists: Vec<ListBlock> = Vec::new();
    let mut current_list: Option<ListBlock> = None;
    let mut skip_next = false;

    let is_blank = |idx: Option<usize>| idx.and_then(|i| lines.get(i)).map_or(true, |l| l.trim().is_empty());

    for (i, raw) in lines.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        let line = raw.trim();
        let line_no = i + 1;

        if let Some(caps) = LIST_ITEM.captures(raw) {
            let ordered = caps[1].starts_with(|c: char| c.is_ascii_digit());
            let item = caps[2].trim().to_string();
            match current_list.as_mut() {
                Some(list) if list.ordered == ordered => list.items.push(item),
                _ => {
                    lists.extend(current_list.take());
                    current_list = Some(ListBlock {
                        start_line: line_no,
                        ordered,
                        items: vec![item],
                    });
                }
            }
            continue;
        }
        lists.extend(current_list.take());

        if line.is_empty() {
            continue;
        }

        if let Some(level) = lines.get(i + 1).and_then(|next| underline_level(next)) {
            if underline_level(line).is_none() {
                headers.push(Header {
                    text: line.to_string(),
                    level,
                    line: line_no,
                });
                skip_next = true;
                continue;
            }
        }

        if line.chars().count() > 3 && is_all_caps(line) {
            headers.push(Header {
                text: line.to_string(),
                level: 3,
                line: line_no,
            });
            continue;
        }

        if is_standalone_header(line, is_blank(i.checked_sub(1)), is_blank(Some(i + 1))) {
            headers.push(Header {
                text: line.to_string(),
                level: 4,
                line: line_no,
            });
        }
    }
    lists.extend(current_list);

    (headers, lists)
}
