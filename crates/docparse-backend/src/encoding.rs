//! Statistical character encoding inference.
//!
//! Produces a ranked list of candidate encodings for a byte buffer, each with
//! a confidence in `[0.0, 1.0]`:
//! - BOM (UTF-8, UTF-16 LE/BE): 1.0
//! - strict UTF-8 validity: 1.0 for pure ASCII, 0.99 otherwise
//! - UTF-16 without BOM, from the null-byte pattern
//! - the `chardetng` guess, scaled by how cleanly it decodes
//! - a windows-1252 fallback
//!
//! Legacy (non-Unicode) candidates never exceed 0.99. Binary-looking input
//! (NUL bytes outside a UTF-16 pattern) gets a single candidate with
//! confidence 0.0.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// UTF-8 BOM: EF BB BF
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
/// UTF-16 LE BOM: FF FE
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
/// UTF-16 BE BOM: FE FF
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Label reported for pure 7-bit input
pub const ASCII_LABEL: &str = "ASCII";

/// Upper bound for statistically inferred candidates
const LEGACY_CAP: f32 = 0.99;
const CONFIDENT_GUESS_WEIGHT: f32 = 0.99;
const UNCONFIDENT_GUESS_WEIGHT: f32 = 0.6;
const FALLBACK_WEIGHT: f32 = 0.4;
const UTF16_PATTERN_WEIGHT: f32 = 0.95;

/// A candidate encoding with its confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingCandidate {
    /// Decoder to use
    pub encoding: &'static Encoding,

    /// Reported label (`encoding_rs` name, or "ASCII")
    pub name: &'static str,

    /// Confidence in `[0.0, 1.0]`
    pub confidence: f32,

    bom_len: usize,
}

impl EncodingCandidate {
    fn new(encoding: &'static Encoding, confidence: f32) -> Self {
        Self {
            encoding,
            name: encoding.name(),
            confidence: confidence.clamp(0.0, 1.0),
            bom_len: 0,
        }
    }

    fn with_bom(encoding: &'static Encoding, bom_len: usize) -> Self {
        Self {
            bom_len,
            ..Self::new(encoding, 1.0)
        }
    }

    /// Decode `buffer` with this candidate
    ///
    /// Returns the decoded text and whether malformed sequences were replaced
    /// with U+FFFD.
    #[must_use]
    pub fn decode(&self, buffer: &[u8]) -> (String, bool) {
        let data = buffer.get(self.bom_len..).unwrap_or_default();
        let (text, had_errors) = self.encoding.decode_without_bom_handling(data);
        (text.into_owned(), had_errors)
    }
}

/// Rank candidate encodings for `buffer`, most confident first
///
/// Returns an empty list for empty input.
#[must_use]
pub fn rank_candidates(buffer: &[u8]) -> Vec<EncodingCandidate> {
    if buffer.is_empty() {
        return Vec::new();
    }

    if let Some(candidate) = detect_bom(buffer) {
        return vec![candidate];
    }

    if has_suspicious_null_bytes(buffer) {
        log::debug!("NUL bytes outside a UTF-16 pattern; treating input as binary");
        return vec![EncodingCandidate::new(WINDOWS_1252, 0.0)];
    }

    let mut candidates = Vec::with_capacity(3);

    if let Some(encoding) = detect_utf16_without_bom(buffer) {
        let candidate = EncodingCandidate::new(encoding, 0.0);
        let quality = decode_quality(&candidate, buffer);
        candidates.push(EncodingCandidate::new(
            encoding,
            (UTF16_PATTERN_WEIGHT * quality).min(LEGACY_CAP),
        ));
    } else if std::str::from_utf8(buffer).is_ok() {
        if buffer.is_ascii() {
            candidates.push(EncodingCandidate {
                name: ASCII_LABEL,
                ..EncodingCandidate::new(UTF_8, 1.0)
            });
        } else {
            candidates.push(EncodingCandidate::new(UTF_8, 0.99));
        }
    } else {
        let mut detector = EncodingDetector::new();
        detector.feed(buffer, true);
        let (encoding, confident) = detector.guess_assess(None, false);
        let weight = if confident {
            CONFIDENT_GUESS_WEIGHT
        } else {
            UNCONFIDENT_GUESS_WEIGHT
        };
        let quality = decode_quality(&EncodingCandidate::new(encoding, 0.0), buffer);
        log::debug!(
            "chardetng guessed {} (confident: {confident}, quality: {quality:.3})",
            encoding.name()
        );
        candidates.push(EncodingCandidate::new(
            encoding,
            (weight * quality).min(LEGACY_CAP),
        ));
    }

    if !candidates.iter().any(|c| c.encoding == WINDOWS_1252) {
        let quality = decode_quality(&EncodingCandidate::new(WINDOWS_1252, 0.0), buffer);
        candidates.push(EncodingCandidate::new(
            WINDOWS_1252,
            (FALLBACK_WEIGHT * quality).min(LEGACY_CAP),
        ));
    }

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates
}

/// Most confident candidate, or `None` for empty input
#[must_use]
pub fn best_candidate(buffer: &[u8]) -> Option<EncodingCandidate> {
    rank_candidates(buffer).into_iter().next()
}

/// Detect encoding from BOM (Byte Order Mark)
fn detect_bom(buffer: &[u8]) -> Option<EncodingCandidate> {
    if buffer.starts_with(UTF8_BOM) {
        return Some(EncodingCandidate::with_bom(UTF_8, UTF8_BOM.len()));
    }
    if buffer.starts_with(UTF16_LE_BOM) {
        return Some(EncodingCandidate::with_bom(UTF_16LE, UTF16_LE_BOM.len()));
    }
    if buffer.starts_with(UTF16_BE_BOM) {
        return Some(EncodingCandidate::with_bom(UTF_16BE, UTF16_BE_BOM.len()));
    }
    None
}

/// Null counts at (odd, even) byte positions and the number of byte pairs
fn null_pattern(buffer: &[u8]) -> (usize, usize, usize) {
    let nulls_at_odd = buffer
        .iter()
        .skip(1)
        .step_by(2)
        .filter(|&&b| b == 0)
        .count();
    let nulls_at_even = buffer.iter().step_by(2).filter(|&&b| b == 0).count();
    (nulls_at_odd, nulls_at_even, buffer.len() / 2)
}

/// Detect UTF-16 without BOM by looking at null byte patterns.
///
/// ASCII text in UTF-16 has a null in every other byte.
fn detect_utf16_without_bom(buffer: &[u8]) -> Option<&'static Encoding> {
    if buffer.len() < 4 {
        return None;
    }
    let (odd, even, pairs) = null_pattern(buffer);
    if pairs > 4 && odd > pairs * 3 / 4 && even < pairs / 4 {
        return Some(UTF_16LE);
    }
    if pairs > 4 && even > pairs * 3 / 4 && odd < pairs / 4 {
        return Some(UTF_16BE);
    }
    None
}

/// Null bytes that do not follow a UTF-16 pattern mark binary content
fn has_suspicious_null_bytes(buffer: &[u8]) -> bool {
    if !buffer.contains(&0) {
        return false;
    }
    detect_utf16_without_bom(buffer).is_none()
}

/// How cleanly a candidate decodes `buffer`, in `[0.0, 1.0]`
///
/// Printable ratio times the share of non-replacement characters, halved when
/// the decoder reported malformed sequences.
fn decode_quality(candidate: &EncodingCandidate, buffer: &[u8]) -> f32 {
    let (text, had_errors) = candidate.decode(buffer);
    let (printable, replacement, total) = char_stats(&text);
    if total == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let (printable_ratio, replacement_ratio) = (
        printable as f32 / total as f32,
        replacement as f32 / total as f32,
    );

    let mut quality = printable_ratio * (1.0 - replacement_ratio);
    if had_errors {
        quality *= 0.5;
    }
    quality.clamp(0.0, 1.0)
}

/// Count (printable, replacement, total) characters
fn char_stats(text: &str) -> (usize, usize, usize) {
    let mut printable = 0;
    let mut replacement = 0;
    let mut total = 0;
    for c in text.chars() {
        total += 1;
        if c == '\u{FFFD}' {
            replacement += 1;
        } else if c.is_ascii_graphic() || c.is_ascii_whitespace() || (!c.is_ascii() && !c.is_control()) {
            printable += 1;
        }
    }
    (printable, replacement, total)
}
