//! Core document types
//!
//! This module defines [`ParsedDocument`], the normalized result every parser
//! returns, and the per-format [`StructureInfo`] variants.

use crate::format::InputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Best-effort document properties.
///
/// Keys are ordered so identical input always serializes to identical JSON.
/// Missing properties are absent, never null-filled.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Normalized output of a successful parse.
///
/// The source format is not stored separately; it is derived from the
/// structure variant so the two can never disagree.
///
/// # Examples
///
/// ```rust
/// use docparse_core::{InputFormat, ParsedDocument, StructureInfo, TxtStructure};
///
/// let doc = ParsedDocument::new(
///     "hello".to_string(),
///     StructureInfo::Txt(TxtStructure::unknown()),
///     Default::default(),
/// );
///
/// assert_eq!(doc.format(), InputFormat::Txt);
/// assert!(doc.metadata.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Full extracted text, normalized
    pub text: String,

    /// Format-specific structural breakdown
    pub structure: StructureInfo,

    /// Document properties
    pub metadata: Metadata,
}

impl ParsedDocument {
    /// Create a new parsed document
    #[inline]
    #[must_use = "creates a new document which should be used"]
    pub const fn new(text: String, structure: StructureInfo, metadata: Metadata) -> Self {
        Self {
            text,
            structure,
            metadata,
        }
    }

    /// Format that produced this document
    #[inline]
    #[must_use]
    pub const fn format(&self) -> InputFormat {
        self.structure.format()
    }

    /// Whether any text was extracted
    #[inline]
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Format-specific structure, tagged by `"format"` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum StructureInfo {
    /// Pages and outline of a PDF
    Pdf(PdfStructure),
    /// Headings, tables and sections of a DOCX body
    Docx(DocxStructure),
    /// Inferred headers, lists and encoding of plain text
    Txt(TxtStructure),
}

impl StructureInfo {
    /// Format this structure belongs to
    #[inline]
    #[must_use]
    pub const fn format(&self) -> InputFormat {
        match self {
            Self::Pdf(_) => InputFormat::Pdf,
            Self::Docx(_) => InputFormat::Docx,
            Self::Txt(_) => InputFormat::Txt,
        }
    }

    /// PDF structure, if this is one
    #[must_use]
    pub const fn as_pdf(&self) -> Option<&PdfStructure> {
        match self {
            Self::Pdf(s) => Some(s),
            _ => None,
        }
    }

    /// DOCX structure, if this is one
    #[must_use]
    pub const fn as_docx(&self) -> Option<&DocxStructure> {
        match self {
            Self::Docx(s) => Some(s),
            _ => None,
        }
    }

    /// TXT structure, if this is one
    #[must_use]
    pub const fn as_txt(&self) -> Option<&TxtStructure> {
        match self {
            Self::Txt(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// PDF
// ============================================================================

/// PDF page tree and outline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfStructure {
    /// Pages in page order
    pub pages: Vec<Page>,

    /// Flattened bookmark tree in document order, if the PDF has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<OutlineEntry>>,
}

impl PdfStructure {
    /// Pages whose text could not be extracted
    #[must_use]
    pub fn pages_without_text(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| !p.text_extracted)
            .map(|p| p.number)
            .collect()
    }
}

/// A single PDF page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed page number
    pub number: u32,

    /// (width, height) in points
    pub size: (f32, f32),

    /// Clockwise rotation in degrees
    #[serde(default)]
    pub rotation: i64,

    /// Whether the page content decoded; false means the page contributed no text
    pub text_extracted: bool,
}

/// A flattened bookmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Bookmark title
    pub title: String,

    /// 1-indexed target page, when the destination resolves to one
    pub page: Option<u32>,

    /// Nesting depth (0 = top level)
    pub level: u8,
}

// ============================================================================
// DOCX
// ============================================================================

/// Headings, tables and sections of a DOCX body.
///
/// `block_index` on headings and tables is the position among top-level body
/// blocks (paragraphs and tables), so the two sequences can be interleaved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocxStructure {
    /// Headings in document order
    pub headings: Vec<Heading>,

    /// Tables in document order
    pub tables: Vec<Table>,

    /// Sections in document order
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A paragraph carrying a heading style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level (1 = top)
    pub level: u8,
    /// Heading text
    pub text: String,
    /// Position among top-level body blocks
    pub block_index: usize,
}

/// Table dimensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: u32,
    pub cols: u32,
    /// Position among top-level body blocks (nested tables share their parent's)
    pub block_index: usize,
}

/// Page orientation of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// A document section (`w:sectPr`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// 1-indexed section number
    pub number: u32,
    /// Page width in points
    pub page_width: Option<u32>,
    /// Page height in points
    pub page_height: Option<u32>,
    pub orientation: Orientation,
}

// ============================================================================
// TXT
// ============================================================================

/// Heuristic structure of plain text plus the inferred encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxtStructure {
    /// Header-like lines in order
    pub headers: Vec<Header>,

    /// List-like blocks in order
    #[serde(default)]
    pub lists: Vec<ListBlock>,

    /// Selected encoding label, or "unknown" for empty input
    pub encoding: String,

    /// Confidence of the selected encoding in [0.0, 1.0]
    pub confidence: f32,
}

impl TxtStructure {
    /// Label reported when no encoding could be inferred
    pub const UNKNOWN_ENCODING: &'static str = "unknown";

    /// Structure for empty input
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            headers: Vec::new(),
            lists: Vec::new(),
            encoding: Self::UNKNOWN_ENCODING.to_string(),
            confidence: 0.0,
        }
    }
}

/// A header-like line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub text: String,
    /// 1 = `===` underline, 2 = `---` underline, 3 = ALL-CAPS, 4 = short standalone line
    pub level: u8,
    /// 1-indexed line number in the normalized text
    pub line: usize,
}

/// Consecutive lines starting with a bullet or number marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlock {
    /// 1-indexed line of the first item
    pub start_line: usize,
    /// Numbered (`1.`, `2)`) rather than bulleted
    pub ordered: bool,
    /// Item text with the marker removed
    pub items: Vec<String>,
}
