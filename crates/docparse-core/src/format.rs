//! Input format identifiers
//!
//! This module defines the `InputFormat` enum, the closed set of container
//! formats a parser can be selected for.

use serde::{Deserialize, Serialize};

/// Input document format
///
/// Identifiers are matched case-insensitively: `"pdf"`, `"docx"`, `"txt"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text (.txt)
    Txt,
}

impl InputFormat {
    /// All supported formats, in registration order
    pub const ALL: [Self; 3] = [Self::Pdf, Self::Docx, Self::Txt];

    /// Detect format from file extension
    ///
    /// A leading dot is tolerated (`".PDF"`). Returns `None` for anything
    /// outside the supported set.
    #[inline]
    #[must_use = "detects format from file extension"]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        ext.parse().ok()
    }

    /// Get file extensions associated with this format
    #[inline]
    #[must_use = "returns file extensions for this format"]
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["pdf"],
            Self::Docx => &["docx"],
            Self::Txt => &["txt"],
        }
    }

    /// Lowercase identifier as accepted by the parser factory
    #[inline]
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl std::fmt::Display for InputFormat {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Txt => "TXT",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            _ => Err(format!("unknown input format: '{s}'")),
        }
    }
}
