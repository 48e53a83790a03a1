//! Error types for document parsing operations.
//!
//! Every failure a parser can report is a variant of the closed [`ParseError`]
//! enum. Each variant carries the context needed to log it without re-deriving
//! anything (format, pipeline stage, underlying library error text), and
//! [`ParseError::kind`] gives a `Copy` discriminant for exhaustive branching.
//!
//! # Examples
//!
//! ```rust
//! use docparse_core::{ErrorKind, InputFormat, ParseError};
//!
//! let err = ParseError::validation(InputFormat::Pdf, "missing %PDF- header");
//!
//! match err.kind() {
//!     ErrorKind::Validation => {}
//!     other => panic!("unexpected kind: {other}"),
//! }
//! assert_eq!(err.format(), Some(InputFormat::Pdf));
//! ```

use crate::format::InputFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage at which an error was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Building a parser from configuration
    Configure,
    /// Resolving a format identifier to a parser
    Lookup,
    /// Cheap signature / container check
    Validate,
    /// Opening the container (xref table, zip directory)
    Open,
    /// Checking or applying document encryption
    Decrypt,
    /// Character decoding
    Decode,
    /// Text and structure extraction
    Extract,
    /// Document property extraction
    Metadata,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Configure => "configure",
            Self::Lookup => "lookup",
            Self::Validate => "validate",
            Self::Open => "open",
            Self::Decrypt => "decrypt",
            Self::Decode => "decode",
            Self::Extract => "extract",
            Self::Metadata => "metadata",
        };
        f.write_str(s)
    }
}

/// Discriminant of a [`ParseError`], for branching without string matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No parser is registered for the format identifier
    UnsupportedFormat,
    /// Bytes do not carry the expected signature or markers
    Validation,
    /// Text decoding failed or confidence is below the hard floor
    Encoding,
    /// PDF needs a password that was not supplied or was rejected
    PdfEncrypted,
    /// PDF container structure is unreadable
    PdfDamaged,
    /// DOCX package or its XML is unreadable
    DocxCorrupted,
    /// Any other unrecoverable parsing failure
    DocumentParsing,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::Validation => "validation",
            Self::Encoding => "encoding",
            Self::PdfEncrypted => "pdf_encrypted",
            Self::PdfDamaged => "pdf_damaged",
            Self::DocxCorrupted => "docx_corrupted",
            Self::DocumentParsing => "document_parsing",
        };
        f.write_str(s)
    }
}

/// Error types that can occur while parsing a document.
///
/// Validation failures and container corruption are deterministic for a given
/// input; parsers never retry them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Format identifier not recognised by the factory.
    ///
    /// Raised before any format-specific parser is reached.
    #[error("Unsupported format: '{identifier}'")]
    UnsupportedFormat {
        /// Identifier as supplied by the caller
        identifier: String,
    },

    /// Content does not match the container signature of the requested format.
    #[error("Validation error ({format}): {message}")]
    Validation {
        /// Format the content was validated against
        format: InputFormat,
        /// Human-readable description
        message: String,
        /// Offending byte offset, when one can be named
        offset: Option<usize>,
    },

    /// Text could not be decoded with enough confidence.
    #[error("Encoding error: {message} (best guess {encoding}, confidence {confidence:.2})")]
    Encoding {
        /// Human-readable description
        message: String,
        /// Best candidate encoding label
        encoding: String,
        /// Confidence of the best candidate
        confidence: f32,
    },

    /// Password-protected PDF without a usable password.
    #[error("Encrypted PDF: {message}")]
    PdfEncrypted {
        /// Human-readable description
        message: String,
        /// Whether a password was supplied (and rejected)
        password_supplied: bool,
    },

    /// PDF cross-reference table or object graph is unreadable.
    #[error("Damaged PDF: {message}: {cause}")]
    PdfDamaged {
        /// Human-readable description
        message: String,
        /// Underlying library error text
        cause: String,
    },

    /// DOCX archive or its main XML part is unreadable.
    #[error("Corrupted DOCX ({stage}): {message}: {cause}")]
    DocxCorrupted {
        /// Stage that detected the corruption
        stage: Stage,
        /// Human-readable description
        message: String,
        /// Underlying library error text
        cause: String,
    },

    /// Any other unrecoverable failure.
    #[error("Document parsing error ({format}, {stage}): {message}: {cause}")]
    Parsing {
        /// Format being parsed
        format: InputFormat,
        /// Stage that failed
        stage: Stage,
        /// Human-readable description
        message: String,
        /// Underlying cause text
        cause: String,
    },
}

impl ParseError {
    /// Validation failure without a specific offset
    #[must_use]
    pub fn validation(format: InputFormat, message: impl Into<String>) -> Self {
        Self::Validation {
            format,
            message: message.into(),
            offset: None,
        }
    }

    /// Validation failure at a specific byte offset
    #[must_use]
    pub fn validation_at(format: InputFormat, message: impl Into<String>, offset: usize) -> Self {
        Self::Validation {
            format,
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Damaged PDF container
    #[must_use]
    pub fn pdf_damaged(message: impl Into<String>, cause: impl ToString) -> Self {
        Self::PdfDamaged {
            message: message.into(),
            cause: cause.to_string(),
        }
    }

    /// Corrupted DOCX package
    #[must_use]
    pub fn docx_corrupted(stage: Stage, message: impl Into<String>, cause: impl ToString) -> Self {
        Self::DocxCorrupted {
            stage,
            message: message.into(),
            cause: cause.to_string(),
        }
    }

    /// Generic parsing failure
    #[must_use]
    pub fn parsing(
        format: InputFormat,
        stage: Stage,
        message: impl Into<String>,
        cause: impl ToString,
    ) -> Self {
        Self::Parsing {
            format,
            stage,
            message: message.into(),
            cause: cause.to_string(),
        }
    }

    /// Kind discriminant
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Encoding { .. } => ErrorKind::Encoding,
            Self::PdfEncrypted { .. } => ErrorKind::PdfEncrypted,
            Self::PdfDamaged { .. } => ErrorKind::PdfDamaged,
            Self::DocxCorrupted { .. } => ErrorKind::DocxCorrupted,
            Self::Parsing { .. } => ErrorKind::DocumentParsing,
        }
    }

    /// Format the error relates to, if a format-specific parser was reached
    #[must_use]
    pub const fn format(&self) -> Option<InputFormat> {
        match self {
            Self::UnsupportedFormat { .. } => None,
            Self::Validation { format, .. } | Self::Parsing { format, .. } => Some(*format),
            Self::Encoding { .. } => Some(InputFormat::Txt),
            Self::PdfEncrypted { .. } | Self::PdfDamaged { .. } => Some(InputFormat::Pdf),
            Self::DocxCorrupted { .. } => Some(InputFormat::Docx),
        }
    }

    /// Stage at which the error was detected
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::UnsupportedFormat { .. } => Stage::Lookup,
            Self::Validation { .. } => Stage::Validate,
            Self::Encoding { .. } => Stage::Decode,
            Self::PdfEncrypted { .. } => Stage::Decrypt,
            Self::PdfDamaged { .. } => Stage::Open,
            Self::DocxCorrupted { stage, .. } | Self::Parsing { stage, .. } => *stage,
        }
    }

    /// Underlying library error text, when the error wraps one
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::PdfDamaged { cause, .. }
            | Self::DocxCorrupted { cause, .. }
            | Self::Parsing { cause, .. } => Some(cause.as_str()),
            _ => None,
        }
    }
}

/// Type alias for [`Result<T, ParseError>`].
pub type Result<T> = std::result::Result<T, ParseError>;
