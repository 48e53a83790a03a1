//! # docparse-core
//!
//! Data model and error taxonomy shared by the docparse format parsers.
//!
//! Parsers live in `docparse-backend`; this crate only defines what they
//! return ([`ParsedDocument`]) and how they fail ([`ParseError`]).
//!
//! ```rust
//! use docparse_core::{ErrorKind, InputFormat, ParseError};
//!
//! let format: InputFormat = "DOCX".parse().unwrap();
//! assert_eq!(format.identifier(), "docx");
//!
//! let err = ParseError::UnsupportedFormat { identifier: "rtf".to_string() };
//! assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
//! ```

pub mod document;
pub mod error;
pub mod format;

pub use document::{
    DocxStructure, Header, Heading, ListBlock, Metadata, Orientation, OutlineEntry, Page,
    ParsedDocument, PdfStructure, Section, StructureInfo, Table, TxtStructure,
};
pub use error::{ErrorKind, ParseError, Result, Stage};
pub use format::InputFormat;
