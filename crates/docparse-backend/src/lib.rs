//! Format parsers for docparse
//!
//! This crate turns raw document bytes into a [`ParsedDocument`]: plain text,
//! format-specific structure and a metadata map. Every parser implements the
//! [`DocumentParser`] trait and holds no per-document state.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ParserFactory                         │
//! │   (identifier "pdf" | "docx" | "txt"  ->  Parser variant)    │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     DocumentParser Trait                     │
//! │  fn validate(&self, content: &[u8]) -> Result<()>            │
//! │  fn parse(&self, content: &[u8]) -> Result<ParsedDocument>   │
//! │  fn extract_metadata(&self, content: &[u8]) -> Result<Meta>  │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!        ┌──────────────────────┼──────────────────────┐
//!        ▼                      ▼                      ▼
//! ┌─────────────┐        ┌─────────────┐        ┌─────────────┐
//! │  PdfParser  │        │ DocxParser  │        │  TxtParser  │
//! │   (lopdf)   │        │ (zip + xml) │        │ (chardetng) │
//! └─────────────┘        └─────────────┘        └─────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use docparse_backend::{DocumentParser, ParserFactory};
//!
//! let factory = ParserFactory::default();
//! let parser = factory.create("txt").unwrap();
//! let doc = parser.parse(b"INTRODUCTION\n\nHello  world.\r\n").unwrap();
//!
//! assert_eq!(doc.text, "INTRODUCTION\n\nHello world.");
//! let txt = doc.structure.as_txt().unwrap();
//! assert_eq!(txt.headers[0].text, "INTRODUCTION");
//! ```
//!
//! # Concurrency
//!
//! Parsing is synchronous and CPU-bound. Parsers are `Send + Sync` and can be
//! shared across worker threads; cancellation is left to the caller.
//!
//! # Memory
//!
//! TXT and DOCX hold the input plus the decoded text. PDF parsing loads the
//! whole object graph through `lopdf`, so peak memory is roughly the size of
//! the decompressed objects plus the extracted text, which is built page by
//! page.

pub mod docx;
pub mod encoding;
pub mod factory;
pub mod pdf;
pub mod traits;
pub mod txt;
pub mod utils;

pub use docx::DocxParser;
pub use encoding::{best_candidate, rank_candidates, EncodingCandidate};
pub use factory::{Parser, ParserConstructor, ParserFactory};
pub use pdf::PdfParser;
pub use traits::{
    DocumentParser, ParserConfig, TxtOptions, DEFAULT_HARD_CONFIDENCE_FLOOR,
    DEFAULT_SOFT_CONFIDENCE_THRESHOLD,
};
pub use txt::TxtParser;

pub use docparse_core::{InputFormat, Metadata, ParseError, ParsedDocument, Result};
