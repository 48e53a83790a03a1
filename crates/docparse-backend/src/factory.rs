//! Parser selection
//!
//! [`Parser`] is the closed set of format parsers behind the
//! [`DocumentParser`] contract. [`ParserFactory`] maps a format identifier to
//! a constructor; it never looks at document bytes.

use crate::docx::DocxParser;
use crate::pdf::PdfParser;
use crate::traits::{DocumentParser, ParserConfig};
use crate::txt::TxtParser;
use docparse_core::{InputFormat, Metadata, ParseError, ParsedDocument, Result};
use std::collections::HashMap;
use std::path::Path;

/// One of the supported format parsers
#[derive(Debug, Clone)]
pub enum Parser {
    /// PDF parser
    Pdf(PdfParser),
    /// DOCX parser
    Docx(DocxParser),
    /// Plain text parser
    Txt(TxtParser),
}

impl Parser {
    fn inner(&self) -> &dyn DocumentParser {
        match self {
            Self::Pdf(parser) => parser,
            Self::Docx(parser) => parser,
            Self::Txt(parser) => parser,
        }
    }
}

impl DocumentParser for Parser {
    #[inline]
    fn format(&self) -> InputFormat {
        self.inner().format()
    }

    #[inline]
    fn validate(&self, content: &[u8]) -> Result<()> {
        self.inner().validate(content)
    }

    #[inline]
    fn parse(&self, content: &[u8]) -> Result<ParsedDocument> {
        self.inner().parse(content)
    }

    #[inline]
    fn extract_metadata(&self, content: &[u8]) -> Result<Metadata> {
        self.inner().extract_metadata(content)
    }
}

/// Builds a parser from the shared configuration
pub type ParserConstructor = fn(&ParserConfig) -> Parser;

fn build_pdf(config: &ParserConfig) -> Parser {
    Parser::Pdf(PdfParser::new(config.password.clone(), config.max_pages))
}

fn build_docx(_config: &ParserConfig) -> Parser {
    Parser::Docx(DocxParser::new())
}

fn build_txt(config: &ParserConfig) -> Parser {
    Parser::Txt(TxtParser::new(config.txt))
}

/// Identifier-driven parser lookup
///
/// The registry is fixed at construction and never mutated afterwards, so a
/// factory can be shared freely between threads.
///
/// ```rust
/// use docparse_backend::{DocumentParser, ParserFactory};
/// use docparse_core::{ErrorKind, InputFormat};
///
/// let factory = ParserFactory::default();
/// let parser = factory.create("TXT").unwrap();
/// assert_eq!(parser.format(), InputFormat::Txt);
///
/// let err = factory.create("rtf").unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
/// ```
#[derive(Debug, Clone)]
pub struct ParserFactory {
    config: ParserConfig,
    registry: HashMap<InputFormat, ParserConstructor>,
}

impl ParserFactory {
    /// Create a factory after validating the configuration
    ///
    /// # Errors
    /// Returns a configuration error if the TXT thresholds are invalid.
    pub fn new(config: ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Self::default_registry(),
        })
    }

    fn default_registry() -> HashMap<InputFormat, ParserConstructor> {
        let mut registry: HashMap<InputFormat, ParserConstructor> = HashMap::new();
        registry.insert(InputFormat::Pdf, build_pdf);
        registry.insert(InputFormat::Docx, build_docx);
        registry.insert(InputFormat::Txt, build_txt);
        registry
    }

    /// Configuration handed to every parser
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Create a parser for a format identifier (`"pdf"`, `"docx"`, `"txt"`, any case)
    ///
    /// # Errors
    /// Returns [`ParseError::UnsupportedFormat`] for any other identifier.
    pub fn create(&self, identifier: &str) -> Result<Parser> {
        let format = identifier
            .trim()
            .parse::<InputFormat>()
            .map_err(|_| ParseError::UnsupportedFormat {
                identifier: identifier.to_string(),
            })?;
        self.create_for_format(format)
    }

    /// Create a parser for an already-resolved format
    ///
    /// # Errors
    /// Returns [`ParseError::UnsupportedFormat`] if no constructor is registered.
    pub fn create_for_format(&self, format: InputFormat) -> Result<Parser> {
        let constructor =
            self.registry
                .get(&format)
                .ok_or_else(|| ParseError::UnsupportedFormat {
                    identifier: format.identifier().to_string(),
                })?;
        log::debug!("Selected {format} parser");
        Ok(constructor(&self.config))
    }

    /// Create a parser from a path's extension
    ///
    /// Only the path string is inspected; the file is never opened.
    ///
    /// # Errors
    /// Returns [`ParseError::UnsupportedFormat`] if the extension is missing or unknown.
    pub fn create_for_path(&self, path: &Path) -> Result<Parser> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ParseError::UnsupportedFormat {
                identifier: path.display().to_string(),
            })?;
        self.create(ext)
    }

    /// Registered format identifiers in a stable order
    #[must_use]
    pub fn supported_formats(&self) -> Vec<InputFormat> {
        let mut formats: Vec<InputFormat> = self.registry.keys().copied().collect();
        formats.sort();
        formats
    }
}

impl Default for ParserFactory {
    #[inline]
    fn default() -> Self {
        Self {
            config: ParserConfig::default(),
            registry: Self::default_registry(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TxtOptions;
    use docparse_core::{ErrorKind, Stage};

    #[test]
    fn test_create_is_case_insensitive() {
        let factory = ParserFactory::default();
        for (id, format) in [
            ("pdf", InputFormat::Pdf),
            ("PDF", InputFormat::Pdf),
            ("Docx", InputFormat::Docx),
            ("txt", InputFormat::Txt),
        ] {
            let parser = factory.create(id).unwrap();
            assert_eq!(parser.format(), format);
            assert!(parser.can_handle(format));
        }
    }

    #[test]
    fn test_unknown_identifier_is_unsupported() {
        let factory = ParserFactory::default();
        let err = factory.create("rtf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(err.stage(), Stage::Lookup);
        assert!(err.format().is_none());
        assert!(err.to_string().contains("rtf"));

        assert!(factory.create("").is_err());
    }

    #[test]
    fn test_create_for_path() {
        let factory = ParserFactory::default();
        let parser = factory.create_for_path(Path::new("cv/resume.DOCX")).unwrap();
        assert_eq!(parser.format(), InputFormat::Docx);

        let err = factory.create_for_path(Path::new("notes")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

        let err = factory.create_for_path(Path::new("slides.pptx")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_supported_formats() {
        let factory = ParserFactory::default();
        assert_eq!(
            factory.supported_formats(),
            vec![InputFormat::Pdf, InputFormat::Docx, InputFormat::Txt]
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ParserConfig {
            txt: TxtOptions {
                soft_confidence_threshold: 0.2,
                hard_confidence_floor: 0.4,
            },
            ..ParserConfig::default()
        };
        let err = ParserFactory::new(config).unwrap_err();
        assert_eq!(err.stage(), Stage::Configure);
    }

    #[test]
    fn test_config_reaches_parsers() {
        let config = ParserConfig::default()
            .with_password("pw")
            .with_max_pages(Some(2))
            .with_txt_options(TxtOptions::default().with_soft_threshold(0.9));
        let factory = ParserFactory::new(config).unwrap();

        match factory.create("txt").unwrap() {
            Parser::Txt(parser) => {
                assert!((parser.options().soft_confidence_threshold - 0.9).abs() < f32::EPSILON);
            }
            other => panic!("expected TXT parser, got {other:?}"),
        }
        assert!(matches!(factory.create("pdf").unwrap(), Parser::Pdf(_)));
    }

    #[test]
    fn test_parser_dispatch_validates() {
        let parser = ParserFactory::default().create("docx").unwrap();
        assert!(parser.is_valid(b"PK\x03\x04"));
        assert!(!parser.is_valid(b"%PDF-1.7"));
    }
}
