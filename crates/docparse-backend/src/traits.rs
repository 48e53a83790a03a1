//! Core trait definitions for document parsers

use docparse_core::{InputFormat, Metadata, ParseError, ParsedDocument, Result, Stage};

/// Default soft confidence threshold for TXT encoding inference
///
/// Below this value the parse still succeeds; the low confidence is logged
/// and reported in the result.
pub const DEFAULT_SOFT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Default hard confidence floor for TXT encoding inference
///
/// Below this value parsing fails with an encoding error.
pub const DEFAULT_HARD_CONFIDENCE_FLOOR: f32 = 0.1;

/// Encoding confidence policy for plain text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TxtOptions {
    /// Confidence below which a warning is logged (parse still succeeds)
    pub soft_confidence_threshold: f32,

    /// Confidence below which parsing fails
    pub hard_confidence_floor: f32,
}

impl TxtOptions {
    /// Create validated TXT options
    ///
    /// # Errors
    /// Returns a [`ParseError::Parsing`] at [`Stage::Configure`] if either value
    /// lies outside `[0.0, 1.0]` or the floor exceeds the threshold.
    pub fn new(soft_confidence_threshold: f32, hard_confidence_floor: f32) -> Result<Self> {
        let options = Self {
            soft_confidence_threshold,
            hard_confidence_floor,
        };
        options.validate()?;
        Ok(options)
    }

    /// Check that both thresholds are usable
    ///
    /// # Errors
    /// See [`TxtOptions::new`].
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.soft_confidence_threshold) || !in_unit(self.hard_confidence_floor) {
            return Err(ParseError::parsing(
                InputFormat::Txt,
                Stage::Configure,
                "confidence thresholds must lie in [0.0, 1.0]",
                format!(
                    "soft_confidence_threshold={}, hard_confidence_floor={}",
                    self.soft_confidence_threshold, self.hard_confidence_floor
                ),
            ));
        }
        if self.hard_confidence_floor > self.soft_confidence_threshold {
            return Err(ParseError::parsing(
                InputFormat::Txt,
                Stage::Configure,
                "hard confidence floor exceeds soft threshold",
                format!(
                    "{} > {}",
                    self.hard_confidence_floor, self.soft_confidence_threshold
                ),
            ));
        }
        Ok(())
    }

    /// Set the soft confidence threshold
    #[inline]
    #[must_use = "returns options with soft threshold configured"]
    pub const fn with_soft_threshold(mut self, threshold: f32) -> Self {
        self.soft_confidence_threshold = threshold;
        self
    }

    /// Set the hard confidence floor
    #[inline]
    #[must_use = "returns options with hard floor configured"]
    pub const fn with_hard_floor(mut self, floor: f32) -> Self {
        self.hard_confidence_floor = floor;
        self
    }
}

impl Default for TxtOptions {
    #[inline]
    fn default() -> Self {
        Self {
            soft_confidence_threshold: DEFAULT_SOFT_CONFIDENCE_THRESHOLD,
            hard_confidence_floor: DEFAULT_HARD_CONFIDENCE_FLOOR,
        }
    }
}

/// Options shared by all parsers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserConfig {
    /// PDF user or owner password
    pub password: Option<String>,

    /// Encoding confidence policy for plain text
    pub txt: TxtOptions,

    /// Maximum PDF pages whose text is extracted (None = all)
    ///
    /// Page structure is still reported for every page.
    pub max_pages: Option<usize>,
}

impl ParserConfig {
    /// Set the PDF password
    #[inline]
    #[must_use = "returns config with password configured"]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the TXT confidence policy
    #[inline]
    #[must_use = "returns config with TXT options configured"]
    pub fn with_txt_options(mut self, txt: TxtOptions) -> Self {
        self.txt = txt;
        self
    }

    /// Set maximum pages to extract text from
    #[inline]
    #[must_use = "returns config with maximum pages configured"]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Check the configuration before any parser is built
    ///
    /// # Errors
    /// Returns a [`Stage::Configure`] error for invalid TXT thresholds.
    pub fn validate(&self) -> Result<()> {
        self.txt.validate()
    }
}

/// Parser contract shared by every format
///
/// Implementations hold no per-document state: one value may be reused for
/// any number of documents and shared across threads.
pub trait DocumentParser: Send + Sync {
    /// Get the format this parser handles
    fn format(&self) -> InputFormat;

    /// Cheap structural check without full extraction
    ///
    /// # Errors
    /// Returns [`ParseError::Validation`] if the bytes do not carry the
    /// expected signature or markers.
    fn validate(&self, content: &[u8]) -> Result<()>;

    /// Full extraction of text, structure and metadata
    ///
    /// Validation runs first, so malformed signatures always surface as
    /// [`ParseError::Validation`].
    ///
    /// # Errors
    /// Returns any [`ParseError`] kind that applies to the format.
    fn parse(&self, content: &[u8]) -> Result<ParsedDocument>;

    /// Document properties without the full text and structure walk
    ///
    /// # Errors
    /// Returns the same container errors as [`DocumentParser::parse`].
    fn extract_metadata(&self, content: &[u8]) -> Result<Metadata>;

    /// Boolean form of [`DocumentParser::validate`]
    fn is_valid(&self, content: &[u8]) -> bool {
        self.validate(content).is_ok()
    }

    /// Check if this parser can handle the given format
    fn can_handle(&self, format: InputFormat) -> bool {
        self.format() == format
    }
}
