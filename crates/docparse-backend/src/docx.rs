//! DOCX parser
//!
//! Reads the WordprocessingML package with `zip` and walks `word/document.xml`
//! with `quick-xml`, collecting paragraph text, headings, table dimensions and
//! section page setup in document order. Properties come from
//! `docProps/core.xml` and `docProps/app.xml`.

use crate::traits::DocumentParser;
use crate::utils;
use chrono::{DateTime, SecondsFormat, Utc};
use docparse_core::{
    DocxStructure, Heading, InputFormat, Metadata, Orientation, ParseError, ParsedDocument,
    Result, Section, Stage, StructureInfo, Table,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// Local file header signature of a zip archive
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

const MAIN_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const CORE_PART: &str = "docProps/core.xml";
const APP_PART: &str = "docProps/app.xml";

/// `w:outlineLvl` value meaning "body text"
const BODY_TEXT_OUTLINE_LEVEL: u8 = 9;

/// Separator between cells of a table row in extracted text
const CELL_SEPARATOR: &str = " | ";

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// DOCX parser
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxParser;

impl DocxParser {
    /// Create a new DOCX parser
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn open(content: &[u8]) -> Result<Archive<'_>> {
        ZipArchive::new(Cursor::new(content))
            .map_err(|e| ParseError::docx_corrupted(Stage::Open, "cannot open zip archive", e))
    }

    /// Fail unless the main document part is present
    fn require_main_part(archive: &Archive<'_>) -> Result<()> {
        if archive.file_names().any(|name| name == MAIN_PART) {
            Ok(())
        } else {
            Err(ParseError::docx_corrupted(
                Stage::Open,
                "package has no main document part",
                format!("{MAIN_PART} not found"),
            ))
        }
    }
}

impl DocumentParser for DocxParser {
    #[inline]
    fn format(&self) -> InputFormat {
        InputFormat::Docx
    }

    fn validate(&self, content: &[u8]) -> Result<()> {
        if content.starts_with(ZIP_SIGNATURE) {
            Ok(())
        } else {
            Err(ParseError::validation_at(
                InputFormat::Docx,
                "missing zip local file header (PK\\x03\\x04)",
                0,
            ))
        }
    }

    fn parse(&self, content: &[u8]) -> Result<ParsedDocument> {
        self.validate(content)?;
        let mut archive = Self::open(content)?;
        Self::require_main_part(&archive)?;

        let document_xml = read_part(&mut archive, MAIN_PART, Stage::Open)?.ok_or_else(|| {
            ParseError::docx_corrupted(Stage::Open, "package has no main document part", MAIN_PART)
        })?;

        let styles = match read_part(&mut archive, STYLES_PART, Stage::Extract) {
            Ok(Some(xml)) => parse_styles_xml(&xml).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable {STYLES_PART}: {e}");
                HashMap::new()
            }),
            Ok(None) => HashMap::new(),
            Err(e) => {
                log::warn!("Ignoring unreadable {STYLES_PART}: {e}");
                HashMap::new()
            }
        };

        let body = walk_body(&document_xml, &styles)?;
        log::debug!(
            "DOCX: {} paragraphs, {} headings, {} tables, {} sections",
            body.paragraph_count,
            body.structure.headings.len(),
            body.structure.tables.len(),
            body.structure.sections.len()
        );

        let mut metadata = package_metadata(&mut archive);
        metadata.insert("paragraph_count".to_string(), body.paragraph_count.into());
        metadata.insert("table_count".to_string(), body.structure.tables.len().into());
        metadata.insert(
            "heading_count".to_string(),
            body.structure.headings.len().into(),
        );
        metadata.insert(
            "section_count".to_string(),
            body.structure.sections.len().into(),
        );

        Ok(ParsedDocument::new(
            body.text,
            StructureInfo::Docx(body.structure),
            metadata,
        ))
    }

    fn extract_metadata(&self, content: &[u8]) -> Result<Metadata> {
        self.validate(content)?;
        let mut archive = Self::open(content)?;
        Self::require_main_part(&archive)?;
        Ok(package_metadata(&mut archive))
    }
}

/// Read a part as UTF-8; `Ok(None)` if the part is absent
fn read_part(archive: &mut Archive<'_>, name: &str, stage: Stage) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ParseError::docx_corrupted(
                stage,
                format!("cannot read {name}"),
                e,
            ))
        }
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| ParseError::docx_corrupted(stage, format!("cannot read {name}"), e))?;
    Ok(Some(content))
}

// ========================================================================
// XML Attribute Helpers
// ========================================================================

/// Extract an attribute value by key from an element
#[inline]
fn get_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(std::result::Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Extract an attribute value by key and parse it
#[inline]
fn get_attr_parsed<T: std::str::FromStr>(e: &BytesStart<'_>, key: &[u8]) -> Option<T> {
    get_attr(e, key).and_then(|s| s.trim().parse().ok())
}

// ========================================================================
// Styles
// ========================================================================

/// Heading-relevant properties of a paragraph style
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StyleInfo {
    /// Display name (`w:name`), e.g. "heading 1"
    name: Option<String>,
    /// `w:outlineLvl` (0-based)
    outline_level: Option<u8>,
}

/// Parse `word/styles.xml` into a map keyed by style id
fn parse_styles_xml(xml: &str) -> std::result::Result<HashMap<String, StyleInfo>, quick_xml::Error> {
    let mut styles = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<(String, StyleInfo)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"w:style" => {
                    let id = get_attr(e, b"w:styleId").unwrap_or_default();
                    current = Some((id, StyleInfo::default()));
                }
                b"w:name" => {
                    if let Some((_, info)) = current.as_mut() {
                        info.name = get_attr(e, b"w:val");
                    }
                }
                b"w:outlineLvl" => {
                    if let Some((_, info)) = current.as_mut() {
                        info.outline_level = get_attr_parsed(e, b"w:val");
                    }
                }
                _ => {}
            },
            Event::End(ref e) if e.name().as_ref() == b"w:style" => {
                if let Some((id, info)) = current.take() {
                    if !id.is_empty() {
                        styles.insert(id, info);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

/// "Heading1", "heading 2", "HEADING3" -> level
fn heading_level_from_name(name: &str) -> Option<u8> {
    let lower = name.trim().to_ascii_lowercase();
    let rest = lower.strip_prefix("heading")?.trim_start();
    let level: u8 = rest.parse().ok()?;
    (1..=9).contains(&level).then_some(level)
}

/// Heading level of a paragraph, if it carries a heading style
///
/// Resolution order: style id, style display name, style outline level,
/// paragraph outline level.
fn heading_level(
    style_id: Option<&str>,
    paragraph_outline: Option<u8>,
    styles: &HashMap<String, StyleInfo>,
) -> Option<u8> {
    let from_outline = |lvl: u8| (lvl < BODY_TEXT_OUTLINE_LEVEL).then_some(lvl + 1);

    if let Some(id) = style_id {
        if let Some(level) = heading_level_from_name(id) {
            return Some(level);
        }
        if let Some(info) = styles.get(id) {
            if let Some(level) = info.name.as_deref().and_then(heading_level_from_name) {
                return Some(level);
            }
            if let Some(level) = info.outline_level.and_then(from_outline) {
                return Some(level);
            }
        }
    }
    paragraph_outline.and_then(from_outline)
}

// ========================================================================
// Body walk
// ========================================================================

/// Result of walking `word/document.xml`
#[derive(Debug)]
struct BodyContent {
    text: String,
    structure: DocxStructure,
    paragraph_count: usize,
}

#[derive(Default)]
struct ParagraphBuilder {
    text: String,
    style_id: Option<String>,
    outline_level: Option<u8>,
    block_index: usize,
}

struct TableBuilder {
    /// Slot in `DocxStructure::tables`, reserved at start so nested tables keep start order
    slot: usize,
    block_index: usize,
    rows: u32,
    grid_cols: u32,
    max_cells: u32,
    row_cells: u32,
    row_texts: Vec<String>,
    cell_text: String,
}

impl TableBuilder {
    fn new(slot: usize, block_index: usize) -> Self {
        Self {
            slot,
            block_index,
            rows: 0,
            grid_cols: 0,
            max_cells: 0,
            row_cells: 0,
            row_texts: Vec::new(),
            cell_text: String::new(),
        }
    }

    fn push_cell_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.cell_text.is_empty() {
            self.cell_text.push(' ');
        }
        self.cell_text.push_str(text);
    }
}

struct PendingSection {
    width_twips: Option<u32>,
    height_twips: Option<u32>,
    landscape: bool,
}

struct BodyWalker<'a> {
    styles: &'a HashMap<String, StyleInfo>,
    lines: Vec<String>,
    structure: DocxStructure,
    paragraph_count: usize,
    block_count: usize,
    paragraphs: Vec<ParagraphBuilder>,
    tables: Vec<TableBuilder>,
    section: Option<PendingSection>,
    in_run: bool,
    in_text: bool,
}

impl<'a> BodyWalker<'a> {
    fn new(styles: &'a HashMap<String, StyleInfo>) -> Self {
        Self {
            styles,
            lines: Vec::new(),
            structure: DocxStructure::default(),
            paragraph_count: 0,
            block_count: 0,
            paragraphs: Vec::new(),
            tables: Vec::new(),
            section: None,
            in_run: false,
            in_text: false,
        }
    }

    /// Top-level blocks are paragraphs and tables outside any table or paragraph
    fn is_top_level(&self) -> bool {
        self.tables.is_empty() && self.paragraphs.is_empty()
    }

    fn next_block_index(&mut self) -> usize {
        let idx = self.block_count;
        self.block_count += 1;
        idx
    }

    fn handle_paragraph_start(&mut self) {
        let block_index = if self.is_top_level() {
            self.next_block_index()
        } else {
            self.tables
                .last()
                .map(|t| t.block_index)
                .or_else(|| self.paragraphs.last().map(|p| p.block_index))
                .unwrap_or(self.block_count)
        };
        self.paragraphs.push(ParagraphBuilder {
            block_index,
            ..ParagraphBuilder::default()
        });
    }

    fn handle_paragraph_end(&mut self) {
        let Some(paragraph) = self.paragraphs.pop() else {
            return;
        };
        let text = paragraph.text.trim();

        // Paragraph nested in a text box: fold into the enclosing paragraph
        if let Some(parent) = self.paragraphs.last_mut() {
            if !text.is_empty() {
                if !parent.text.is_empty() && !parent.text.ends_with('\n') {
                    parent.text.push('\n');
                }
                parent.text.push_str(text);
                parent.text.push('\n');
            }
            return;
        }

        if let Some(table) = self.tables.last_mut() {
            table.push_cell_text(text);
            return;
        }

        self.paragraph_count += 1;
        if text.is_empty() {
            return;
        }

        if let Some(level) = heading_level(
            paragraph.style_id.as_deref(),
            paragraph.outline_level,
            self.styles,
        ) {
            self.structure.headings.push(Heading {
                level,
                text: text.to_string(),
                block_index: paragraph.block_index,
            });
        }
        self.lines.push(text.to_string());
    }

    fn handle_table_start(&mut self) {
        let block_index = match self.tables.last() {
            Some(parent) => parent.block_index,
            None => self.next_block_index(),
        };
        let slot = self.structure.tables.len();
        self.structure.tables.push(Table {
            rows: 0,
            cols: 0,
            block_index,
        });
        self.tables.push(TableBuilder::new(slot, block_index));
    }

    fn handle_table_end(&mut self) {
        let Some(table) = self.tables.pop() else {
            return;
        };
        let cols = if table.grid_cols > 0 {
            table.grid_cols
        } else {
            table.max_cells
        };
        if let Some(slot) = self.structure.tables.get_mut(table.slot) {
            slot.rows = table.rows;
            slot.cols = cols;
        }
    }

    fn handle_row_start(&mut self) {
        if let Some(table) = self.tables.last_mut() {
            table.row_cells = 0;
            table.row_texts.clear();
        }
    }

    fn handle_row_end(&mut self) {
        let Some(table) = self.tables.last_mut() else {
            return;
        };
        table.rows += 1;
        table.max_cells = table.max_cells.max(table.row_cells);
        let row = std::mem::take(&mut table.row_texts);
        let line = row.join(CELL_SEPARATOR);
        if line.trim().is_empty() {
            return;
        }

        // Rows of a nested table become text of the enclosing cell
        let depth = self.tables.len();
        if depth > 1 {
            if let Some(parent) = self.tables.get_mut(depth - 2) {
                parent.push_cell_text(&line);
            }
        } else {
            self.lines.push(line);
        }
    }

    fn handle_cell_start(&mut self) {
        if let Some(table) = self.tables.last_mut() {
            table.cell_text.clear();
        }
    }

    fn handle_cell_end(&mut self) {
        if let Some(table) = self.tables.last_mut() {
            table.row_cells += 1;
            let cell = std::mem::take(&mut table.cell_text);
            table.row_texts.push(cell);
        }
    }

    fn handle_section_end(&mut self) {
        let Some(pending) = self.section.take() else {
            return;
        };
        let page_width = pending.width_twips.map(|w| w / 20);
        let page_height = pending.height_twips.map(|h| h / 20);
        let landscape = pending.landscape
            || matches!((page_width, page_height), (Some(w), Some(h)) if w > h);
        let number = u32::try_from(self.structure.sections.len() + 1).unwrap_or(u32::MAX);
        self.structure.sections.push(Section {
            number,
            page_width,
            page_height,
            orientation: if landscape {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            },
        });
    }

    fn handle_text(&mut self, text: &str) {
        if !self.in_text {
            return;
        }
        if let Some(paragraph) = self.paragraphs.last_mut() {
            paragraph.text.push_str(text);
        }
    }

    fn push_char(&mut self, c: char) {
        if self.in_run {
            if let Some(paragraph) = self.paragraphs.last_mut() {
                paragraph.text.push(c);
            }
        }
    }

    /// Elements that may appear as either `Start` or `Empty`
    fn handle_properties(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"w:pStyle" => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    paragraph.style_id = get_attr(e, b"w:val");
                }
            }
            b"w:outlineLvl" => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    paragraph.outline_level = get_attr_parsed(e, b"w:val");
                }
            }
            b"w:gridCol" => {
                if let Some(table) = self.tables.last_mut() {
                    table.grid_cols += 1;
                }
            }
            b"w:gridSpan" => {
                if let Some(table) = self.tables.last_mut() {
                    let span: u32 = get_attr_parsed(e, b"w:val").unwrap_or(1);
                    table.row_cells += span.saturating_sub(1);
                }
            }
            b"w:pgSz" => {
                if let Some(section) = self.section.as_mut() {
                    section.width_twips = get_attr_parsed(e, b"w:w");
                    section.height_twips = get_attr_parsed(e, b"w:h");
                    section.landscape = get_attr(e, b"w:orient").as_deref() == Some("landscape");
                }
            }
            b"w:tab" => self.push_char('\t'),
            b"w:br" | b"w:cr" => self.push_char('\n'),
            _ => {}
        }
    }

    fn handle_start_element(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"w:p" => self.handle_paragraph_start(),
            b"w:tbl" => self.handle_table_start(),
            b"w:tr" => self.handle_row_start(),
            b"w:tc" => self.handle_cell_start(),
            b"w:r" => self.in_run = true,
            b"w:t" => self.in_text = true,
            b"w:sectPr" => {
                self.section = Some(PendingSection {
                    width_twips: None,
                    height_twips: None,
                    landscape: false,
                });
            }
            _ => self.handle_properties(e),
        }
    }

    fn handle_empty_element(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"w:p" => {
                self.handle_paragraph_start();
                self.handle_paragraph_end();
            }
            b"w:tc" => {
                self.handle_cell_start();
                self.handle_cell_end();
            }
            b"w:sectPr" => {
                self.section = Some(PendingSection {
                    width_twips: None,
                    height_twips: None,
                    landscape: false,
                });
                self.handle_section_end();
            }
            _ => self.handle_properties(e),
        }
    }

    fn handle_end_element(&mut self, name: &[u8]) {
        match name {
            b"w:p" => self.handle_paragraph_end(),
            b"w:tbl" => self.handle_table_end(),
            b"w:tr" => self.handle_row_end(),
            b"w:tc" => self.handle_cell_end(),
            b"w:r" => self.in_run = false,
            b"w:t" => self.in_text = false,
            b"w:sectPr" => self.handle_section_end(),
            _ => {}
        }
    }

    fn finish(self) -> BodyContent {
        BodyContent {
            text: utils::normalize_text(&self.lines.join("\n")),
            structure: self.structure,
            paragraph_count: self.paragraph_count,
        }
    }
}

/// Walk the document body and collect text and structure
fn walk_body(xml: &str, styles: &HashMap<String, StyleInfo>) -> Result<BodyContent> {
    let mut walker = BodyWalker::new(styles);

    let mut reader = Reader::from_str(xml);
    // w:t content may carry significant leading/trailing spaces (xml:space="preserve")
    reader.trim_text(false);

    // Word writes text boxes into both mc:Choice and mc:Fallback; only Choice is read
    let mut fallback_depth = 0usize;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"mc:Fallback" => fallback_depth += 1,
            Ok(Event::End(e)) if e.name().as_ref() == b"mc:Fallback" => {
                fallback_depth = fallback_depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) if fallback_depth > 0 => {}
            Ok(Event::Start(e)) => walker.handle_start_element(&e),
            Ok(Event::Empty(e)) => walker.handle_empty_element(&e),
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| {
                    ParseError::docx_corrupted(
                        Stage::Extract,
                        format!("invalid text in {MAIN_PART}"),
                        err,
                    )
                })?;
                walker.handle_text(&text);
            }
            Ok(Event::End(e)) => walker.handle_end_element(e.name().as_ref()),
            Err(e) => {
                return Err(ParseError::docx_corrupted(
                    Stage::Extract,
                    format!("malformed {MAIN_PART} at byte {}", reader.buffer_position()),
                    e,
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(walker.finish())
}

// ========================================================================
// Package properties
// ========================================================================

/// How a property element maps into metadata
#[derive(Clone, Copy)]
enum PropertyKind {
    Text,
    Date,
    Integer,
}

const CORE_PROPERTIES: &[(&[u8], &str, PropertyKind)] = &[
    (b"dc:title", "title", PropertyKind::Text),
    (b"dc:creator", "author", PropertyKind::Text),
    (b"dc:subject", "subject", PropertyKind::Text),
    (b"cp:keywords", "keywords", PropertyKind::Text),
    (b"cp:category", "category", PropertyKind::Text),
    (b"dc:description", "comments", PropertyKind::Text),
    (b"cp:lastModifiedBy", "last_modified_by", PropertyKind::Text),
    (b"dcterms:created", "creation_date", PropertyKind::Date),
    (b"dcterms:modified", "modification_date", PropertyKind::Date),
    (b"cp:lastPrinted", "last_printed", PropertyKind::Date),
];

const APP_PROPERTIES: &[(&[u8], &str, PropertyKind)] = &[
    (b"Application", "application", PropertyKind::Text),
    (b"Pages", "app_page_count", PropertyKind::Integer),
    (b"Words", "app_word_count", PropertyKind::Integer),
];

/// Parse ISO 8601 datetime string, normalized to UTC
///
/// Office documents use W3CDTF format:
/// - 2024-01-15T10:30:00Z
/// - 2024-01-15T10:30:00.123Z
#[inline]
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Collect simple text-valued elements of a properties part
///
/// Unreadable properties are tolerated: parsing stops at the first XML error
/// and whatever was read so far is kept.
fn read_properties(
    xml: &str,
    table: &[(&[u8], &str, PropertyKind)],
    metadata: &mut Metadata,
) {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<(&str, PropertyKind)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = table
                    .iter()
                    .find(|(tag, _, _)| *tag == e.name().as_ref())
                    .map(|&(_, key, kind)| (key, kind));
            }
            Ok(Event::Text(e)) => {
                if let (Some((key, kind)), Ok(text)) = (current, e.unescape()) {
                    let text = text.trim();
                    if !text.is_empty() {
                        let value: Option<serde_json::Value> = match kind {
                            PropertyKind::Text => Some(text.into()),
                            PropertyKind::Date => Some(
                                parse_datetime(text)
                                    .map_or_else(
                                        || text.to_string(),
                                        |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true),
                                    )
                                    .into(),
                            ),
                            PropertyKind::Integer => text.parse::<i64>().ok().map(Into::into),
                        };
                        if let Some(value) = value {
                            metadata.insert(key.to_string(), value);
                        }
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("Stopping at malformed properties XML: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Core and extended properties; missing parts yield no keys
fn package_metadata(archive: &mut Archive<'_>) -> Metadata {
    let mut metadata = Metadata::new();
    for (part, table) in [(CORE_PART, CORE_PROPERTIES), (APP_PART, APP_PROPERTIES)] {
        match read_part(archive, part, Stage::Metadata) {
            Ok(Some(xml)) => read_properties(&xml, table, &mut metadata),
            Ok(None) => log::debug!("DOCX has no {part}"),
            Err(e) => log::warn!("Ignoring unreadable {part}: {e}"),
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use docparse_core::ErrorKind;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    fn para(style: Option<&str>, text: &str) -> String {
        let ppr = style.map_or_else(String::new, |s| {
            format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#)
        });
        format!(r#"<w:p>{ppr}<w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    #[test]
    fn test_validate_signature() {
        let parser = DocxParser::new();
        assert!(parser.validate(b"PK\x03\x04rest").is_ok());
        let err = parser.validate(b"%PDF-1.4").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_zip_signature_but_broken_archive_is_corrupted() {
        let err = DocxParser::new()
            .parse(b"PK\x03\x04 definitely not a zip archive")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DocxCorrupted);
        assert_eq!(err.stage(), Stage::Open);
    }

    #[test]
    fn test_heading_level_from_name() {
        assert_eq!(heading_level_from_name("Heading1"), Some(1));
        assert_eq!(heading_level_from_name("heading 2"), Some(2));
        assert_eq!(heading_level_from_name("Heading"), None);
        assert_eq!(heading_level_from_name("Normal"), None);
        assert_eq!(heading_level_from_name("Heading 0"), None);
    }

    #[test]
    fn test_heading_level_resolution_order() {
        let mut styles = HashMap::new();
        styles.insert(
            "Titre1".to_string(),
            StyleInfo {
                name: Some("heading 1".to_string()),
                outline_level: None,
            },
        );
        styles.insert(
            "Custom".to_string(),
            StyleInfo {
                name: Some("My Custom".to_string()),
                outline_level: Some(2),
            },
        );
        assert_eq!(heading_level(Some("Heading3"), None, &styles), Some(3));
        assert_eq!(heading_level(Some("Titre1"), None, &styles), Some(1));
        assert_eq!(heading_level(Some("Custom"), None, &styles), Some(3));
        assert_eq!(heading_level(Some("Normal"), Some(0), &styles), Some(1));
        assert_eq!(heading_level(None, Some(9), &styles), None);
        assert_eq!(heading_level(None, None, &styles), None);
    }

    #[test]
    fn test_parse_styles_xml() {
        let xml = r#"<w:styles xmlns:w="x">
            <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:pPr><w:outlineLvl w:val="0"/></w:pPr></w:style>
            <w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
        </w:styles>"#;
        let styles = parse_styles_xml(xml).unwrap();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles["Heading1"].outline_level, Some(0));
        assert_eq!(styles["Normal"].name.as_deref(), Some("Normal"));
    }

    #[test]
    fn test_walk_body_paragraphs_and_headings() {
        let xml = body(&format!(
            "{}{}{}<w:p/>",
            para(Some("Heading1"), "Experience"),
            para(None, "Worked  on   things."),
            para(Some("Heading2"), "Details"),
        ));
        let content = walk_body(&xml, &HashMap::new()).unwrap();
        assert_eq!(content.text, "Experience\nWorked on things.\nDetails");
        assert_eq!(content.paragraph_count, 4);
        let headings = &content.structure.headings;
        assert_eq!(headings.len(), 2);
        assert_eq!((headings[0].level, headings[0].block_index), (1, 0));
        assert_eq!((headings[1].level, headings[1].block_index), (2, 2));
    }

    #[test]
    fn test_walk_body_tabs_and_breaks() {
        let xml = body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>"#,
        );
        let content = walk_body(&xml, &HashMap::new()).unwrap();
        assert_eq!(content.text, "a\tb\nc");
    }

    #[test]
    fn test_walk_body_table_with_grid_and_span() {
        let xml = body(&format!(
            r#"{}<w:tbl><w:tblGrid><w:gridCol/><w:gridCol/><w:gridCol/></w:tblGrid>
<w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr>
<w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr>{}</w:tc><w:tc>{}</w:tc></w:tr>
</w:tbl>{}"#,
            para(None, "Before"),
            para(None, "A"),
            para(None, "B"),
            para(None, "C"),
            para(None, "Wide"),
            para(None, "D"),
            para(None, "After"),
        ));
        let content = walk_body(&xml, &HashMap::new()).unwrap();
        assert_eq!(content.text, "Before\nA | B | C\nWide | D\nAfter");
        assert_eq!(content.structure.tables.len(), 1);
        let table = &content.structure.tables[0];
        assert_eq!((table.rows, table.cols, table.block_index), (2, 3, 1));
        assert_eq!(content.paragraph_count, 2);
    }

    #[test]
    fn test_walk_body_table_without_grid_uses_max_cells() {
        let xml = body(&format!(
            "<w:tbl><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            para(None, "x"),
            para(None, "y")
        ));
        let content = walk_body(&xml, &HashMap::new()).unwrap();
        assert_eq!(content.structure.tables[0].cols, 2);
        assert_eq!(content.structure.tables[0].rows, 1);
    }

    #[test]
    fn test_walk_body_nested_table_in_start_order() {
        let inner = format!(
            "<w:tbl><w:tr><w:tc>{}</w:tc></w:tr><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>",
            para(None, "i1"),
            para(None, "i2")
        );
        let xml = body(&format!(
            "<w:tbl><w:tr><w:tc>{}{inner}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            para(None, "outer"),
            para(None, "right")
        ));
        let content = walk_body(&xml, &HashMap::new()).unwrap();
        let tables = &content.structure.tables;
        assert_eq!(tables.len(), 2);
        assert_eq!((tables[0].rows, tables[0].cols), (1, 2));
        assert_eq!((tables[1].rows, tables[1].cols), (2, 1));
        assert_eq!(tables[1].block_index, tables[0].block_index);
        assert_eq!(content.text, "outer i1 i2 | right");
    }

    #[test]
    fn test_walk_body_sections() {
        let xml = body(&format!(
            r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="16838" w:h="11906" w:orient="landscape"/></w:sectPr></w:pPr><w:r><w:t>Wide</w:t></w:r></w:p>{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#,
            para(None, "Narrow")
        ));
        let content = walk_body(&xml, &HashMap::new()).unwrap();
        let sections = &content.structure.sections;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].orientation, Orientation::Landscape);
        assert_eq!(sections[0].page_width, Some(841));
        assert_eq!(sections[1].number, 2);
        assert_eq!(sections[1].page_width, Some(612));
        assert_eq!(sections[1].page_height, Some(792));
        assert_eq!(sections[1].orientation, Orientation::Portrait);
    }

    #[test]
    fn test_walk_body_malformed_xml() {
        let err = walk_body("<w:document><w:body><w:p></w:body>", &HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DocxCorrupted);
        assert_eq!(err.stage(), Stage::Extract);
    }

    #[test]
    fn test_walk_body_text_box_read_once() {
        let textbox = |wrapper: &str| {
            format!(
                "<{wrapper}><w:txbxContent><w:p><w:r><w:t>Box</w:t></w:r></w:p></w:txbxContent></{wrapper}>"
            )
        };
        let xml = body(&format!(
            r#"<w:p><w:r><mc:AlternateContent><mc:Choice Requires="wps"><w:drawing>{}</w:drawing></mc:Choice><mc:Fallback><w:pict>{}</w:pict></mc:Fallback></mc:AlternateContent></w:r><w:r><w:t>Tail</w:t><w:tab/><w:t>x</w:t></w:r></w:p>"#,
            textbox("wps:txbx"),
            textbox("v:textbox"),
        ));
        let content = walk_body(&xml, &HashMap::new()).unwrap();
        assert_eq!(content.text, "Box\nTail\tx");
        assert_eq!(content.paragraph_count, 1);
    }

    #[test]
    fn test_walk_body_unescapes_entities() {
        let xml = body(&para(None, "Fish &amp; Chips"));
        let content = walk_body(&xml, &HashMap::new()).unwrap();
        assert_eq!(content.text, "Fish & Chips");
    }

    #[test]
    fn test_read_core_properties() {
        let xml = r#"<cp:coreProperties xmlns:cp="a" xmlns:dc="b" xmlns:dcterms="c">
            <dc:title>Resume</dc:title>
            <dc:creator>Jane Doe</dc:creator>
            <dc:description>Draft</dc:description>
            <dcterms:created>2024-01-15T10:30:00Z</dcterms:created>
            <dcterms:modified>2024-01-20T14:45:00.123+02:00</dcterms:modified>
            <cp:lastPrinted>not a date</cp:lastPrinted>
            <cp:keywords></cp:keywords>
        </cp:coreProperties>"#;
        let mut metadata = Metadata::new();
        read_properties(xml, CORE_PROPERTIES, &mut metadata);
        assert_eq!(metadata["title"], "Resume");
        assert_eq!(metadata["author"], "Jane Doe");
        assert_eq!(metadata["comments"], "Draft");
        assert_eq!(metadata["creation_date"], "2024-01-15T10:30:00Z");
        assert_eq!(metadata["modification_date"], "2024-01-20T12:45:00Z");
        assert_eq!(metadata["last_printed"], "not a date");
        assert!(!metadata.contains_key("keywords"));
        assert!(!metadata.contains_key("subject"));
    }

    #[test]
    fn test_read_app_properties() {
        let xml = r"<Properties><Application>Microsoft Office Word</Application><Pages>3</Pages><Words>1200</Words><Lines>x</Lines></Properties>";
        let mut metadata = Metadata::new();
        read_properties(xml, APP_PROPERTIES, &mut metadata);
        assert_eq!(metadata["application"], "Microsoft Office Word");
        assert_eq!(metadata["app_page_count"], 3);
        assert_eq!(metadata["app_word_count"], 1200);
        assert_eq!(metadata.len(), 3);
    }
}
