//! PDF parser backed by `lopdf`
//!
//! Pipeline: signature check, container open, encryption gate, per-page text,
//! page tree and outline, `/Info` metadata.
//!
//! Memory: `lopdf` materializes the whole object graph, which is bounded by a
//! constant multiple of the input size. Extracted text is appended page by page
//! into a single buffer; no per-page copies are retained.

use crate::traits::DocumentParser;
use crate::utils;
use chrono::{FixedOffset, NaiveDate, TimeZone};
use docparse_core::{
    InputFormat, Metadata, OutlineEntry, Page, ParseError, ParsedDocument, PdfStructure, Result,
    StructureInfo,
};
use encoding_rs::UTF_16BE;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Header signature
const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Window in which the header may appear (some writers prepend junk)
const SIGNATURE_WINDOW: usize = 1024;

/// Inserted between pages in `ParsedDocument::text`
pub const PAGE_BREAK: &str = "\n\u{000C}\n";

/// US Letter, used when no `/MediaBox` is found in the page tree
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Guard for `/Parent` chains and outline nesting
const MAX_TREE_DEPTH: usize = 64;

/// Tail searched for `/Encrypt` when a file has no `trailer` keyword
const TRAILER_WINDOW: usize = 2048;

/// Guard for name-tree lookups
const MAX_NAME_TREE_DEPTH: usize = 16;

/// PDF parser
#[derive(Debug, Clone, Default)]
pub struct PdfParser {
    password: Option<String>,
    max_pages: Option<usize>,
}

impl PdfParser {
    /// Create a parser with an optional password and text-extraction page cap
    #[inline]
    #[must_use]
    pub const fn new(password: Option<String>, max_pages: Option<usize>) -> Self {
        Self {
            password,
            max_pages,
        }
    }

    /// Open the container and apply the encryption gate
    ///
    /// Returns the document and whether it was encrypted.
    fn open(&self, content: &[u8]) -> Result<(Document, bool)> {
        self.validate(content)?;

        let declares_encryption = contains(trailer_region(content), b"/Encrypt");
        let mut doc = match Document::load_mem(content) {
            Ok(doc) => doc,
            Err(e) if declares_encryption => {
                return Err(ParseError::PdfEncrypted {
                    message: format!("cannot open encrypted document: {e}"),
                    password_supplied: self.password.is_some(),
                });
            }
            Err(e) => {
                return Err(ParseError::pdf_damaged(
                    "cannot read cross-reference table or object graph",
                    e,
                ));
            }
        };

        let encrypted = doc.is_encrypted() || doc.trailer.has(b"Encrypt");
        if encrypted {
            let Some(password) = self.password.as_deref() else {
                return Err(ParseError::PdfEncrypted {
                    message: "document is password-protected and no password was supplied"
                        .to_string(),
                    password_supplied: false,
                });
            };
            doc.decrypt(password)
                .map_err(|e| ParseError::PdfEncrypted {
                    message: format!("password rejected: {e}"),
                    password_supplied: true,
                })?;
            log::debug!("PDF decrypted with supplied password");
        }

        Ok((doc, encrypted))
    }

    /// Extract text for every page, appending into one buffer
    fn extract_pages(&self, doc: &Document, pages: &BTreeMap<u32, ObjectId>) -> (String, Vec<Page>) {
        let mut text = String::new();
        let mut structure = Vec::with_capacity(pages.len());
        let limit = self.max_pages.unwrap_or(usize::MAX);

        for (idx, (&number, &page_id)) in pages.iter().enumerate() {
            if idx > 0 {
                text.push_str(PAGE_BREAK);
            }

            let page_dict = doc.get_dictionary(page_id).ok();
            let size = page_dict
                .and_then(|d| page_size(doc, d))
                .unwrap_or(DEFAULT_PAGE_SIZE);
            let rotation = page_dict
                .and_then(|d| inherited(doc, d, b"Rotate"))
                .and_then(|o| o.as_i64().ok())
                .map_or(0, |r| r.rem_euclid(360));

            let text_extracted = if idx < limit {
                match page_text(doc, number, page_id) {
                    Ok(page) => {
                        text.push_str(&utils::normalize_text(&page));
                        true
                    }
                    Err(reason) => {
                        log::warn!("PDF page {number}: content not decodable, skipping text ({reason})");
                        false
                    }
                }
            } else {
                false
            };

            structure.push(Page {
                number,
                size,
                rotation,
                text_extracted,
            });
        }

        if pages.len() > limit {
            log::debug!(
                "PDF text extraction capped at {limit} of {} pages",
                pages.len()
            );
        }

        (text, structure)
    }
}

impl DocumentParser for PdfParser {
    #[inline]
    fn format(&self) -> InputFormat {
        InputFormat::Pdf
    }

    fn validate(&self, content: &[u8]) -> Result<()> {
        let window = &content[..content.len().min(SIGNATURE_WINDOW)];
        if contains(window, PDF_SIGNATURE) {
            Ok(())
        } else {
            Err(ParseError::validation(
                InputFormat::Pdf,
                format!("missing %PDF- header in first {SIGNATURE_WINDOW} bytes"),
            ))
        }
    }

    fn parse(&self, content: &[u8]) -> Result<ParsedDocument> {
        let (doc, encrypted) = self.open(content)?;
        let pages = doc.get_pages();
        log::debug!("PDF: {} pages, encrypted: {encrypted}", pages.len());

        let (text, page_structure) = self.extract_pages(&doc, &pages);
        let outline = extract_outline(&doc, &pages);

        let structure = PdfStructure {
            pages: page_structure,
            outline,
        };

        let mut metadata = info_metadata(&doc);
        metadata.insert("page_count".to_string(), pages.len().into());
        metadata.insert("encrypted".to_string(), encrypted.into());
        metadata.insert(
            "pages_without_text".to_string(),
            structure.pages_without_text().into(),
        );

        Ok(ParsedDocument::new(
            text,
            StructureInfo::Pdf(structure),
            metadata,
        ))
    }

    fn extract_metadata(&self, content: &[u8]) -> Result<Metadata> {
        let (doc, encrypted) = self.open(content)?;
        let mut metadata = info_metadata(&doc);
        metadata.insert("page_count".to_string(), doc.get_pages().len().into());
        metadata.insert("encrypted".to_string(), encrypted.into());
        Ok(metadata)
    }
}

// ============================================================================
// Page helpers
// ============================================================================

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Bytes after the last `trailer` keyword, or the file tail for xref-stream files
fn trailer_region(content: &[u8]) -> &[u8] {
    match content.windows(b"trailer".len()).rposition(|w| w == b"trailer") {
        Some(pos) => &content[pos..],
        None => &content[content.len().saturating_sub(TRAILER_WINDOW)..],
    }
}

/// Follow one level of indirection
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up a page attribute, walking `/Parent` for inheritable keys
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(obj) = dict.get(key) {
            return resolve(doc, obj);
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

#[allow(clippy::cast_precision_loss)]
fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// (width, height) in points from the inherited `/MediaBox`
#[allow(clippy::cast_possible_truncation)]
fn page_size(doc: &Document, page: &Dictionary) -> Option<(f32, f32)> {
    let media_box = inherited(doc, page, b"MediaBox")?.as_array().ok()?;
    let coords: Vec<f64> = media_box
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(as_number))
        .collect();
    let [x0, y0, x1, y1] = coords.as_slice() else {
        return None;
    };
    Some(((x1 - x0).abs() as f32, (y1 - y0).abs() as f32))
}

/// Decode a page's content streams, then extract its text
///
/// A stream with a `/Filter` must decompress to something; `lopdf` reports
/// some codec failures as empty output rather than an error.
fn page_text(doc: &Document, number: u32, page_id: ObjectId) -> std::result::Result<String, String> {
    for stream_id in doc.get_page_contents(page_id) {
        let stream = doc
            .get_object(stream_id)
            .and_then(Object::as_stream)
            .map_err(|e| format!("content stream {stream_id:?}: {e}"))?;

        let data = if stream.dict.has(b"Filter") {
            let data = stream
                .decompressed_content()
                .map_err(|e| format!("decompress: {e}"))?;
            if data.is_empty() && !stream.content.is_empty() {
                return Err("filter produced no output".to_string());
            }
            data
        } else {
            stream.content.clone()
        };

        Content::decode(&data).map_err(|e| format!("content syntax: {e}"))?;
    }

    doc.extract_text(&[number]).map_err(|e| e.to_string())
}

// ============================================================================
// Outline
// ============================================================================

fn root_catalog(doc: &Document) -> Option<&Dictionary> {
    let root = doc.trailer.get(b"Root").ok()?;
    resolve(doc, root)?.as_dict().ok()
}

/// Flatten the bookmark tree in document order
fn extract_outline(doc: &Document, pages: &BTreeMap<u32, ObjectId>) -> Option<Vec<OutlineEntry>> {
    let catalog = root_catalog(doc)?;
    let outlines = resolve(doc, catalog.get(b"Outlines").ok()?)?.as_dict().ok()?;
    let first = outlines.get(b"First").and_then(Object::as_reference).ok()?;

    let page_numbers: HashMap<ObjectId, u32> = pages.iter().map(|(&n, &id)| (id, n)).collect();
    let mut walker = OutlineWalker {
        doc,
        catalog,
        page_numbers,
        visited: HashSet::new(),
        entries: Vec::new(),
    };
    walker.walk(first, 0);

    log::debug!("PDF outline: {} entries", walker.entries.len());
    Some(walker.entries)
}

struct OutlineWalker<'a> {
    doc: &'a Document,
    catalog: &'a Dictionary,
    page_numbers: HashMap<ObjectId, u32>,
    visited: HashSet<ObjectId>,
    entries: Vec<OutlineEntry>,
}

impl<'a> OutlineWalker<'a> {
    fn walk(&mut self, first: ObjectId, level: usize) {
        let doc = self.doc;
        if level >= MAX_TREE_DEPTH {
            log::warn!("PDF outline deeper than {MAX_TREE_DEPTH} levels, truncating");
            return;
        }

        let mut next = Some(first);
        while let Some(id) = next.take() {
            if !self.visited.insert(id) {
                log::warn!("PDF outline cycle at object {id:?}");
                return;
            }
            let Ok(item) = doc.get_dictionary(id) else {
                return;
            };

            let title = item
                .get(b"Title")
                .ok()
                .and_then(|o| resolve(doc, o))
                .and_then(|o| o.as_str().ok())
                .map(decode_pdf_string)
                .unwrap_or_default();

            self.entries.push(OutlineEntry {
                title,
                page: self.target_page(item),
                level: u8::try_from(level).unwrap_or(u8::MAX),
            });

            if let Ok(child) = item.get(b"First").and_then(Object::as_reference) {
                self.walk(child, level + 1);
            }
            next = item.get(b"Next").and_then(Object::as_reference).ok();
        }
    }

    /// Page targeted by `/Dest` or a `/GoTo` action's `/D`
    fn target_page(&self, item: &'a Dictionary) -> Option<u32> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.destination_page(dest, 0);
        }
        let action = resolve(self.doc, item.get(b"A").ok()?)?.as_dict().ok()?;
        if action.get(b"S").and_then(Object::as_name).ok()? != b"GoTo" {
            return None;
        }
        self.destination_page(action.get(b"D").ok()?, 0)
    }

    fn destination_page(&self, dest: &'a Object, depth: usize) -> Option<u32> {
        if depth > 2 {
            return None;
        }
        match resolve(self.doc, dest)? {
            Object::Array(parts) => {
                let page_ref = parts.first()?;
                match page_ref {
                    Object::Reference(id) => self.page_numbers.get(id).copied(),
                    // Remote-style integer page index (0-based)
                    Object::Integer(i) => u32::try_from(*i).ok().map(|i| i + 1),
                    _ => None,
                }
            }
            Object::Dictionary(dict) => self.destination_page(dict.get(b"D").ok()?, depth + 1),
            Object::Name(name) | Object::String(name, _) => {
                let target = self.named_destination(name)?;
                self.destination_page(target, depth + 1)
            }
            _ => None,
        }
    }

    /// Resolve a named destination via `/Dests` (PDF 1.1) or the `/Names` tree
    fn named_destination(&self, name: &[u8]) -> Option<&'a Object> {
        if let Some(dests) = self
            .catalog
            .get(b"Dests")
            .ok()
            .and_then(|o| resolve(self.doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            if let Ok(target) = dests.get(name) {
                return Some(target);
            }
        }

        let names = resolve(self.doc, self.catalog.get(b"Names").ok()?)?.as_dict().ok()?;
        let tree = resolve(self.doc, names.get(b"Dests").ok()?)?.as_dict().ok()?;
        self.name_tree_lookup(tree, name, 0)
    }

    fn name_tree_lookup(
        &self,
        node: &'a Dictionary,
        name: &[u8],
        depth: usize,
    ) -> Option<&'a Object> {
        if depth > MAX_NAME_TREE_DEPTH {
            return None;
        }
        if let Some(Object::Array(pairs)) = node.get(b"Names").ok().and_then(|o| resolve(self.doc, o)) {
            for pair in pairs.chunks(2) {
                if let [Object::String(key, _), value] = pair {
                    if key.as_slice() == name {
                        return Some(value);
                    }
                }
            }
        }
        let kids = resolve(self.doc, node.get(b"Kids").ok()?)?.as_array().ok()?;
        kids.iter()
            .filter_map(|kid| resolve(self.doc, kid).and_then(|k| k.as_dict().ok()))
            .find_map(|kid| self.name_tree_lookup(kid, name, depth + 1))
    }
}

// ============================================================================
// Info dictionary
// ============================================================================

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or PDFDocEncoding)
fn decode_pdf_string(bytes: &[u8]) -> String {
    let text = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        UTF_16BE.decode_without_bom_handling(rest).0.into_owned()
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        // PDFDocEncoding agrees with Latin-1 for printable text
        bytes.iter().map(|&b| char::from(b)).collect()
    };
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Convert `D:YYYYMMDDHHmmSSOHH'mm'` to ISO-8601
///
/// Only the year is mandatory. Without a zone suffix the result has no offset.
fn parse_pdf_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits_len = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len < 4 {
        return None;
    }
    let (digits, zone) = s.split_at(digits_len);

    let field = |start: usize, len: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + len) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };
    let year = i32::try_from(field(0, 4, 0)?).ok()?;
    let naive = NaiveDate::from_ymd_opt(year, field(4, 2, 1)?, field(6, 2, 1)?)?
        .and_hms_opt(field(8, 2, 0)?, field(10, 2, 0)?, field(12, 2, 0)?)?;

    let zone = zone.trim();
    let offset_secs = match zone.chars().next() {
        None => return Some(naive.format("%Y-%m-%dT%H:%M:%S").to_string()),
        Some('Z') => 0,
        Some(sign @ ('+' | '-')) => {
            let nums: Vec<i32> = zone[1..]
                .split('\'')
                .filter(|p| !p.is_empty())
                .filter_map(|p| p.parse().ok())
                .collect();
            let hours = nums.first().copied().unwrap_or(0);
            let minutes = nums.get(1).copied().unwrap_or(0);
            let secs = hours * 3600 + minutes * 60;
            if sign == '-' {
                -secs
            } else {
                secs
            }
        }
        Some(_) => return Some(naive.format("%Y-%m-%dT%H:%M:%S").to_string()),
    };

    let offset = FixedOffset::east_opt(offset_secs)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.to_rfc3339())
}

/// Read `/Info`; absent fields are simply omitted
fn info_metadata(doc: &Document) -> Metadata {
    let mut metadata = Metadata::new();

    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        log::debug!("No Info dictionary in PDF");
        return metadata;
    };

    let get_string = |key: &[u8]| -> Option<String> {
        let obj = resolve(doc, info.get(key).ok()?)?;
        let text = decode_pdf_string(obj.as_str().ok()?);
        (!text.is_empty()).then_some(text)
    };

    for (key, field) in [
        ("Title", "title"),
        ("Author", "author"),
        ("Subject", "subject"),
        ("Keywords", "keywords"),
        ("Creator", "creator"),
        ("Producer", "producer"),
    ] {
        if let Some(value) = get_string(key.as_bytes()) {
            metadata.insert(field.to_string(), value.into());
        }
    }

    for (key, field) in [
        ("CreationDate", "creation_date"),
        ("ModDate", "modification_date"),
    ] {
        if let Some(raw) = get_string(key.as_bytes()) {
            let value = parse_pdf_date(&raw).unwrap_or_else(|| {
                log::debug!("Unparseable PDF date {raw:?}, keeping raw value");
                raw
            });
            metadata.insert(field.to_string(), value.into());
        }
    }

    metadata
}
