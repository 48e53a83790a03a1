//! In-memory document fixtures shared by the integration tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::encryption;
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Content stream that draws one line of text with font F1
fn text_stream(text: &str) -> Stream {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    Stream::new(dictionary! {}, content.encode().unwrap())
}

/// Page body for a PDF fixture
pub enum PageSpec {
    /// Plain content stream showing this text
    Text(&'static str),
    /// `/FlateDecode` stream whose bytes are not zlib data
    CorruptStream,
}

/// Options for [`build_pdf`]
#[derive(Default)]
pub struct PdfSpec {
    pub info: bool,
    pub outline: bool,
    pub outline_cycle: bool,
    /// Encrypt with the standard handler (RC4, 40-bit, revision 2) under this user password
    pub encrypt: Option<&'static str>,
    pub rotate_first_page: bool,
}

/// Build a PDF with one page per entry in `pages`
pub fn build_pdf(pages: &[PageSpec], spec: &PdfSpec) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        let stream = match page {
            PageSpec::Text(text) => text_stream(text),
            PageSpec::CorruptStream => Stream::new(
                dictionary! { "Filter" => "FlateDecode" },
                b"this is not zlib data at all".to_vec(),
            ),
        };
        let content_id = doc.add_object(stream);
        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        };
        if idx == 0 && spec.rotate_first_page {
            page_dict.set("Rotate", 90);
        }
        page_ids.push(doc.add_object(page_dict));
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
    let count = i64::try_from(page_ids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };

    if spec.outline && !page_ids.is_empty() {
        let outlines_id = doc.new_object_id();
        let first_id = doc.new_object_id();
        let second_id = doc.new_object_id();
        let child_id = doc.new_object_id();
        let last_page = page_ids[page_ids.len() - 1];

        let mut first = dictionary! {
            "Title" => Object::string_literal("Introduction"),
            "Parent" => outlines_id,
            "Next" => second_id,
            "Dest" => vec![page_ids[0].into(), "Fit".into()],
        };
        if spec.outline_cycle {
            first.set("Prev", second_id);
        }
        let mut second = dictionary! {
            // UTF-16BE "Résumé"
            "Title" => Object::String(
                vec![0xFE, 0xFF, 0x00, b'R', 0x00, 0xE9, 0x00, b's', 0x00, b'u', 0x00, b'm', 0x00, 0xE9],
                StringFormat::Hexadecimal,
            ),
            "Parent" => outlines_id,
            "Prev" => first_id,
            "First" => child_id,
            "Last" => child_id,
            "A" => dictionary! {
                "S" => "GoTo",
                "D" => vec![last_page.into(), "XYZ".into(), Object::Null, Object::Null, Object::Null],
            },
        };
        if spec.outline_cycle {
            second.set("Next", first_id);
        }
        let child = dictionary! {
            "Title" => Object::string_literal("Details"),
            "Parent" => second_id,
            "Dest" => Object::Name(b"details".to_vec()),
        };

        doc.objects.insert(first_id, Object::Dictionary(first));
        doc.objects.insert(second_id, Object::Dictionary(second));
        doc.objects.insert(child_id, Object::Dictionary(child));
        doc.objects.insert(
            outlines_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => first_id,
                "Last" => second_id,
                "Count" => 3,
            }),
        );

        let dests_tree = doc.add_object(dictionary! {
            "Names" => vec![
                Object::string_literal("details"),
                Object::Array(vec![last_page.into(), "Fit".into()]),
            ],
        });
        catalog.set("Outlines", outlines_id);
        catalog.set("Names", dictionary! { "Dests" => dests_tree });
    }

    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    if spec.info {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly Report"),
            // UTF-16BE "Zoë"
            "Author" => Object::String(
                vec![0xFE, 0xFF, 0x00, b'Z', 0x00, b'o', 0x00, 0xEB],
                StringFormat::Hexadecimal,
            ),
            "Producer" => Object::string_literal("fixture writer"),
            "CreationDate" => Object::string_literal("D:20240115103000+01'00'"),
            "ModDate" => Object::string_literal("not a date"),
        });
        doc.trailer.set("Info", info_id);
    }

    if let Some(password) = spec.encrypt {
        encrypt_rc4(&mut doc, password);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Padding string from the standard security handler
const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            byte ^ s[s[i as usize].wrapping_add(s[j as usize]) as usize]
        })
        .collect()
}

/// Seal every string and stream the way a revision 2 writer does
///
/// RC4 is symmetric, so lopdf's per-object decryption doubles as encryption.
/// The owner entry is arbitrary; only the user password is ever checked.
fn encrypt_rc4(doc: &mut Document, user_password: &str) {
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "O" => Object::String(vec![0x5A; 32], StringFormat::Hexadecimal),
        "U" => Object::String(vec![0; 32], StringFormat::Hexadecimal),
        "P" => -44,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(vec![0x11; 16], StringFormat::Hexadecimal),
            Object::String(vec![0x11; 16], StringFormat::Hexadecimal),
        ],
    );

    let key = encryption::get_encryption_key(doc, user_password, false).unwrap();
    doc.get_dictionary_mut(encrypt_id).unwrap().set(
        "U",
        Object::String(rc4(&key, &PASSWORD_PADDING), StringFormat::Hexadecimal),
    );

    let info_id = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .ok();
    for (&id, object) in doc.objects.iter_mut() {
        if id == encrypt_id {
            continue;
        }
        match object {
            Object::Stream(stream) => {
                let sealed = rc4_object(&key, id, &Object::Stream(stream.clone()));
                stream.set_content(sealed);
            }
            Object::String(..) => {
                *object = Object::String(rc4_object(&key, id, object), StringFormat::Hexadecimal);
            }
            Object::Dictionary(dict) if Some(id) == info_id => {
                for (_, value) in dict.iter_mut() {
                    if matches!(value, Object::String(..)) {
                        *value =
                            Object::String(rc4_object(&key, id, value), StringFormat::Hexadecimal);
                    }
                }
            }
            _ => {}
        }
    }
}

fn rc4_object(key: &[u8], id: ObjectId, object: &Object) -> Vec<u8> {
    encryption::decrypt_object(key, id, object).unwrap()
}

/// One-page PDF encrypted under `user_password`, with the Info dictionary set
pub fn encrypted_pdf(text: &'static str, user_password: &'static str) -> Vec<u8> {
    build_pdf(
        &[PageSpec::Text(text)],
        &PdfSpec {
            info: true,
            encrypt: Some(user_password),
            ..PdfSpec::default()
        },
    )
}

/// The three-page scenario: page 2 carries an undecodable content stream
pub fn three_page_pdf_with_corrupt_page() -> Vec<u8> {
    build_pdf(
        &[
            PageSpec::Text("First page text"),
            PageSpec::CorruptStream,
            PageSpec::Text("Third page text"),
        ],
        &PdfSpec::default(),
    )
}

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub fn paragraph(style: Option<&str>, text: &str) -> String {
    let ppr = style.map_or_else(String::new, |s| {
        format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#)
    });
    format!(r#"<w:p>{ppr}<w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

pub fn table(rows: &[&[&str]]) -> String {
    let cols = rows.first().map_or(0, |r| r.len());
    let grid = "<w:gridCol w:w=\"2000\"/>".repeat(cols);
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|cell| format!("<w:tc>{}</w:tc>", paragraph(None, cell)))
                .collect();
            format!("<w:tr>{cells}</w:tr>")
        })
        .collect();
    format!("<w:tbl><w:tblPr/><w:tblGrid>{grid}</w:tblGrid>{body}</w:tbl>")
}

pub fn document_xml(blocks: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}"><w:body>{blocks}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>Curriculum Vitae</dc:title><dc:creator>Alex Example</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">2024-03-01T09:00:00Z</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">2024-03-02T17:30:00Z</dcterms:modified></cp:coreProperties>"#;

/// Zip the given parts into a package
pub fn zip_parts(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// DOCX package with the given body blocks and core properties
pub fn build_docx(blocks: &str) -> Vec<u8> {
    let document = document_xml(blocks);
    zip_parts(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", &document),
        ("docProps/core.xml", CORE_XML),
    ])
}

/// The resume scenario: two level-1 headings and one 3x2 table
pub fn resume_docx() -> Vec<u8> {
    let blocks = [
        paragraph(Some("Heading1"), "Experience"),
        paragraph(None, "Engineer at Example Corp, 2019-2024."),
        table(&[
            &["Skill", "Years"],
            &["Rust", "5"],
            &["SQL", "8"],
        ]),
        paragraph(Some("Heading1"), "Education"),
        paragraph(None, "BSc Computer Science."),
    ]
    .concat();
    build_docx(&blocks)
}
