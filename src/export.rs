//! PDF and Word export of survey drafts.
//!
//! Both exporters turn every non-blank line of the survey into one paragraph
//! and return the finished file as an in-memory buffer ready for download.

use crate::error::{Result, SurveyError};
use docx_rs::{Docx, Paragraph, Run};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// US Letter, in points
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 12;
/// Space after each paragraph
const PARAGRAPH_SPACING: i64 = 8;

/// Download format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => PDF_MIME,
            ExportFormat::Docx => DOCX_MIME,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "literature_survey.pdf",
            ExportFormat::Docx => "literature_survey.docx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => f.write_str("pdf"),
            ExportFormat::Docx => f.write_str("docx"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" | "word" => Ok(ExportFormat::Docx),
            other => Err(SurveyError::Validation(format!(
                "Unknown export format '{}', expected pdf or docx",
                other
            ))),
        }
    }
}

/// A rendered document and how to serve it
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub file_name: &'static str,
}

/// Render `text` in the requested format
pub fn export(text: &str, format: ExportFormat) -> Result<ExportedDocument> {
    let bytes = match format {
        ExportFormat::Pdf => export_pdf(text)?,
        ExportFormat::Docx => export_docx(text)?,
    };
    debug!(format = %format, bytes = bytes.len(), "Exported survey");

    Ok(ExportedDocument {
        bytes,
        mime: format.mime(),
        file_name: format.file_name(),
    })
}

/// Trimmed non-blank lines, one per paragraph
fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

// ============================================================================
// Word
// ============================================================================

/// Word document with one paragraph per non-blank line
pub fn export_docx(text: &str) -> Result<Vec<u8>> {
    let docx = paragraphs(text).fold(Docx::new(), |docx, line| {
        docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)))
    });

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| SurveyError::Export(format!("Failed to pack docx: {}", e)))?;

    Ok(cursor.into_inner())
}

// ============================================================================
// PDF
// ============================================================================

/// Approximate Helvetica advance width in 1/1000 em
fn glyph_width(c: char) -> i64 {
    match c {
        'i' | 'j' | 'l' | '\'' | '|' | '.' | ',' | ':' | ';' | '!' => 250,
        ' ' | 'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' | '/' => 333,
        'm' | 'M' | 'W' => 833,
        'w' => 722,
        c if c.is_ascii_uppercase() => 700,
        c if c.is_ascii_digit() => 556,
        _ => 556,
    }
}

fn text_width(s: &str) -> i64 {
    s.chars().map(glyph_width).sum::<i64>() * FONT_SIZE / 1000
}

/// Greedy word wrap to `max_width` points; words wider than a line are split
fn wrap_line(line: &str, max_width: i64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        for c in word.chars() {
            current.push(c);
            if text_width(&current) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Encode for the WinAnsi base font; unmapped characters become `?`
fn win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Lay out paragraphs into pages of `(y, line)` baselines
fn layout(text: &str) -> Vec<Vec<(i64, String)>> {
    let max_width = PAGE_WIDTH - 2 * MARGIN;
    let top = PAGE_HEIGHT - MARGIN;

    let mut pages = Vec::new();
    let mut page = Vec::new();
    let mut y = top;

    for paragraph in paragraphs(text) {
        for line in wrap_line(paragraph, max_width) {
            if y - LEADING < MARGIN {
                pages.push(std::mem::take(&mut page));
                y = top;
            }
            y -= LEADING;
            page.push((y, line));
        }
        y -= PARAGRAPH_SPACING;
    }

    if !page.is_empty() || pages.is_empty() {
        pages.push(page);
    }
    pages
}

fn page_content(lines: &[(i64, String)]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 4);
    for (y, line) in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec!["F1".into(), Object::Integer(FONT_SIZE)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(MARGIN), Object::Integer(*y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(line), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Paginated PDF with one paragraph per non-blank line
pub fn export_pdf(text: &str) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let pages = layout(text);
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in &pages {
        let encoded = page_content(lines)
            .encode()
            .map_err(|e| SurveyError::Export(format!("Failed to encode page: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Count" => Object::Integer(kids.len() as i64),
        "Kids" => kids,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Literature Survey Draft"),
        "Producer" => Object::string_literal(concat!("litsurvey ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| SurveyError::Export(format!("Failed to write PDF: {}", e)))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURVEY: &str = "1. Background\n\nGraphene anodes improve capacity.\n   \n2. Key Themes\n- Stability\n";

    fn docx_paragraphs(bytes: &[u8]) -> Vec<String> {
        let docx = docx_rs::read_docx(bytes).expect("valid docx");
        docx.document
            .children
            .iter()
            .filter_map(|child| match child {
                docx_rs::DocumentChild::Paragraph(p) => Some(
                    p.children
                        .iter()
                        .filter_map(|pc| match pc {
                            docx_rs::ParagraphChild::Run(run) => Some(
                                run.children
                                    .iter()
                                    .filter_map(|rc| match rc {
                                        docx_rs::RunChild::Text(t) => Some(t.text.clone()),
                                        _ => None,
                                    })
                                    .collect::<String>(),
                            ),
                            _ => None,
                        })
                        .collect::<String>(),
                ),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_docx_one_paragraph_per_non_blank_line() {
        let bytes = export_docx(SURVEY).expect("docx");
        assert_eq!(&bytes[..2], b"PK");
        assert_eq!(
            docx_paragraphs(&bytes),
            vec![
                "1. Background",
                "Graphene anodes improve capacity.",
                "2. Key Themes",
                "- Stability"
            ]
        );
    }

    #[test]
    fn test_pdf_is_loadable() {
        let bytes = export_pdf(SURVEY).expect("pdf");
        assert!(bytes.starts_with(b"%PDF-"));
        let doc = Document::load_mem(&bytes).expect("reload");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_pdf_empty_text_has_one_page() {
        let bytes = export_pdf("\n  \n").expect("pdf");
        let doc = Document::load_mem(&bytes).expect("reload");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_long_text_paginates() {
        let text = (0..200)
            .map(|i| format!("Paragraph {} about research gaps.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = export_pdf(&text).expect("pdf");
        let doc = Document::load_mem(&bytes).expect("reload");
        // 20pt per paragraph over 648pt of usable height
        assert!(doc.get_pages().len() >= 6);
    }

    #[test]
    fn test_layout_counts_lines_and_spacing() {
        let pages = layout("a\n\nb");
        assert_eq!(pages.len(), 1);
        let ys: Vec<i64> = pages[0].iter().map(|(y, _)| *y).collect();
        assert_eq!(ys, vec![720 - LEADING, 720 - 2 * LEADING - PARAGRAPH_SPACING]);
    }

    #[test]
    fn test_wrap_line_respects_width() {
        let line = "word ".repeat(200);
        let wrapped = wrap_line(line.trim(), 468);
        assert!(wrapped.len() > 1);
        assert!(wrapped.iter().all(|l| text_width(l) <= 468));
        assert_eq!(wrapped.join(" "), line.trim());
    }

    #[test]
    fn test_wrap_line_splits_long_word() {
        let word = "x".repeat(300);
        let wrapped = wrap_line(&word, 100);
        assert!(wrapped.len() > 1);
        assert_eq!(wrapped.concat(), word);
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi("café – “ok”"), vec![b'c', b'a', b'f', 0xe9, b' ', 0x96, b' ', 0x93, b'o', b'k', 0x94]);
        assert_eq!(win_ansi("石墨烯"), b"???".to_vec());
    }

    #[test]
    fn test_export_format() {
        let doc = export("hello", ExportFormat::Docx).expect("export");
        assert_eq!(doc.mime, DOCX_MIME);
        assert_eq!(doc.file_name, "literature_survey.docx");
        assert_eq!("PDF".parse::<ExportFormat>().expect("format"), ExportFormat::Pdf);
        assert!("odt".parse::<ExportFormat>().is_err());
    }
}
