//! HTML to PDF text layout.
//!
//! The rendered HTML is flattened into lines (block elements break lines, table
//! cells are joined with separators) and written as Helvetica text on A4 pages.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use scraper::{ElementRef, Html, Node};

use crate::errors::ServiceError;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const BODY_SIZE: i64 = 10;
const HEADING_SIZE: i64 = 14;
const BODY_LEADING: i64 = 14;
const HEADING_LEADING: i64 = 22;
const BODY_WRAP: usize = 95;
const HEADING_WRAP: usize = 65;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLine {
    pub text: String,
    pub heading: bool,
}

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "header", "footer", "article", "table", "thead", "tbody", "tr",
    "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "br", "body",
];
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3"];
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "title"];

#[derive(Default)]
struct LineCollector {
    lines: Vec<PdfLine>,
    current: String,
    heading: bool,
}

impl LineCollector {
    fn push_text(&mut self, text: &str) {
        for word in text.split_whitespace() {
            if !self.current.is_empty() && !self.current.ends_with(' ') {
                self.current.push(' ');
            }
            self.current.push_str(word);
        }
    }

    fn separator(&mut self, sep: &str) {
        if !self.current.trim().is_empty() {
            self.current.push_str(sep);
        }
    }

    fn break_line(&mut self) {
        let text = self.current.trim().trim_end_matches('|').trim().to_string();
        if !text.is_empty() {
            self.lines.push(PdfLine {
                text,
                heading: self.heading,
            });
        }
        self.current.clear();
    }

    fn blank(&mut self) {
        self.break_line();
        if self.lines.last().map(|l| !l.text.is_empty()).unwrap_or(false) {
            self.lines.push(PdfLine {
                text: String::new(),
                heading: false,
            });
        }
    }
}

fn walk(element: ElementRef<'_>, out: &mut LineCollector) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }

    let is_block = BLOCK_TAGS.contains(&name);
    let is_heading = HEADING_TAGS.contains(&name);
    if is_block {
        out.break_line();
    }
    if is_heading {
        out.heading = true;
    }
    if name == "hr" {
        out.lines.push(PdfLine {
            text: "-".repeat(BODY_WRAP),
            heading: false,
        });
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_text(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                }
            }
            _ => {}
        }
    }

    match name {
        "td" | "th" => out.separator(" | "),
        "h1" | "h2" | "h3" | "table" => {
            out.break_line();
            out.heading = false;
            out.blank();
        }
        _ if is_block => out.break_line(),
        _ => {}
    }
}

/// Flattens an HTML document into printable lines.
pub fn html_to_lines(html: &str) -> Vec<PdfLine> {
    let document = Html::parse_document(html);
    let mut out = LineCollector::default();
    walk(document.root_element(), &mut out);
    out.break_line();
    while out.lines.last().map(|l| l.text.is_empty()).unwrap_or(false) {
        out.lines.pop();
    }
    out.lines
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// WinAnsi bytes for Helvetica; characters outside Latin-1 become '?'.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code < 256 {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

fn page_content(lines: &[(String, bool)]) -> Content {
    let mut operations = vec![Operation::new("BT", vec![])];
    let mut y = PAGE_HEIGHT - MARGIN;
    let mut first = true;

    for (text, heading) in lines {
        let (font, size, leading) = if *heading {
            ("F2", HEADING_SIZE, HEADING_LEADING)
        } else {
            ("F1", BODY_SIZE, BODY_LEADING)
        };
        operations.push(Operation::new("Tf", vec![font.into(), size.into()]));
        if first {
            operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
            first = false;
        } else {
            operations.push(Operation::new("Td", vec![0.into(), (-leading).into()]));
        }
        y -= leading;
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_text(text))],
        ));
    }

    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Splits laid-out lines into pages by their leading.
fn paginate(lines: &[PdfLine]) -> Vec<Vec<(String, bool)>> {
    let usable = PAGE_HEIGHT - 2 * MARGIN;
    let mut pages: Vec<Vec<(String, bool)>> = vec![Vec::new()];
    let mut used = 0;

    for line in lines {
        let (width, leading) = if line.heading {
            (HEADING_WRAP, HEADING_LEADING)
        } else {
            (BODY_WRAP, BODY_LEADING)
        };
        for piece in wrap(&line.text, width) {
            if used + leading > usable {
                pages.push(Vec::new());
                used = 0;
            }
            used += leading;
            if let Some(page) = pages.last_mut() {
                page.push((piece, line.heading));
            }
        }
    }
    pages
}

/// Renders lines as an A4 PDF document.
pub fn lines_to_pdf(title: &str, lines: &[PdfLine]) -> Result<Vec<u8>, ServiceError> {
    let pdf_err = |e: lopdf::Error| ServiceError::DocumentError(format!("pdf: {}", e));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page_lines in paginate(lines) {
        let content = page_content(&page_lines);
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(pdf_err)?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_text(title)),
        "Producer" => Object::string_literal("studio-booking-api"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ServiceError::DocumentError(format!("pdf: {}", e)))?;
    Ok(bytes)
}

pub fn html_to_pdf(title: &str, html: &str) -> Result<Vec<u8>, ServiceError> {
    lines_to_pdf(title, &html_to_lines(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_blocks_and_tables() {
        let lines = html_to_lines(
            "<html><head><title>x</title><style>p{}</style></head><body>\
             <h1>Kwitansi</h1><p>Telah terima   dari <b>Rina</b></p>\
             <table><tr><td>DP</td><td>Rp 250.000</td></tr></table></body></html>",
        );
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Kwitansi", "", "Telah terima dari Rina", "DP | Rp 250.000"]
        );
        assert!(lines[0].heading);
        assert!(!lines[2].heading);
    }

    #[test]
    fn produces_a_loadable_pdf_with_pagination() {
        let lines: Vec<PdfLine> = (0..150)
            .map(|i| PdfLine {
                text: format!("Baris ke-{} dengan teks yang cukup panjang", i),
                heading: i % 50 == 0,
            })
            .collect();
        let bytes = lines_to_pdf("Uji", &lines).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 3);
    }

    #[test]
    fn wraps_long_lines() {
        let long = "kata ".repeat(60);
        let wrapped = wrap(&long, 20);
        assert!(wrapped.len() > 1);
        assert!(wrapped.iter().all(|l| l.chars().count() <= 20));
    }
}
