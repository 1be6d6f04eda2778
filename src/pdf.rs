use std::path::Path;

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 12;
const CHARS_PER_LINE: usize = 80;
const LINES_PER_PAGE: usize = 60;

/// Extract the text layer of a PDF
pub fn extract_text(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .with_context(|| format!("Failed to extract text with pdf-extract: {}", path.display()))
}

/// Number of pages, read from the page tree
pub fn page_count(path: &Path) -> Result<usize> {
    match Document::load(path) {
        Ok(document) => Ok(document.get_pages().len()),
        Err(e) => {
            log::warn!("lopdf could not load {}: {}; estimating pages from text", path.display(), e);
            let text = extract_text(path)?;
            Ok(text.matches('\x0C').count().max(1))
        }
    }
}

/// Wrap a line to the page width, breaking at spaces where possible
fn wrap_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line
        .chars()
        .map(|c| match c {
            '\t' => ' ',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect();
    if chars.is_empty() {
        return vec![String::new()];
    }

    let mut wrapped = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + CHARS_PER_LINE).min(chars.len());
        if end < chars.len() {
            if let Some(space) = chars[start..end].iter().rposition(|c| *c == ' ') {
                if space > 0 {
                    end = start + space + 1;
                }
            }
        }
        wrapped.push(chars[start..end].iter().collect::<String>().trim_end().to_string());
        start = end;
    }
    wrapped
}

fn page_operations(lines: &[String]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(FONT_SIZE)]),
        Operation::new("TL", vec![Object::Integer(LEADING)]),
        Operation::new("Td", vec![Object::Integer(MARGIN), Object::Integer(PAGE_HEIGHT - MARGIN)]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_bytes().to_vec())]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

/// Write text as a plain monospaced PDF. Characters outside printable ASCII become `?`.
pub fn write_pdf(path: &Path, text: &str) -> Result<()> {
    let lines: Vec<String> = text.split('\n').flat_map(|l| wrap_line(l.trim_end_matches('\r'))).collect();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for chunk in lines.chunks(LINES_PER_PAGE) {
        let content = Content { operations: page_operations(chunk) };
        let encoded = content.encode().context("Failed to encode PDF page content")?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(count),
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Integer(PAGE_WIDTH), Object::Integer(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path).with_context(|| format!("Failed to save PDF: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wrap_line() {
        assert_eq!(wrap_line(""), vec![""]);
        assert_eq!(wrap_line("naïve\ttext"), vec!["na?ve text"]);

        let long = "word ".repeat(30);
        let wrapped = wrap_line(long.trim());
        assert!(wrapped.len() > 1);
        assert!(wrapped.iter().all(|l| l.chars().count() <= CHARS_PER_LINE));
        assert_eq!(wrapped.join(" ").split_whitespace().count(), 30);
    }

    #[test]
    fn test_pdf_page_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");
        let text = (1..=130).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        write_pdf(&path, &text).unwrap();
        assert_eq!(page_count(&path).unwrap(), 3);
    }
}
