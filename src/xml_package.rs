//! Zip package access and a streaming body parser shared by the OpenDocument
//! and WordprocessingML readers.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::document_store::TableGrid;

/// Columns produced by one repeated cell are capped at this many
const MAX_REPEATED_CELLS: usize = 64;

/// Open a zip-based document package
pub fn open_package(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open document: {}", path.display()))?;
    ZipArchive::new(file).with_context(|| format!("Failed to read {} as a ZIP package", path.display()))
}

/// Read one entry of a package as UTF-8, `None` when the entry is absent
pub fn read_entry(archive: &mut ZipArchive<File>, entry: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to open package entry {}", entry)),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("Failed to read package entry {}", entry))?;
    Ok(Some(content))
}

/// Read a required entry from the package at `path`
pub fn read_required_entry(path: &Path, entry: &str) -> Result<String> {
    let mut archive = open_package(path)?;
    read_entry(&mut archive, entry)?
        .with_context(|| format!("{} has no {} entry", path.display(), entry))
}

/// Write a new package. A `mimetype` entry, when given, goes first and uncompressed.
pub fn write_package(path: &Path, mimetype: Option<&str>, entries: &[(&str, String)]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ZipWriter::new(file);

    if let Some(mimetype) = mimetype {
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file("mimetype", stored)?;
        writer.write_all(mimetype.as_bytes())?;
    }

    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        writer
            .start_file(*name, deflated)
            .with_context(|| format!("Failed to add {} to {}", name, path.display()))?;
        writer.write_all(content.as_bytes())?;
    }

    writer.finish().with_context(|| format!("Failed to finish {}", path.display()))?;
    Ok(())
}

/// Value of an attribute on a start tag, if present
pub fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Text for a general entity reference (`amp`, `#38`, `#x26`)
pub fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Element names that make up a document body in one markup dialect
#[derive(Debug, Clone, Copy)]
pub struct BodyDialect {
    pub paragraphs: &'static [&'static [u8]],
    /// When set, only text inside this element counts
    pub text_run: Option<&'static [u8]>,
    /// When set, tabs and breaks only count inside this element
    pub inline_run: Option<&'static [u8]>,
    pub space: Option<&'static [u8]>,
    pub space_count_attr: Option<&'static [u8]>,
    pub tabs: &'static [&'static [u8]],
    pub breaks: &'static [&'static [u8]],
    pub table: &'static [u8],
    pub table_name_attr: Option<&'static [u8]>,
    pub row: &'static [u8],
    pub cells: &'static [&'static [u8]],
    pub cell_repeat_attr: Option<&'static [u8]>,
}

/// Paragraph text and tables found in a document body
#[derive(Debug, Clone, Default)]
pub struct ParsedBody {
    pub paragraphs: Vec<String>,
    pub tables: Vec<TableGrid>,
}

impl ParsedBody {
    /// Paragraphs joined by line breaks
    pub fn text(&self) -> String {
        self.paragraphs.join("\n")
    }
}

#[derive(Debug, Default)]
struct TableBuilder {
    name: Option<String>,
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<(String, usize)>,
}

impl TableBuilder {
    fn push_cell(&mut self, text: String, repeat: usize) {
        if let Some(row) = self.row.as_mut() {
            for _ in 0..repeat.clamp(1, MAX_REPEATED_CELLS) {
                row.push(text.clone());
            }
        }
    }

    fn finish(self, index: usize) -> TableGrid {
        let rows: Vec<Vec<String>> = self
            .rows
            .into_iter()
            .map(|mut row| {
                while row.last().is_some_and(|cell| cell.trim().is_empty()) {
                    row.pop();
                }
                row
            })
            .collect();
        let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        TableGrid {
            name: self.name.unwrap_or_else(|| format!("Table{}", index + 1)),
            index,
            rows,
            column_count,
        }
    }
}

/// Walk a body XML document and collect its paragraphs and tables in order.
/// Table cell paragraphs are part of the text as well.
pub fn parse_body(xml: &str, dialect: &BodyDialect) -> Result<ParsedBody> {
    let mut reader = Reader::from_str(xml);
    let mut body = ParsedBody::default();
    let mut open_paragraphs: Vec<String> = Vec::new();
    let mut tables: Vec<TableBuilder> = Vec::new();
    let mut text_run_depth = 0usize;
    let mut inline_run_depth = 0usize;

    let in_text = |open: &Vec<String>, depth: usize| !open.is_empty() && (dialect.text_run.is_none() || depth > 0);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if dialect.paragraphs.contains(&name) {
                    open_paragraphs.push(String::new());
                } else if Some(name) == dialect.text_run {
                    text_run_depth += 1;
                } else if Some(name) == dialect.inline_run {
                    inline_run_depth += 1;
                } else if name == dialect.table {
                    let name = dialect.table_name_attr.and_then(|attr| attribute(&e, attr));
                    tables.push(TableBuilder { name, ..Default::default() });
                } else if name == dialect.row {
                    if let Some(table) = tables.last_mut() {
                        table.row = Some(Vec::new());
                    }
                } else if dialect.cells.contains(&name) {
                    let repeat = cell_repeat(&e, dialect);
                    if let Some(table) = tables.last_mut() {
                        table.cell = Some((String::new(), repeat));
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let name = name.as_ref();
                let inline_ok = dialect.inline_run.is_none() || inline_run_depth > 0;
                if dialect.paragraphs.contains(&name) {
                    if tables.last().is_none_or(|t| t.cell.is_none()) {
                        body.paragraphs.push(String::new());
                    }
                } else if Some(name) == dialect.space {
                    let count = dialect
                        .space_count_attr
                        .and_then(|attr| attribute(&e, attr))
                        .and_then(|c| c.parse::<usize>().ok())
                        .unwrap_or(1);
                    if let Some(open) = open_paragraphs.last_mut() {
                        open.push_str(&" ".repeat(count));
                    }
                } else if dialect.tabs.contains(&name) && inline_ok {
                    if let Some(open) = open_paragraphs.last_mut() {
                        open.push('\t');
                    }
                } else if dialect.breaks.contains(&name) && inline_ok {
                    if let Some(open) = open_paragraphs.last_mut() {
                        open.push('\n');
                    }
                } else if dialect.cells.contains(&name) {
                    let repeat = cell_repeat(&e, dialect);
                    if let Some(table) = tables.last_mut() {
                        table.push_cell(String::new(), repeat);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if dialect.paragraphs.contains(&name) {
                    if let Some(text) = open_paragraphs.pop() {
                        if let Some((cell, _)) = tables.last_mut().and_then(|t| t.cell.as_mut()) {
                            if !cell.is_empty() {
                                cell.push('\n');
                            }
                            cell.push_str(&text);
                        }
                        match open_paragraphs.last_mut() {
                            // Nested paragraphs (notes, frames) stay inline with their parent
                            Some(parent) => parent.push_str(&text),
                            None => body.paragraphs.push(text),
                        }
                    }
                } else if Some(name) == dialect.text_run {
                    text_run_depth = text_run_depth.saturating_sub(1);
                } else if Some(name) == dialect.inline_run {
                    inline_run_depth = inline_run_depth.saturating_sub(1);
                } else if dialect.cells.contains(&name) {
                    if let Some(table) = tables.last_mut() {
                        if let Some((text, repeat)) = table.cell.take() {
                            table.push_cell(text, repeat);
                        }
                    }
                } else if name == dialect.row {
                    if let Some(table) = tables.last_mut() {
                        if let Some(row) = table.row.take() {
                            table.rows.push(row);
                        }
                    }
                } else if name == dialect.table {
                    if let Some(table) = tables.pop() {
                        let index = body.tables.len();
                        body.tables.push(table.finish(index));
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_text(&open_paragraphs, text_run_depth) {
                    let text = String::from_utf8_lossy(&e);
                    if let Some(open) = open_paragraphs.last_mut() {
                        open.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if in_text(&open_paragraphs, text_run_depth) {
                    let text = String::from_utf8_lossy(&e);
                    if let Some(open) = open_paragraphs.last_mut() {
                        open.push_str(&text);
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text(&open_paragraphs, text_run_depth) {
                    let name = String::from_utf8_lossy(&e);
                    if let (Some(c), Some(open)) = (resolve_entity(&name), open_paragraphs.last_mut()) {
                        open.push(c);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Malformed document XML at byte {}", reader.buffer_position())
                });
            }
            _ => {}
        }
    }

    Ok(body)
}

fn cell_repeat(element: &BytesStart, dialect: &BodyDialect) -> usize {
    dialect
        .cell_repeat_attr
        .and_then(|attr| attribute(element, attr))
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(1)
}

/// Text content of the first occurrence of each named element, in the order asked for
pub fn element_texts(xml: &str, names: &[&[u8]]) -> Result<Vec<Option<String>>> {
    let mut reader = Reader::from_str(xml);
    let mut found: Vec<Option<String>> = vec![None; names.len()];
    let mut current: Option<(usize, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let position = names.iter().position(|n| *n == e.name().as_ref());
                if let Some(i) = position.filter(|i| found[*i].is_none()) {
                    current = Some((i, String::new()));
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some((_, text)) = current.as_mut() {
                    if let Some(c) = resolve_entity(&String::from_utf8_lossy(&e)) {
                        text.push(c);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if let Some((i, text)) = current.take() {
                    if names[i] == e.name().as_ref() {
                        let text = text.trim().to_string();
                        found[i] = (!text.is_empty()).then_some(text);
                    } else {
                        current = Some((i, text));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e).context("Malformed metadata XML"),
            _ => {}
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: BodyDialect = BodyDialect {
        paragraphs: &[b"p"],
        text_run: None,
        inline_run: None,
        space: Some(b"s"),
        space_count_attr: Some(b"c"),
        tabs: &[b"tab"],
        breaks: &[b"br"],
        table: b"table",
        table_name_attr: Some(b"name"),
        row: b"tr",
        cells: &[b"td"],
        cell_repeat_attr: Some(b"repeat"),
    };

    #[test]
    fn test_entities() {
        assert_eq!(resolve_entity("amp"), Some('&'));
        assert_eq!(resolve_entity("#65"), Some('A'));
        assert_eq!(resolve_entity("#x263A"), Some('☺'));
        assert_eq!(resolve_entity("nbsp"), None);
    }

    #[test]
    fn test_parse_paragraphs_with_spacing() {
        let xml = r#"<doc><p>Hello<s c="2"/>world<tab/>x</p><p/><p>A &amp; B<br/>C</p></doc>"#;
        let body = parse_body(xml, &SIMPLE).unwrap();
        assert_eq!(body.paragraphs, vec!["Hello  world\tx", "", "A & B\nC"]);
        assert_eq!(body.text(), "Hello  world\tx\n\nA & B\nC");
    }

    #[test]
    fn test_parse_tables() {
        let xml = r#"<doc><p>Intro</p>
            <table name="Prices"><tr><td><p>Item</p></td><td><p>Cost</p></td></tr>
            <tr><td><p>Tea</p></td><td repeat="2"><p>3</p></td><td/></tr></table></doc>"#;
        let body = parse_body(xml, &SIMPLE).unwrap();
        assert_eq!(body.tables.len(), 1);
        let table = &body.tables[0];
        assert_eq!(table.name, "Prices");
        assert_eq!(table.rows, vec![vec!["Item", "Cost"], vec!["Tea", "3", "3"]]);
        assert_eq!(table.column_count, 3);
        assert_eq!(body.paragraphs, vec!["Intro", "Item", "Cost", "Tea", "3"]);
    }

    #[test]
    fn test_element_texts() {
        let xml = "<meta><title>Report</title><creator>Ada &amp; Co</creator><title>Second</title></meta>";
        let found = element_texts(xml, &[b"title", b"creator", b"subject"]).unwrap();
        assert_eq!(found, vec![Some("Report".to_string()), Some("Ada & Co".to_string()), None]);
    }
}
