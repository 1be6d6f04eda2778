//! OpenDocument text and spreadsheet packages.

use std::path::Path;

use anyhow::Result;
use chrono::Local;
use quick_xml::escape::escape;

use crate::document_store::{SheetGrid, TableGrid};
use crate::xml_package::{element_texts, open_package, parse_body, read_entry, read_required_entry, write_package, BodyDialect};

pub const ODT_MIMETYPE: &str = "application/vnd.oasis.opendocument.text";
pub const ODS_MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

const OFFICE_NAMESPACES: &str = r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:meta="urn:oasis:names:tc:opendocument:xmlns:meta:1.0" office:version="1.3""#;

const ODF_BODY: BodyDialect = BodyDialect {
    paragraphs: &[b"text:p", b"text:h"],
    text_run: None,
    inline_run: None,
    space: Some(b"text:s"),
    space_count_attr: Some(b"text:c"),
    tabs: &[b"text:tab"],
    breaks: &[b"text:line-break"],
    table: b"table:table",
    table_name_attr: Some(b"table:name"),
    row: b"table:table-row",
    cells: &[b"table:table-cell", b"table:covered-table-cell"],
    cell_repeat_attr: Some(b"table:number-columns-repeated"),
};

/// Plain text of an OpenDocument text file, one line per paragraph or heading
pub fn read_odt_text(path: &Path) -> Result<String> {
    let content = read_required_entry(path, "content.xml")?;
    Ok(parse_body(&content, &ODF_BODY)?.text())
}

/// Tables of an OpenDocument text file, in document order
pub fn read_odt_tables(path: &Path) -> Result<Vec<TableGrid>> {
    let content = read_required_entry(path, "content.xml")?;
    Ok(parse_body(&content, &ODF_BODY)?.tables)
}

/// Descriptive fields from `meta.xml`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Read `meta.xml`; packages without one yield empty properties
pub fn read_odf_properties(path: &Path) -> Result<PackageProperties> {
    let mut archive = open_package(path)?;
    let Some(meta) = read_entry(&mut archive, "meta.xml")? else {
        return Ok(PackageProperties::default());
    };
    let mut found = element_texts(
        &meta,
        &[b"dc:title", b"dc:creator", b"meta:initial-creator", b"dc:subject", b"meta:creation-date", b"dc:date"],
    )?
    .into_iter();
    let mut next = || found.next().flatten();
    let title = next();
    let creator = next();
    let initial_creator = next();
    Ok(PackageProperties {
        title,
        author: creator.or(initial_creator),
        subject: next(),
        created: next(),
        modified: next(),
    })
}

/// Encode one line of text as ODF paragraph content, keeping runs of spaces and tabs
fn encode_line(line: &str) -> String {
    let mut out = String::new();
    let mut pending_spaces = 0usize;
    let mut at_start = true;

    let flush = |out: &mut String, spaces: &mut usize, at_start: bool| {
        if *spaces == 0 {
            return;
        }
        // A leading space or any space after the first in a run must be explicit
        let literal = if at_start { 0 } else { 1 };
        if literal == 1 {
            out.push(' ');
        }
        let explicit = *spaces - literal;
        if explicit == 1 {
            out.push_str("<text:s/>");
        } else if explicit > 1 {
            out.push_str(&format!("<text:s text:c=\"{}\"/>", explicit));
        }
        *spaces = 0;
    };

    for c in line.chars() {
        match c {
            ' ' => pending_spaces += 1,
            '\t' => {
                flush(&mut out, &mut pending_spaces, at_start);
                out.push_str("<text:tab/>");
                at_start = false;
            }
            _ => {
                flush(&mut out, &mut pending_spaces, at_start);
                let mut buf = [0u8; 4];
                out.push_str(&escape(&*c.encode_utf8(&mut buf)));
                at_start = false;
            }
        }
    }
    // Trailing spaces are dropped by ODF consumers unless explicit
    if pending_spaces > 0 {
        out.push_str(&format!("<text:s text:c=\"{}\"/>", pending_spaces));
    }
    out
}

fn manifest(mimetype: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.3">
 <manifest:file-entry manifest:full-path="/" manifest:media-type="{}"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
 <manifest:file-entry manifest:full-path="styles.xml" manifest:media-type="text/xml"/>
 <manifest:file-entry manifest:full-path="meta.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#,
        mimetype
    )
}

fn meta() -> String {
    let now = Local::now().format("%Y-%m-%dT%H:%M:%S");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-meta {}><office:meta><meta:generator>{}/{}</meta:generator><meta:creation-date>{}</meta:creation-date><dc:date>{}</dc:date></office:meta></office:document-meta>"#,
        OFFICE_NAMESPACES,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        now,
        now
    )
}

fn styles() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-styles {}><office:styles><style:default-style style:family="paragraph"><style:text-properties fo:font-size="12pt"/></style:default-style><style:style style:name="Standard" style:family="paragraph" style:class="text"/></office:styles></office:document-styles>"#,
        OFFICE_NAMESPACES
    )
}

/// Write text as an OpenDocument text package, one paragraph per line
pub fn write_odt(path: &Path, text: &str) -> Result<()> {
    let paragraphs: String = text
        .split('\n')
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            format!("<text:p text:style-name=\"Standard\">{}</text:p>", encode_line(line))
        })
        .collect();

    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content {}><office:body><office:text>{}</office:text></office:body></office:document-content>"#,
        OFFICE_NAMESPACES, paragraphs
    );

    write_package(
        path,
        Some(ODT_MIMETYPE),
        &[
            ("META-INF/manifest.xml", manifest(ODT_MIMETYPE)),
            ("content.xml", content),
            ("styles.xml", styles()),
            ("meta.xml", meta()),
        ],
    )
}

/// Write sheet grids as an OpenDocument spreadsheet with string cells
pub fn write_ods(path: &Path, sheets: &[SheetGrid]) -> Result<()> {
    let mut tables = String::new();
    for (i, sheet) in sheets.iter().enumerate() {
        let name = if sheet.name.trim().is_empty() { format!("Sheet{}", i + 1) } else { sheet.name.clone() };
        tables.push_str(&format!("<table:table table:name=\"{}\">", escape(name.as_str())));
        for row in &sheet.rows {
            tables.push_str("<table:table-row>");
            for cell in row {
                if cell.is_empty() {
                    tables.push_str("<table:table-cell/>");
                } else {
                    tables.push_str(&format!(
                        "<table:table-cell office:value-type=\"string\"><text:p>{}</text:p></table:table-cell>",
                        encode_line(cell)
                    ));
                }
            }
            tables.push_str("</table:table-row>");
        }
        if sheet.rows.is_empty() {
            tables.push_str("<table:table-row><table:table-cell/></table:table-row>");
        }
        tables.push_str("</table:table>");
    }
    if sheets.is_empty() {
        tables.push_str("<table:table table:name=\"Sheet1\"><table:table-row><table:table-cell/></table:table-row></table:table>");
    }

    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content {}><office:body><office:spreadsheet>{}</office:spreadsheet></office:body></office:document-content>"#,
        OFFICE_NAMESPACES, tables
    );

    write_package(
        path,
        Some(ODS_MIMETYPE),
        &[
            ("META-INF/manifest.xml", manifest(ODS_MIMETYPE)),
            ("content.xml", content),
            ("styles.xml", styles()),
            ("meta.xml", meta()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_encode_line_preserves_whitespace() {
        assert_eq!(encode_line("a b"), "a b");
        assert_eq!(encode_line("a   b"), "a <text:s text:c=\"2\"/>b");
        assert_eq!(encode_line(" a"), "<text:s/>a");
        assert_eq!(encode_line("a\tb"), "a<text:tab/>b");
        assert_eq!(encode_line("x < y & z"), "x &lt; y &amp; z");
    }

    #[test]
    fn test_encode_line_multibyte_characters() {
        assert_eq!(encode_line("Café \"ü\" → €"), "Café &quot;ü&quot; → €");

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unicode.odt");
        write_odt(&path, "Grüße aus Zürich & 東京").unwrap();
        assert_eq!(read_odt_text(&path).unwrap(), "Grüße aus Zürich & 東京");
    }

    #[test]
    fn test_odt_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.odt");
        let text = "Title\n\nFirst  paragraph with <angle> & ampersand.\n\tIndented";
        write_odt(&path, text).unwrap();

        assert_eq!(read_odt_text(&path).unwrap(), text);
        assert!(read_odt_tables(&path).unwrap().is_empty());

        let properties = read_odf_properties(&path).unwrap();
        assert!(properties.created.is_some());
        assert_eq!(properties.title, None);
    }

    #[test]
    fn test_ods_is_a_valid_package() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grid.ods");
        let sheets = vec![SheetGrid {
            name: "Data".to_string(),
            rows: vec![vec!["Name".to_string(), "Qty".to_string()], vec!["Tea".to_string(), "3".to_string()]],
        }];
        write_ods(&path, &sheets).unwrap();

        let mut archive = open_package(&path).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "mimetype");
        let content = read_entry(&mut archive, "content.xml").unwrap().unwrap();
        assert!(content.contains("<table:table table:name=\"Data\">"));
        assert!(content.contains("<text:p>Tea</text:p>"));
    }
}
