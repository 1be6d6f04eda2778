use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use docx_rs::{Docx, Paragraph, Run};

use crate::document_store::TableGrid;
use crate::odf::PackageProperties;
use crate::xml_package::{element_texts, open_package, parse_body, read_entry, read_required_entry, BodyDialect};

const WORD_BODY: BodyDialect = BodyDialect {
    paragraphs: &[b"w:p"],
    text_run: Some(b"w:t"),
    inline_run: Some(b"w:r"),
    space: None,
    space_count_attr: None,
    tabs: &[b"w:tab"],
    breaks: &[b"w:br", b"w:cr"],
    table: b"w:tbl",
    table_name_attr: None,
    row: b"w:tr",
    cells: &[b"w:tc"],
    cell_repeat_attr: None,
};

/// Plain text of a Word document, one line per paragraph
pub fn read_docx_text(path: &Path) -> Result<String> {
    let document = read_required_entry(path, "word/document.xml")?;
    Ok(parse_body(&document, &WORD_BODY)?.text())
}

/// Tables of a Word document, in document order
pub fn read_docx_tables(path: &Path) -> Result<Vec<TableGrid>> {
    let document = read_required_entry(path, "word/document.xml")?;
    Ok(parse_body(&document, &WORD_BODY)?.tables)
}

/// Core properties (`docProps/core.xml`) shared by Word and Excel packages
pub fn read_core_properties(path: &Path) -> Result<PackageProperties> {
    let mut archive = open_package(path)?;
    let Some(core) = read_entry(&mut archive, "docProps/core.xml")? else {
        return Ok(PackageProperties::default());
    };
    let mut found = element_texts(
        &core,
        &[b"dc:title", b"dc:creator", b"dc:subject", b"dcterms:created", b"dcterms:modified"],
    )?
    .into_iter();
    let mut next = || found.next().flatten();
    Ok(PackageProperties {
        title: next(),
        author: next(),
        subject: next(),
        created: next(),
        modified: next(),
    })
}

/// Write text as a Word document, one paragraph per line
pub fn write_docx(path: &Path, text: &str) -> Result<()> {
    let docx = text.split('\n').fold(Docx::new(), |docx, line| {
        let line = line.strip_suffix('\r').unwrap_or(line);
        docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)))
    });

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    docx.build()
        .pack(file)
        .map_err(|e| anyhow!("Failed to write DOCX {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_docx_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("letter.docx");
        write_docx(&path, "Dear reader,\nThanks for the A&B report.").unwrap();

        let text = read_docx_text(&path).unwrap();
        assert_eq!(text, "Dear reader,\nThanks for the A&B report.");
        assert!(read_docx_tables(&path).unwrap().is_empty());
    }

    #[test]
    fn test_word_tables_and_tab_stops() {
        let xml = r#"<w:document><w:body>
            <w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Head</w:t><w:tab/><w:t>line</w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
            </w:body></w:document>"#;
        let body = parse_body(xml, &WORD_BODY).unwrap();
        assert_eq!(body.paragraphs[0], "Head\tline");
        assert_eq!(body.tables[0].name, "Table1");
        assert_eq!(body.tables[0].rows, vec![vec!["a", "b"]]);
    }
}
