//! Tool semantics over a [`DocumentStore`]: each handler loads documents, runs one
//! engine and formats the reply text. Failures are `Err` values the tool layer
//! turns into `ERROR: ...` results.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use futures::future::join_all;
use serde_json::{Map, Value};

use crate::document_relations::{self, SourceDocument};
use crate::document_store::{extension_of, DocumentContent, DocumentKind, DocumentStore, FsDocumentStore, SheetGrid};
use crate::modes::{
    AnalysisDepth, ComparisonMode, ExtractType, MergeStrategy, SearchMode, SplitMethod, SummaryMode, TableFormat,
    TemplateSyntax,
};
use crate::segmentation;
use crate::structure_analysis::analyze_structure;
use crate::style_transfer::StyleTransferOptions;
use crate::tables::render_tables;
use crate::template_engine::{apply_placeholders, extract_placeholders, PlaceholderBinding};
use crate::template_registry::{self, TemplateMetadata, TemplateQuery, TEMPLATE_EXTENSIONS};
use crate::text_analytics::{search, summarize};
use crate::text_utils::char_len;

/// Extensions a text document may be written as
pub const TEXT_OUTPUT_EXTENSIONS: &[&str] = &["odt", "docx", "txt", "md", "pdf"];
/// Extensions a spreadsheet may be written as
pub const GRID_OUTPUT_EXTENSIONS: &[&str] = &["ods", "csv"];
/// Formats `convert_document` accepts
pub const CONVERT_FORMATS: &[&str] = &["pdf", "docx", "odt", "txt", "md", "csv", "ods"];
/// Split sections keep the source extension only for these
const SECTION_EXTENSIONS: &[&str] = &["odt", "docx", "txt", "md"];

const SEARCH_MATCHES_SHOWN: usize = 5;
const READ_PREVIEW_ROWS: usize = 20;
const READ_PREVIEW_COLUMNS: usize = 10;
const TEMPLATE_SHEET_ROWS: usize = 100;

/// `name` unchanged when its extension is one of `allowed`, otherwise with `.default` appended
pub fn with_default_extension(name: &str, allowed: &[&str], default: &str) -> String {
    match extension_of(name) {
        Some(ext) if allowed.contains(&ext.as_str()) => name.to_string(),
        _ => format!("{}.{}", name, default),
    }
}

fn name_stem(name: &str) -> &str {
    name.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty() && !stem.ends_with('/'))
        .map(|(stem, _)| stem)
        .unwrap_or(name)
}

/// Text content laid out as sheet rows: the first `max_rows` non-empty lines, one per row
fn text_as_sheet(text: &str, max_rows: usize) -> DocumentContent {
    let mut sheets = DocumentContent::Text(text.to_string()).to_grid();
    for sheet in &mut sheets {
        sheet.rows.truncate(max_rows);
    }
    DocumentContent::Grid(sheets)
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    extension_of(name).is_some_and(|ext| extensions.contains(&ext.as_str()))
}

/// Request handlers shared by the MCP tools
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Service over a plain documents directory
    pub fn with_documents_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsDocumentStore::new(dir)))
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    fn text_of(&self, name: &str) -> Result<String> {
        Ok(self.store.extract(name)?.to_text())
    }

    pub fn create_writer_document(&self, filename: &str, content: &str) -> Result<String> {
        let name = with_default_extension(filename, TEXT_OUTPUT_EXTENSIONS, "odt");
        self.store.create_and_save(&name, &DocumentContent::Text(content.to_string()))?;
        Ok(format!("SUCCESS: Created Writer document {} with content", name))
    }

    pub fn create_calc_spreadsheet(&self, filename: &str, data: Vec<Vec<String>>) -> Result<String> {
        let name = with_default_extension(filename, GRID_OUTPUT_EXTENSIONS, "ods");
        let rows = data.len();
        let sheet = SheetGrid { name: "Sheet1".to_string(), rows: data };
        self.store.create_and_save(&name, &DocumentContent::Grid(vec![sheet]))?;
        Ok(format!("SUCCESS: Created Calc spreadsheet {} with {} rows", name, rows))
    }

    pub fn convert_document(&self, input_file: &str, output_file: &str, format: &str) -> Result<String> {
        let format = format.trim().to_lowercase();
        if !CONVERT_FORMATS.contains(&format.as_str()) {
            bail!("Unsupported format {}", format);
        }
        let output = with_default_extension(output_file, &[format.as_str()], &format);

        let content = self.store.extract(input_file)?;
        let converted = if GRID_OUTPUT_EXTENSIONS.contains(&format.as_str()) {
            DocumentContent::Grid(content.to_grid())
        } else {
            DocumentContent::Text(content.to_text())
        };
        self.store.create_and_save(&output, &converted)?;
        Ok(format!("SUCCESS: Converted {} to {} in {} format", input_file, output, format))
    }

    pub fn read_document(&self, filename: &str, extract_type: ExtractType) -> Result<String> {
        if extract_type == ExtractType::Metadata {
            return self.read_metadata(filename);
        }

        let kind = DocumentKind::from_path(&self.store.locate(filename)?);
        match self.store.extract(filename)? {
            DocumentContent::Grid(sheets) => {
                let mut parts = vec![format!("Calc Spreadsheet Content:\nTotal Sheets: {}\n", sheets.len())];
                if let Some(sheet) = sheets.first() {
                    if extract_type == ExtractType::Structured {
                        let columns = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
                        parts.push(format!("\nSheet: {}\nRows: {}\nColumns: {}", sheet.name, sheet.rows.len(), columns));
                    }
                    parts.push(format!("\nSheet '{}' Data:", sheet.name));
                    for row in sheet.rows.iter().take(READ_PREVIEW_ROWS) {
                        let cells: Vec<&str> = row.iter().take(READ_PREVIEW_COLUMNS).map(String::as_str).collect();
                        if cells.iter().any(|cell| !cell.trim().is_empty()) {
                            parts.push(cells.join(" | "));
                        }
                    }
                }
                Ok(parts.join("\n"))
            }
            DocumentContent::Text(text) => {
                let label = match kind {
                    Some(DocumentKind::Writer) => "Writer Document",
                    _ => "Document",
                };
                if extract_type == ExtractType::Structured {
                    let paragraphs = text.split('\n').filter(|line| !line.trim().is_empty()).count();
                    Ok(format!(
                        "{} Structure:\nTotal Characters: {}\nTotal Lines: {}\nNon-empty Paragraphs: {}\n\nContent:\n{}",
                        label,
                        char_len(&text),
                        text.split('\n').count(),
                        paragraphs,
                        text
                    ))
                } else {
                    Ok(format!("{} Content:\n\n{}", label, text))
                }
            }
        }
    }

    fn read_metadata(&self, filename: &str) -> Result<String> {
        let metadata = self.store.metadata(filename)?;
        let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".to_string());
        let properties = &metadata.properties;

        let mut lines = vec![
            format!("{} Metadata:", metadata.kind.label()),
            format!("Title: {}", or_na(&properties.title)),
            format!("Author: {}", or_na(&properties.author)),
        ];
        match (metadata.sheet_count, metadata.page_count) {
            (Some(sheets), _) => lines.push(format!("Sheet Count: {}", sheets)),
            (None, Some(pages)) => {
                lines.push(format!("Subject: {}", or_na(&properties.subject)));
                lines.push(format!("Page Count: {}", pages));
            }
            (None, None) => lines.push(format!("Subject: {}", or_na(&properties.subject))),
        }
        lines.push(format!("Creation Date: {}", or_na(&properties.created)));
        lines.push(format!("Modified Date: {}", or_na(&properties.modified)));
        lines.push(format!("File Size: {} bytes", metadata.size_bytes));
        lines.push(format!("File Modified: {}", metadata.modified));
        Ok(lines.join("\n"))
    }

    pub fn document_summary(&self, filename: &str, summary_type: SummaryMode, max_length: usize) -> Result<String> {
        let text = self.text_of(filename)?;
        Ok(format!(
            "Document Summary for '{}':\n\n{}",
            filename,
            summarize(&text, summary_type, max_length)
        ))
    }

    pub fn search_in_document(&self, filename: &str, search_term: &str, search_type: SearchMode) -> Result<String> {
        let text = self.text_of(filename)?;
        let outcome = search(&text, search_term, search_type);

        let mut result = format!("Search Results for '{}' in '{}':\n\n", search_term, filename);
        if outcome.total_matches == 0 {
            result.push_str("No matches found.");
            if let Some(message) = &outcome.message {
                result.push_str(&format!("\n{}", message));
            }
            return Ok(result);
        }

        result.push_str(&format!(
            "Found {} matches ({} search):\n\n",
            outcome.total_matches, search_type
        ));
        for (i, m) in outcome.matches.iter().take(SEARCH_MATCHES_SHOWN).enumerate() {
            let relevance = match (search_type, m.relevance) {
                (SearchMode::Fuzzy, Some(r)) => format!(" (relevance: {:.0}%)", r * 100.0),
                _ => String::new(),
            };
            result.push_str(&format!("Match {}{}:\n", i + 1, relevance));
            result.push_str(&format!("Context: ...{}...\n\n", m.context));
        }
        if outcome.total_matches > SEARCH_MATCHES_SHOWN {
            result.push_str(&format!(
                "... and {} more matches.",
                outcome.total_matches - SEARCH_MATCHES_SHOWN
            ));
        }
        Ok(result)
    }

    /// `table_index` below zero selects every table
    pub fn extract_tables(&self, filename: &str, table_index: i64, output_format: TableFormat) -> Result<String> {
        let mut tables = self.store.extract_tables(filename)?;
        if tables.is_empty() {
            bail!("No tables found in document or extraction failed");
        }
        if table_index >= 0 {
            let index = table_index as usize;
            if index >= tables.len() {
                bail!("Table index {} not found. Document has {} tables.", table_index, tables.len());
            }
            tables = vec![tables.swap_remove(index)];
        }
        render_tables(filename, &tables, output_format)
    }

    pub fn compare_documents(&self, file1: &str, file2: &str, comparison_type: ComparisonMode) -> Result<String> {
        self.store.locate(file1)?;
        self.store.locate(file2)?;
        let text1 = self.text_of(file1)?;
        let text2 = self.text_of(file2)?;
        Ok(document_relations::compare(&text1, &text2, file1, file2, comparison_type))
    }

    pub fn analyze_document_structure(&self, filename: &str, analysis_depth: AnalysisDepth) -> Result<String> {
        let text = self.text_of(filename)?;
        Ok(analyze_structure(&text, filename, analysis_depth))
    }

    /// Merge several documents into a new one. Sources are read concurrently;
    /// a source that exists but cannot be read is skipped and named in the reply.
    pub async fn merge_documents(
        &self,
        source_files: Vec<String>,
        output_filename: &str,
        merge_strategy: MergeStrategy,
    ) -> Result<String> {
        if source_files.is_empty() {
            bail!("No source files given");
        }
        let missing: Vec<&str> = source_files
            .iter()
            .filter(|name| !self.store.exists(name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            bail!("Files not found: {}", missing.join(", "));
        }

        let extractions = source_files.iter().cloned().map(|name| {
            let store = Arc::clone(&self.store);
            tokio::task::spawn_blocking(move || {
                let text = store.extract(&name).map(|content| content.to_text());
                (name, text)
            })
        });

        let mut sources = Vec::new();
        let mut skipped = Vec::new();
        for (joined, requested) in join_all(extractions).await.into_iter().zip(&source_files) {
            match joined {
                Ok((name, Ok(text))) => sources.push(SourceDocument::new(name, text)),
                Ok((name, Err(e))) => {
                    log::warn!("Skipping merge source {}: {:#}", name, e);
                    skipped.push(name);
                }
                Err(e) => {
                    log::warn!("Skipping merge source {}: extraction task failed: {}", requested, e);
                    skipped.push(requested.clone());
                }
            }
        }

        let output = with_default_extension(output_filename, TEXT_OUTPUT_EXTENSIONS, "odt");
        let merged = document_relations::merge_documents(&sources, merge_strategy, &output).map_err(|e| anyhow!(e))?;

        let store = Arc::clone(&self.store);
        let target = output.clone();
        tokio::task::spawn_blocking(move || store.create_and_save(&target, &DocumentContent::Text(merged))).await??;

        let mut result = format!(
            "SUCCESS: Merged {} documents into '{}' using {} strategy",
            sources.len(),
            output,
            merge_strategy
        );
        if !skipped.is_empty() {
            result.push_str(&format!("\nSkipped (could not be read): {}", skipped.join(", ")));
        }
        Ok(result)
    }

    pub fn split_document(&self, filename: &str, split_method: SplitMethod, split_criteria: Option<&str>) -> Result<String> {
        let text = self.text_of(filename)?;
        let outcome = segmentation::split(&text, filename, split_method, split_criteria);
        if let Some(error) = outcome.error {
            bail!(error);
        }

        let extension = extension_of(filename)
            .filter(|ext| SECTION_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or_else(|| "odt".to_string());
        let stem = name_stem(filename);

        let mut created = Vec::new();
        for section in &outcome.sections {
            let section_name = format!("{}_section_{}.{}", stem, section.section_number, extension);
            let body = format!("{}\n\n{}", section.title, section.content);
            self.store.create_and_save(&section_name, &DocumentContent::Text(body))?;
            created.push(format!("{} ({} words)", section_name, section.word_count));
        }

        let mut result = format!(
            "SUCCESS: Split '{}' into {} sections using '{}' method:\n\n",
            filename,
            outcome.sections.len(),
            split_method
        );
        for (i, file) in created.iter().enumerate() {
            result.push_str(&format!("{}. {}\n", i + 1, file));
        }
        Ok(result)
    }

    /// Write `text` as a template-derived document. Writer formats on either side win;
    /// otherwise a spreadsheet on either side makes the output a sheet.
    fn save_template_output(&self, source: &str, output: &str, text: String) -> Result<String> {
        let writer = has_extension(source, &["odt", "docx"]) || has_extension(output, &["odt", "docx"]);
        let spreadsheet = ["ods", "xlsx", "xls", "csv"];
        let grid = !writer && (has_extension(source, &spreadsheet) || has_extension(output, &spreadsheet));
        let output = with_default_extension(output, TEMPLATE_EXTENSIONS, if grid { "ods" } else { "odt" });
        let content = if grid {
            text_as_sheet(&text, TEMPLATE_SHEET_ROWS)
        } else {
            DocumentContent::Text(text)
        };
        self.store.create_and_save(&output, &content)?;
        Ok(output)
    }

    /// Fill a template. Placeholders are applied in the order the object lists them.
    pub fn template_apply(
        &self,
        template_filename: &str,
        output_filename: &str,
        placeholders: &Map<String, Value>,
        template_format: TemplateSyntax,
    ) -> Result<String> {
        let text = self.text_of(template_filename)?;
        let bindings: Vec<PlaceholderBinding> = placeholders
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                PlaceholderBinding::new(key.clone(), value)
            })
            .collect();

        let filled = apply_placeholders(&text, &bindings, template_format);
        let output = self.save_template_output(template_filename, output_filename, filled)?;
        Ok(format!(
            "SUCCESS: Applied template '{}' to create '{}' with {} placeholder replacements",
            template_filename,
            output,
            bindings.len()
        ))
    }

    /// Turn a document into a template and record its sidecar metadata
    pub fn template_create(
        &self,
        source_filename: &str,
        template_filename: &str,
        placeholder_markers: &[String],
        placeholder_format: TemplateSyntax,
        metadata: Map<String, Value>,
    ) -> Result<String> {
        let text = self.text_of(source_filename)?;
        let templated = extract_placeholders(&text, placeholder_markers, placeholder_format);
        let template = self.save_template_output(source_filename, template_filename, templated)?;

        let has_caller_metadata = !metadata.is_empty();
        let sidecar = TemplateMetadata::new(&template, source_filename, placeholder_markers, placeholder_format, metadata);
        template_registry::write_sidecar(&self.store.resolve(&template)?, &sidecar)?;

        let mut result = format!(
            "SUCCESS: Created template '{}' from '{}' with {} placeholders",
            template,
            source_filename,
            placeholder_markers.len()
        );
        if has_caller_metadata {
            result.push_str(" (with metadata)");
        }
        Ok(result)
    }

    pub fn template_list(&self, query: &TemplateQuery) -> Result<String> {
        let dir = self.store.documents_dir();
        if !dir.is_dir() {
            bail!("Documents directory not found");
        }
        let entries = template_registry::scan_templates(dir, query)?;
        Ok(template_registry::render_template_list(&entries, query))
    }

    pub fn enhanced_style_transfer(
        &self,
        source_filename: &str,
        target_filename: &str,
        options: &StyleTransferOptions,
    ) -> Result<String> {
        let report = self.store.transfer_styles(source_filename, target_filename, options)?;
        if report.transferred == 0 {
            return Ok(format!(
                "No transferable styles found between '{}' and '{}'. Documents may use only built-in styles.",
                source_filename, target_filename
            ));
        }

        let details: Vec<String> = report
            .per_family
            .iter()
            .map(|(family, count)| format!("{} {} styles", count, family))
            .collect();
        let mut result = format!(
            "SUCCESS: Transferred {} styles ({}) from '{}' to '{}'",
            report.transferred,
            details.join(", "),
            source_filename,
            target_filename
        );
        if options.template_mode {
            result.push_str(" (template-aware mode - placeholders preserved)");
        }
        if !options.preserve_content {
            result.push_str(" (content structure maintained)");
        }
        if !report.skipped_families.is_empty() {
            result.push_str(&format!("\nSkipped style types: {}", report.skipped_families.join(", ")));
        }
        if !report.skipped_styles.is_empty() {
            result.push_str(&format!("\nSkipped styles: {}", report.skipped_styles.join(", ")));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extension() {
        assert_eq!(with_default_extension("report", TEXT_OUTPUT_EXTENSIONS, "odt"), "report.odt");
        assert_eq!(with_default_extension("report.DOCX", TEXT_OUTPUT_EXTENSIONS, "odt"), "report.DOCX");
        assert_eq!(with_default_extension("data.xlsx", GRID_OUTPUT_EXTENSIONS, "ods"), "data.xlsx.ods");
    }

    #[test]
    fn test_name_stem() {
        assert_eq!(name_stem("guide.odt"), "guide");
        assert_eq!(name_stem("archive.v2.docx"), "archive.v2");
        assert_eq!(name_stem("notes"), "notes");
        assert_eq!(name_stem(".hidden"), ".hidden");
    }

    #[test]
    fn test_text_as_sheet_limits_non_empty_rows() {
        // Blank lines between rows do not count towards the limit
        let text = (1..=150).map(|i| format!("row {}", i)).collect::<Vec<_>>().join("\n\n");
        let DocumentContent::Grid(sheets) = text_as_sheet(&text, TEMPLATE_SHEET_ROWS) else {
            panic!("expected a grid");
        };
        assert_eq!(sheets[0].rows.len(), 100);
        assert_eq!(sheets[0].rows[0], vec!["row 1".to_string()]);
        assert_eq!(sheets[0].rows[99], vec!["row 100".to_string()]);
    }
}
