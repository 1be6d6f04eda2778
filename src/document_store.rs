//! Document access behind a narrow capability trait.
//!
//! The analysis engines only ever see text or cell grids. `DocumentStore` hands
//! those out for named documents and writes new ones back; `FsDocumentStore` does
//! it over a plain directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Reader};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::odf::{self, PackageProperties};
use crate::style_transfer::{self, StyleTransferOptions, StyleTransferReport};
use crate::tables::csv_line;
use crate::{ooxml, pdf};

/// Sheets read when a grid is flattened to text
pub const TEXT_SHEET_LIMIT: usize = 3;
pub const TEXT_ROW_LIMIT: usize = 50;
pub const TEXT_COLUMN_LIMIT: usize = 20;

/// Bounds applied to extracted tables
pub const TABLE_LIMIT: usize = 5;
pub const TABLE_ROW_LIMIT: usize = 20;
pub const TABLE_COLUMN_LIMIT: usize = 10;

/// One named sheet of string cells
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// A table found in a document, rows as read
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableGrid {
    pub name: String,
    pub index: usize,
    pub rows: Vec<Vec<String>>,
    pub column_count: usize,
}

impl TableGrid {
    /// Clip to the table bounds, dropping rows with no visible text
    fn limited(self) -> Self {
        let rows: Vec<Vec<String>> = self
            .rows
            .into_iter()
            .take(TABLE_ROW_LIMIT)
            .map(|row| row.into_iter().take(TABLE_COLUMN_LIMIT).collect::<Vec<_>>())
            .filter(|row| row_has_text(row))
            .collect();
        Self {
            rows,
            column_count: self.column_count.min(TABLE_COLUMN_LIMIT),
            ..self
        }
    }
}

fn row_has_text(row: &[String]) -> bool {
    row.iter().any(|cell| !cell.trim().is_empty())
}

/// Extracted document content: flat text, or sheets of cells
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    Text(String),
    Grid(Vec<SheetGrid>),
}

impl DocumentContent {
    pub fn is_grid(&self) -> bool {
        matches!(self, DocumentContent::Grid(_))
    }

    /// Flatten to text. Grids keep the first sheets, rows and columns only.
    pub fn to_text(&self) -> String {
        match self {
            DocumentContent::Text(text) => text.clone(),
            DocumentContent::Grid(sheets) => sheets
                .iter()
                .take(TEXT_SHEET_LIMIT)
                .filter_map(|sheet| {
                    let rows: Vec<String> = sheet
                        .rows
                        .iter()
                        .take(TEXT_ROW_LIMIT)
                        .filter(|row| row_has_text(row))
                        .map(|row| {
                            row.iter()
                                .take(TEXT_COLUMN_LIMIT)
                                .map(String::as_str)
                                .collect::<Vec<_>>()
                                .join(" | ")
                        })
                        .collect();
                    if rows.is_empty() {
                        None
                    } else {
                        Some(format!("Sheet '{}':\n{}", sheet.name, rows.join("\n")))
                    }
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    /// Sheets as-is, or text laid out one non-empty trimmed line per row
    pub fn to_grid(&self) -> Vec<SheetGrid> {
        match self {
            DocumentContent::Grid(sheets) => sheets.clone(),
            DocumentContent::Text(text) => vec![SheetGrid {
                name: "Sheet1".to_string(),
                rows: text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| vec![line.to_string()])
                    .collect(),
            }],
        }
    }
}

/// Document formats known by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentKind {
    /// `.odt`
    Writer,
    /// `.docx`
    Word,
    /// `.txt`, `.md`
    PlainText,
    Csv,
    Pdf,
    /// `.ods`
    Calc,
    /// `.xlsx`, `.xls`, read only
    Excel,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "odt" => Some(DocumentKind::Writer),
            "docx" => Some(DocumentKind::Word),
            "txt" | "md" => Some(DocumentKind::PlainText),
            "csv" => Some(DocumentKind::Csv),
            "pdf" => Some(DocumentKind::Pdf),
            "ods" => Some(DocumentKind::Calc),
            "xlsx" | "xls" => Some(DocumentKind::Excel),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|ext| ext.to_str()).and_then(Self::from_extension)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Writer => "Writer Document",
            DocumentKind::Word => "Word Document",
            DocumentKind::PlainText => "Text Document",
            DocumentKind::Csv => "CSV Document",
            DocumentKind::Pdf => "PDF Document",
            DocumentKind::Calc => "Calc Spreadsheet",
            DocumentKind::Excel => "Excel Workbook",
        }
    }

    /// Formats whose content is a grid of cells
    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, DocumentKind::Calc | DocumentKind::Excel)
    }

    pub fn is_writable(&self) -> bool {
        *self != DocumentKind::Excel
    }
}

/// Lower-cased extension of a document name, if any
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Descriptive facts about a stored document
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub file_name: String,
    pub kind: DocumentKind,
    pub size_bytes: u64,
    /// File modification time, local
    pub modified: String,
    pub properties: PackageProperties,
    pub page_count: Option<usize>,
    pub sheet_count: Option<usize>,
}

/// Access to named documents
pub trait DocumentStore: Send + Sync {
    /// Directory every document name is relative to
    fn documents_dir(&self) -> &Path;

    /// Path for a document name; names that leave the documents directory are rejected
    fn resolve(&self, name: &str) -> Result<PathBuf>;

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|path| path.is_file()).unwrap_or(false)
    }

    /// Path of an existing document, or a `File not found` error
    fn locate(&self, name: &str) -> Result<PathBuf> {
        match self.resolve(name) {
            Ok(path) if path.is_file() => Ok(path),
            _ => Err(anyhow!("File not found: {}", name)),
        }
    }

    fn extract(&self, name: &str) -> Result<DocumentContent>;

    fn extract_tables(&self, name: &str) -> Result<Vec<TableGrid>>;

    fn metadata(&self, name: &str) -> Result<DocumentMetadata>;

    /// Write `content` under `name` in the format its extension selects
    fn create_and_save(&self, name: &str, content: &DocumentContent) -> Result<PathBuf>;

    fn transfer_styles(&self, source: &str, target: &str, options: &StyleTransferOptions) -> Result<StyleTransferReport>;
}

/// Documents stored as files under one directory
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn kind_of(path: &Path) -> Result<DocumentKind> {
        DocumentKind::from_path(path).ok_or_else(|| {
            let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
            match extension {
                Some(ext) => anyhow!("Unsupported file type: {}", ext),
                None => anyhow!("Unable to determine file type (no extension)"),
            }
        })
    }
}

fn read_sheets(path: &Path) -> Result<Vec<SheetGrid>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open spreadsheet: {}", path.display()))?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names() {
        match workbook.worksheet_range(&sheet_name) {
            Ok(range) => {
                let rows = range
                    .rows()
                    .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                    .collect();
                sheets.push(SheetGrid { name: sheet_name, rows });
            }
            Err(e) => {
                log::warn!("Skipping sheet '{}' in {}: {}", sheet_name, path.display(), e);
            }
        }
    }
    Ok(sheets)
}

fn sheet_tables(sheets: Vec<SheetGrid>) -> Vec<TableGrid> {
    sheets
        .into_iter()
        .enumerate()
        .map(|(index, sheet)| TableGrid {
            column_count: sheet.rows.iter().map(Vec::len).max().unwrap_or(0),
            name: sheet.name,
            index,
            rows: sheet.rows,
        })
        .collect()
}

impl DocumentStore for FsDocumentStore {
    fn documents_dir(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.trim().is_empty() || escapes {
            bail!("Invalid document name: {}", name);
        }
        Ok(self.root.join(relative))
    }

    fn extract(&self, name: &str) -> Result<DocumentContent> {
        let path = self.locate(name)?;
        log::debug!("Extracting {}", path.display());

        let content = match Self::kind_of(&path)? {
            DocumentKind::Writer => DocumentContent::Text(odf::read_odt_text(&path)?),
            DocumentKind::Word => DocumentContent::Text(ooxml::read_docx_text(&path)?),
            DocumentKind::PlainText | DocumentKind::Csv => DocumentContent::Text(
                fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?,
            ),
            DocumentKind::Pdf => DocumentContent::Text(pdf::extract_text(&path)?),
            DocumentKind::Calc | DocumentKind::Excel => DocumentContent::Grid(read_sheets(&path)?),
        };
        Ok(content)
    }

    fn extract_tables(&self, name: &str) -> Result<Vec<TableGrid>> {
        let path = self.locate(name)?;
        let tables = match Self::kind_of(&path)? {
            DocumentKind::Writer => odf::read_odt_tables(&path)?,
            DocumentKind::Word => ooxml::read_docx_tables(&path)?,
            DocumentKind::Calc | DocumentKind::Excel => sheet_tables(read_sheets(&path)?),
            kind => bail!("Table extraction is not supported for {} files", kind.label()),
        };
        Ok(tables.into_iter().take(TABLE_LIMIT).map(TableGrid::limited).collect())
    }

    fn metadata(&self, name: &str) -> Result<DocumentMetadata> {
        let path = self.locate(name)?;
        let kind = Self::kind_of(&path)?;
        let file = fs::metadata(&path).with_context(|| format!("Failed to stat {}", path.display()))?;
        let modified = file
            .modified()
            .map(|time| DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| "N/A".to_string());

        let properties = match kind {
            DocumentKind::Writer | DocumentKind::Calc => odf::read_odf_properties(&path)?,
            DocumentKind::Word => ooxml::read_core_properties(&path)?,
            DocumentKind::Excel if extension_of(name).as_deref() == Some("xlsx") => {
                ooxml::read_core_properties(&path)?
            }
            _ => PackageProperties::default(),
        };
        let page_count = match kind {
            DocumentKind::Pdf => Some(pdf::page_count(&path)?),
            _ => None,
        };
        let sheet_count = if kind.is_spreadsheet() {
            Some(read_sheets(&path)?.len())
        } else {
            None
        };

        Ok(DocumentMetadata {
            file_name: name.to_string(),
            kind,
            size_bytes: file.len(),
            modified,
            properties,
            page_count,
            sheet_count,
        })
    }

    fn create_and_save(&self, name: &str, content: &DocumentContent) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        let kind = Self::kind_of(&path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        match kind {
            DocumentKind::Writer => odf::write_odt(&path, &content.to_text())?,
            DocumentKind::Word => ooxml::write_docx(&path, &content.to_text())?,
            DocumentKind::PlainText => fs::write(&path, content.to_text())
                .with_context(|| format!("Failed to write {}", path.display()))?,
            DocumentKind::Csv => {
                let body = match content {
                    DocumentContent::Text(text) => text.clone(),
                    DocumentContent::Grid(sheets) => sheets
                        .first()
                        .map(|sheet| sheet.rows.iter().map(|row| csv_line(row) + "\n").collect())
                        .unwrap_or_default(),
                };
                fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
            }
            DocumentKind::Pdf => pdf::write_pdf(&path, &content.to_text())?,
            DocumentKind::Calc => odf::write_ods(&path, &content.to_grid())?,
            DocumentKind::Excel => bail!("Writing {} files is not supported; use .ods or .csv", kind.label()),
        }

        log::info!("Saved {}", path.display());
        Ok(path)
    }

    fn transfer_styles(&self, source: &str, target: &str, options: &StyleTransferOptions) -> Result<StyleTransferReport> {
        let source_path = self.locate(source)?;
        let target_path = self.locate(target)?;
        style_transfer::transfer_styles(&source_path, &target_path, options)
    }
}
