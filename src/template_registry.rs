//! Template library: documents in the documents directory, optionally paired
//! with a `<stem>.meta.json` sidecar. Every listing is a fresh directory scan.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::modes::TemplateSyntax;
use crate::text_utils::format_thousands;

/// Extensions a template document may have
pub const TEMPLATE_EXTENSIONS: &[&str] = &["odt", "ods", "docx", "xlsx"];

/// Fields written to a template's sidecar. Caller fields are flattened in after the fixed ones.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateMetadata {
    pub name: String,
    pub created: String,
    pub placeholders: usize,
    pub format: TemplateSyntax,
    pub source_file: String,
    pub placeholder_list: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const FIXED_FIELDS: &[&str] = &["name", "created", "placeholders", "format", "source_file", "placeholder_list"];

impl TemplateMetadata {
    pub fn new(
        name: &str,
        source_file: &str,
        markers: &[String],
        format: TemplateSyntax,
        extra: Map<String, Value>,
    ) -> Self {
        let extra = extra
            .into_iter()
            .filter(|(key, _)| {
                let fixed = FIXED_FIELDS.contains(&key.as_str());
                if fixed {
                    log::debug!("Ignoring caller metadata field '{}'", key);
                }
                !fixed
            })
            .collect();
        Self {
            name: name.to_string(),
            created: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            placeholders: markers.len(),
            format,
            source_file: source_file.to_string(),
            placeholder_list: markers.to_vec(),
            extra,
        }
    }
}

/// Sidecar path for a template document: `report.odt` pairs with `report.meta.json`
pub fn sidecar_path(template: &Path) -> PathBuf {
    template.with_extension("meta.json")
}

pub fn write_sidecar(template: &Path, metadata: &TemplateMetadata) -> Result<PathBuf> {
    let path = sidecar_path(template);
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, json).with_context(|| format!("Failed to write template metadata {}", path.display()))?;
    Ok(path)
}

/// Filters for a template listing
#[derive(Debug, Clone, Default)]
pub struct TemplateQuery {
    pub search_term: Option<String>,
    pub category: Option<String>,
    /// One of [`TEMPLATE_EXTENSIONS`]; `None` lists every format
    pub format: Option<String>,
    pub include_metadata: bool,
}

impl TemplateQuery {
    /// Build a query from raw tool arguments; blank strings and `all` mean no filter
    pub fn new(search_term: Option<String>, category: Option<String>, format: Option<String>, include_metadata: bool) -> Self {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let format = non_blank(format)
            .map(|f| f.trim().to_lowercase())
            .filter(|f| TEMPLATE_EXTENSIONS.contains(&f.as_str()));
        Self {
            search_term: non_blank(search_term),
            category: non_blank(category),
            format,
            include_metadata,
        }
    }

    fn describe(&self) -> String {
        let mut filters = String::new();
        if let Some(term) = &self.search_term {
            filters.push_str(&format!(" matching '{}'", term));
        }
        if let Some(category) = &self.category {
            filters.push_str(&format!(" in category '{}'", category));
        }
        if let Some(format) = &self.format {
            filters.push_str(&format!(" with format '{}'", format));
        }
        filters
    }
}

/// A document found by a listing scan
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    pub name: String,
    pub size: u64,
    pub modified: String,
    /// Parsed sidecar; present only for confirmed templates
    pub metadata: Option<Map<String, Value>>,
}

impl TemplateEntry {
    pub fn is_template(&self) -> bool {
        self.metadata.is_some()
    }

    fn text_field(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get(key)?
            .as_str()
            .filter(|value| !value.is_empty())
    }
}

fn read_sidecar(path: &Path) -> Option<Map<String, Value>> {
    if !path.is_file() {
        return None;
    }
    let parsed = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|json| serde_json::from_str::<Map<String, Value>>(&json).map_err(anyhow::Error::from));
    match parsed {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("Ignoring unreadable template metadata {}: {}", path.display(), e);
            None
        }
    }
}

/// Scan `dir` for template documents matching `query`, confirmed templates first
pub fn scan_templates(dir: &Path, query: &TemplateQuery) -> Result<Vec<TemplateEntry>> {
    let mut entries = Vec::new();
    let listing = fs::read_dir(dir).with_context(|| format!("Failed to read documents directory {}", dir.display()))?;

    for item in listing {
        let item = item?;
        let path = item.path();
        if !path.is_file() {
            continue;
        }
        let name = item.file_name().to_string_lossy().into_owned();
        let Some(extension) = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase) else {
            continue;
        };
        if !TEMPLATE_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }
        if query.format.as_ref().is_some_and(|format| *format != extension) {
            continue;
        }

        let stat = item.metadata()?;
        let modified = stat
            .modified()
            .map(|time| DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let entry = TemplateEntry {
            name,
            size: stat.len(),
            modified,
            metadata: read_sidecar(&sidecar_path(&path)),
        };

        if let Some(category) = &query.category {
            let matches = entry
                .metadata
                .as_ref()
                .and_then(|m| m.get("category"))
                .and_then(Value::as_str)
                .is_some_and(|c| c.to_lowercase() == category.to_lowercase());
            if !matches {
                continue;
            }
        }
        if let Some(term) = &query.search_term {
            let term = term.to_lowercase();
            let in_name = entry.name.to_lowercase().contains(&term);
            let in_description = entry
                .text_field("description")
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_name && !in_description {
                continue;
            }
        }

        entries.push(entry);
    }

    entries.sort_by_key(|entry| (!entry.is_template(), entry.name.to_lowercase()));
    Ok(entries)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a listing as the library summary shown to tool callers
pub fn render_template_list(entries: &[TemplateEntry], query: &TemplateQuery) -> String {
    if entries.is_empty() {
        return format!("No templates found{}", query.describe());
    }

    let (confirmed, others): (Vec<&TemplateEntry>, Vec<&TemplateEntry>) =
        entries.iter().partition(|entry| entry.is_template());

    let mut result = String::from("📋 **Template Library Summary**\n");
    result.push_str(&format!(
        "Found {} document(s): {} confirmed templates, {} possible templates\n\n",
        entries.len(),
        confirmed.len(),
        others.len()
    ));

    if !confirmed.is_empty() {
        result.push_str("🎯 **Confirmed Templates** (with metadata):\n\n");
        for entry in &confirmed {
            result.push_str(&format!("📄 **{}**\n", entry.name));
            result.push_str(&format!("   Size: {} bytes\n", format_thousands(entry.size as usize)));
            result.push_str(&format!("   Modified: {}\n", entry.modified));
            if let Some(description) = entry.text_field("description") {
                result.push_str(&format!("   Description: {}\n", description));
            }
            if let Some(category) = entry.text_field("category") {
                result.push_str(&format!("   Category: {}\n", category));
            }
            let placeholders = entry
                .metadata
                .as_ref()
                .and_then(|m| m.get("placeholders"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if placeholders > 0 {
                result.push_str(&format!(
                    "   Placeholders: {} ({} format)\n",
                    placeholders,
                    entry.text_field("format").unwrap_or("mustache")
                ));
            }
            if query.include_metadata {
                if let Some(metadata) = &entry.metadata {
                    for (key, value) in metadata {
                        if !["description", "category", "placeholders", "format"].contains(&key.as_str()) {
                            result.push_str(&format!("   {}: {}\n", key, display_value(value)));
                        }
                    }
                }
            }
            result.push('\n');
        }
    }

    if !others.is_empty() {
        result.push_str("📁 **Other Documents** (potential templates):\n\n");
        for entry in &others {
            result.push_str(&format!(
                "📄 {} ({} bytes, modified {})\n",
                entry.name,
                format_thousands(entry.size as usize),
                entry.modified
            ));
        }
    }

    result.push_str("\n💡 **Tips:**\n");
    result.push_str("- Use `template_create` to convert documents into templates with metadata\n");
    result.push_str("- Use `template_apply` to use templates for new documents\n");
    result.push_str("- Add `include_metadata: True` for full template details\n");
    result
}
