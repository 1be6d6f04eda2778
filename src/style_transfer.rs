//! Copy named style definitions between two documents of the same package format.
//!
//! Styles are moved as raw XML elements: a target style with the same family and
//! name is replaced wholesale, anything else is appended to the target's style
//! container. Document body content is never touched.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::xml_package::{attribute, open_package, read_required_entry};

/// Built-in style names that are never copied
pub const PROTECTED_STYLES: &[&str] = &[
    "Standard", "Heading", "Text Body", "Default Style", "Default", "Header", "Footer", "Caption",
];

/// Markers that keep a style untouched in template mode
pub const PLACEHOLDER_PATTERNS: &[&str] = &["{{", "}}", "%PLACEHOLDER%", "$PLACEHOLDER"];

/// Families requested when the caller names none
pub const DEFAULT_STYLE_FAMILIES: &[&str] = &["paragraph", "character"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleFamily {
    Paragraph,
    Character,
    Page,
    Frame,
    Numbering,
    Table,
}

impl StyleFamily {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "paragraph" => Some(StyleFamily::Paragraph),
            "character" => Some(StyleFamily::Character),
            "page" => Some(StyleFamily::Page),
            "frame" => Some(StyleFamily::Frame),
            "numbering" => Some(StyleFamily::Numbering),
            "table" => Some(StyleFamily::Table),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleFamily::Paragraph => "paragraph",
            StyleFamily::Character => "character",
            StyleFamily::Page => "page",
            StyleFamily::Frame => "frame",
            StyleFamily::Numbering => "numbering",
            StyleFamily::Table => "table",
        }
    }
}

/// Caller choices for a style transfer
#[derive(Debug, Clone, Default)]
pub struct StyleTransferOptions {
    /// Requested family labels, in order; empty means the defaults
    pub style_types: Vec<String>,
    pub preserve_content: bool,
    pub template_mode: bool,
    /// Source style name to the name it takes in the target
    pub style_mapping: HashMap<String, String>,
}

/// What a transfer did, family by family
#[derive(Debug, Clone, Default, Serialize)]
pub struct StyleTransferReport {
    pub transferred: usize,
    /// Family label and number of styles copied, for families with at least one
    pub per_family: Vec<(String, usize)>,
    /// Requested labels this format cannot carry, or that are not style families
    pub skipped_families: Vec<String>,
    /// Styles left out, with the reason
    pub skipped_styles: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageFormat {
    Docx,
    Odt,
}

impl PackageFormat {
    fn of(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "docx" => Some(PackageFormat::Docx),
            "odt" => Some(PackageFormat::Odt),
            _ => None,
        }
    }

    fn styles_entry(&self) -> &'static str {
        match self {
            PackageFormat::Docx => "word/styles.xml",
            PackageFormat::Odt => "styles.xml",
        }
    }

    fn container(&self) -> &'static [u8] {
        match self {
            PackageFormat::Docx => b"w:styles",
            PackageFormat::Odt => b"office:styles",
        }
    }

    fn supports(&self, family: StyleFamily) -> bool {
        match self {
            PackageFormat::Docx => matches!(
                family,
                StyleFamily::Paragraph | StyleFamily::Character | StyleFamily::Table | StyleFamily::Numbering
            ),
            PackageFormat::Odt => family != StyleFamily::Page,
        }
    }

    /// Family of a style element directly inside the container, if it is one
    fn family_of(&self, element: &BytesStart) -> Option<StyleFamily> {
        match (self, element.name().as_ref()) {
            (PackageFormat::Docx, b"w:style") => match attribute(element, b"w:type")?.as_str() {
                "paragraph" => Some(StyleFamily::Paragraph),
                "character" => Some(StyleFamily::Character),
                "table" => Some(StyleFamily::Table),
                "numbering" => Some(StyleFamily::Numbering),
                _ => None,
            },
            (PackageFormat::Odt, b"style:style") => match attribute(element, b"style:family")?.as_str() {
                "paragraph" => Some(StyleFamily::Paragraph),
                "text" => Some(StyleFamily::Character),
                "table" => Some(StyleFamily::Table),
                "graphic" => Some(StyleFamily::Frame),
                _ => None,
            },
            (PackageFormat::Odt, b"text:list-style") => Some(StyleFamily::Numbering),
            _ => None,
        }
    }

    fn name_attr(&self) -> &'static [u8] {
        match self {
            PackageFormat::Docx => b"w:styleId",
            PackageFormat::Odt => b"style:name",
        }
    }

    /// Rewrite a style element's identity from `from` to `to`
    fn rename(&self, xml: &str, from: &str, to: &str) -> String {
        match self {
            PackageFormat::Docx => xml
                .replacen(&format!("w:styleId=\"{}\"", from), &format!("w:styleId=\"{}\"", to), 1)
                .replacen(&format!("<w:name w:val=\"{}\"", from), &format!("<w:name w:val=\"{}\"", to), 1),
            PackageFormat::Odt => {
                xml.replacen(&format!("style:name=\"{}\"", from), &format!("style:name=\"{}\"", to), 1)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ScannedStyle {
    family: StyleFamily,
    name: Option<String>,
    display_name: Option<String>,
    span: Range<usize>,
}

#[derive(Debug, Default)]
struct StyleSheet {
    styles: Vec<ScannedStyle>,
    container_end: Option<usize>,
}

/// Locate the style elements directly inside the style container
fn scan_styles(xml: &str, format: PackageFormat) -> Result<StyleSheet> {
    let mut reader = Reader::from_str(xml);
    let mut sheet = StyleSheet::default();
    let mut depth = 0usize;
    let mut container_depth: Option<usize> = None;
    let mut pending: Option<(ScannedStyle, usize)> = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .with_context(|| format!("Malformed styles XML near byte {}", before))?;
        let after = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                depth += 1;
                if container_depth.is_none() && e.name().as_ref() == format.container() {
                    container_depth = Some(depth);
                } else if container_depth == Some(depth - 1) {
                    if let Some(family) = format.family_of(&e) {
                        let style = ScannedStyle {
                            family,
                            name: attribute(&e, format.name_attr()),
                            display_name: None,
                            span: before..before,
                        };
                        pending = Some((style, depth));
                    }
                }
            }
            Event::Empty(e) => {
                if container_depth == Some(depth) {
                    if let Some(family) = format.family_of(&e) {
                        sheet.styles.push(ScannedStyle {
                            family,
                            name: attribute(&e, format.name_attr()),
                            display_name: None,
                            span: before..after,
                        });
                    }
                } else if let Some((style, _)) = pending.as_mut() {
                    if format == PackageFormat::Docx && e.name().as_ref() == b"w:name" {
                        style.display_name = attribute(&e, b"w:val");
                    }
                }
            }
            Event::End(e) => {
                if let Some((mut style, style_depth)) = pending.take() {
                    if style_depth == depth {
                        style.span.end = after;
                        sheet.styles.push(style);
                    } else {
                        pending = Some((style, style_depth));
                    }
                }
                if container_depth == Some(depth) && e.name().as_ref() == format.container() {
                    sheet.container_end = Some(before);
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheet)
}

fn requested_families(options: &StyleTransferOptions) -> Vec<String> {
    let labels: Vec<String> = if options.style_types.is_empty() {
        DEFAULT_STYLE_FAMILIES.iter().map(|s| s.to_string()).collect()
    } else {
        options.style_types.clone()
    };
    let mut unique: Vec<String> = Vec::new();
    for label in labels {
        let label = label.trim().to_lowercase();
        if !unique.contains(&label) {
            unique.push(label);
        }
    }
    unique
}

/// Transfer styles from `source` into `target`, rewriting the target package in place
pub fn transfer_styles(source: &Path, target: &Path, options: &StyleTransferOptions) -> Result<StyleTransferReport> {
    let format = match (PackageFormat::of(source), PackageFormat::of(target)) {
        (Some(a), Some(b)) if a == b => a,
        _ => bail!("Style transfer needs two .docx or two .odt documents"),
    };

    let source_xml = read_required_entry(source, format.styles_entry())?;
    let target_xml = read_required_entry(target, format.styles_entry())?;
    let source_sheet = scan_styles(&source_xml, format)?;
    let target_sheet = scan_styles(&target_xml, format)?;
    let Some(container_end) = target_sheet.container_end else {
        bail!("{} has no style container to receive styles", target.display());
    };

    let mut report = StyleTransferReport::default();
    // Keyed by (family, target name); later sources win
    let mut replacements: HashMap<(StyleFamily, String), (Option<Range<usize>>, String)> = HashMap::new();
    let mut insertion_order: Vec<(StyleFamily, String)> = Vec::new();

    for label in requested_families(options) {
        let Some(family) = StyleFamily::parse(&label).filter(|f| format.supports(*f)) else {
            log::info!("Skipping style family '{}' for {:?} documents", label, format);
            report.skipped_families.push(label);
            continue;
        };

        let mut family_count = 0;
        for style in source_sheet.styles.iter().filter(|s| s.family == family) {
            let Some(name) = style.name.as_deref() else {
                log::warn!("Skipping unnamed {} style in {}", label, source.display());
                report.skipped_styles.push(format!("unnamed {} style", label));
                continue;
            };
            let protected = PROTECTED_STYLES
                .iter()
                .any(|p| *p == name || style.display_name.as_deref() == Some(*p));
            if protected {
                continue;
            }

            let Some(definition) = source_xml.get(style.span.clone()) else {
                log::warn!("Skipping style '{}': definition could not be read", name);
                report.skipped_styles.push(format!("{} (unreadable)", name));
                continue;
            };
            if options.template_mode && PLACEHOLDER_PATTERNS.iter().any(|p| definition.contains(p)) {
                report.skipped_styles.push(format!("{} (placeholder preserved)", name));
                continue;
            }

            let target_name = options.style_mapping.get(name).map(String::as_str).unwrap_or(name);
            let definition = if target_name == name {
                definition.to_string()
            } else {
                format.rename(definition, name, target_name)
            };

            let key = (family, target_name.to_string());
            let existing = target_sheet
                .styles
                .iter()
                .find(|t| t.family == family && t.name.as_deref() == Some(target_name))
                .map(|t| t.span.clone());
            if !replacements.contains_key(&key) {
                insertion_order.push(key.clone());
            }
            replacements.insert(key, (existing, definition));
            family_count += 1;
        }

        report.transferred += family_count;
        if family_count > 0 {
            report.per_family.push((family.as_str().to_string(), family_count));
        }
    }

    if report.transferred == 0 {
        return Ok(report);
    }

    let mut in_place: Vec<(Range<usize>, String)> = Vec::new();
    let mut appended = String::new();
    for key in &insertion_order {
        if let Some((span, definition)) = replacements.remove(key) {
            match span {
                Some(span) => in_place.push((span, definition)),
                None => appended.push_str(&definition),
            }
        }
    }

    let mut updated = target_xml.clone();
    updated.insert_str(container_end, &appended);
    in_place.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    for (span, definition) in in_place {
        updated.replace_range(span, &definition);
    }

    rewrite_package_entry(target, format.styles_entry(), &updated)?;
    log::info!(
        "Transferred {} styles from {} to {}",
        report.transferred,
        source.display(),
        target.display()
    );
    Ok(report)
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", file_name))
}

/// Replace one entry of a package, copying every other entry unchanged and in order
fn rewrite_package_entry(path: &Path, entry: &str, content: &str) -> Result<()> {
    let temporary = temporary_sibling(path);

    let written = (|| -> Result<()> {
        let mut archive = open_package(path)?;
        let output = File::create(&temporary)
            .with_context(|| format!("Failed to create {}", temporary.display()))?;
        let mut writer = ZipWriter::new(output);

        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            if file.name() == entry {
                let options = SimpleFileOptions::default().compression_method(file.compression());
                drop(file);
                writer.start_file(entry, options)?;
                writer.write_all(content.as_bytes())?;
            } else {
                writer.raw_copy_file(file)?;
            }
        }
        writer.finish()?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temporary);
        return Err(e.context(format!("Failed to rewrite {}", path.display())));
    }
    fs::rename(&temporary, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odf::write_odt;
    use crate::xml_package::write_package;
    use tempfile::TempDir;

    const SOURCE_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-styles xmlns:office="o" xmlns:style="s" xmlns:text="t"><office:styles><style:style style:name="Standard" style:family="paragraph"/><style:style style:name="Fancy" style:family="paragraph"><style:text-properties fo:color="red"/></style:style><style:style style:name="Emph" style:family="text"/><style:style style:name="Slot" style:family="paragraph" style:display-name="{{SLOT}}"/><text:list-style style:name="Bullets"><text:list-level-style-bullet text:level="1"/></text:list-style></office:styles></office:document-styles>"#;

    fn source_odt(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("source.odt");
        write_package(
            &path,
            Some(crate::odf::ODT_MIMETYPE),
            &[
                ("content.xml", "<office:document-content/>".to_string()),
                ("styles.xml", SOURCE_STYLES.to_string()),
            ],
        )
        .unwrap();
        path
    }

    fn target_odt(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("target.odt");
        write_odt(&path, "Body text stays.").unwrap();
        path
    }

    #[test]
    fn test_scan_finds_direct_children_only() {
        let sheet = scan_styles(SOURCE_STYLES, PackageFormat::Odt).unwrap();
        let names: Vec<&str> = sheet.styles.iter().filter_map(|s| s.name.as_deref()).collect();
        assert_eq!(names, vec!["Standard", "Fancy", "Emph", "Slot", "Bullets"]);
        assert_eq!(sheet.styles[4].family, StyleFamily::Numbering);
        let fancy = &SOURCE_STYLES[sheet.styles[1].span.clone()];
        assert!(fancy.starts_with("<style:style style:name=\"Fancy\""));
        assert!(fancy.ends_with("</style:style>"));
        assert!(SOURCE_STYLES[sheet.container_end.unwrap()..].starts_with("</office:styles>"));
    }

    #[test]
    fn test_transfer_appends_and_skips_protected() {
        let dir = TempDir::new().unwrap();
        let source = source_odt(&dir);
        let target = target_odt(&dir);

        let options = StyleTransferOptions {
            style_types: vec!["paragraph".into(), "character".into(), "numbering".into(), "page".into()],
            template_mode: true,
            ..Default::default()
        };
        let report = transfer_styles(&source, &target, &options).unwrap();

        assert_eq!(report.transferred, 3);
        assert_eq!(
            report.per_family,
            vec![("paragraph".to_string(), 1), ("character".to_string(), 1), ("numbering".to_string(), 1)]
        );
        assert_eq!(report.skipped_families, vec!["page"]);
        assert_eq!(report.skipped_styles, vec!["Slot (placeholder preserved)"]);

        let styles = read_required_entry(&target, "styles.xml").unwrap();
        assert!(styles.contains("style:name=\"Fancy\""));
        assert!(styles.contains("<text:list-style style:name=\"Bullets\">"));
        assert!(!styles.contains("Slot"));
        assert_eq!(crate::odf::read_odt_text(&target).unwrap(), "Body text stays.");
    }

    #[test]
    fn test_mapping_renames_and_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let source = source_odt(&dir);
        let target = target_odt(&dir);

        let first = StyleTransferOptions {
            style_types: vec!["paragraph".into()],
            style_mapping: HashMap::from([("Fancy".to_string(), "Body Fancy".to_string())]),
            ..Default::default()
        };
        transfer_styles(&source, &target, &first).unwrap();
        // Second run replaces rather than duplicates
        transfer_styles(&source, &target, &first).unwrap();

        let styles = read_required_entry(&target, "styles.xml").unwrap();
        assert_eq!(styles.matches("style:name=\"Body Fancy\"").count(), 1);
        assert!(!styles.contains("style:name=\"Fancy\""));
    }

    #[test]
    fn test_nothing_to_transfer_leaves_target_alone() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("plain.odt");
        write_odt(&source, "x").unwrap();
        let target = target_odt(&dir);
        let before = fs::read(&target).unwrap();

        let report = transfer_styles(&source, &target, &StyleTransferOptions::default()).unwrap();
        assert_eq!(report.transferred, 0);
        assert_eq!(fs::read(&target).unwrap(), before);
    }

    #[test]
    fn test_mixed_formats_are_rejected() {
        let dir = TempDir::new().unwrap();
        let result = transfer_styles(
            &dir.path().join("a.odt"),
            &dir.path().join("b.docx"),
            &StyleTransferOptions::default(),
        );
        assert!(result.is_err());
    }
}
