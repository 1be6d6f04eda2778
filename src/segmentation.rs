use serde::Serialize;

use crate::lexicon::*;
use crate::modes::SplitMethod;
use crate::structure_analysis::is_heading_candidate;
use crate::text_utils::{paragraphs, truncate_with_ellipsis, word_count, words};

/// One ordered piece of a split document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub content: String,
    /// 1-based position among the produced sections
    pub section_number: usize,
    /// Words in `content`
    pub word_count: usize,
}

impl Section {
    fn new(title: String, content: String, section_number: usize) -> Self {
        let word_count = word_count(&content);
        Self {
            title,
            content,
            section_number,
            word_count,
        }
    }
}

/// Sections of a split, or the reason no sections could be produced
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    pub sections: Vec<Section>,
    pub method: SplitMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SplitOutcome {
    pub fn success(sections: Vec<Section>, method: SplitMethod) -> Self {
        Self {
            sections,
            method,
            error: None,
        }
    }

    pub fn error(method: SplitMethod, message: String) -> Self {
        Self {
            sections: Vec::new(),
            method,
            error: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Word count per chunk for `by_size`; absent, unparsable or non-positive criteria fall back to the default
pub fn parse_section_size(criteria: Option<&str>) -> usize {
    criteria
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|size| *size > 0)
        .map(|size| size as usize)
        .unwrap_or(DEFAULT_SECTION_WORDS)
}

/// Split document text into ordered, non-overlapping sections
pub fn split(text: &str, name: &str, method: SplitMethod, criteria: Option<&str>) -> SplitOutcome {
    if text.trim().is_empty() {
        return SplitOutcome::error(method, format!("Document '{}' appears to be empty", name));
    }

    let sections = match method {
        SplitMethod::ByHeadings => split_by_headings(text),
        SplitMethod::ByPages => split_by_pages(text),
        SplitMethod::BySize => split_by_size(text, parse_section_size(criteria)),
        SplitMethod::BySections => split_by_paragraph_groups(text),
    };

    if sections.is_empty() {
        return SplitOutcome::error(
            method,
            "Could not split document - no logical sections found".to_string(),
        );
    }
    log::debug!("Split '{}' {} into {} sections", name, method, sections.len());
    SplitOutcome::success(sections, method)
}

/// A heading opens a new section only once the current one holds enough words
fn split_by_headings(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut title = "Introduction".to_string();

    for line in text.split('\n').map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                current.push("");
            }
            continue;
        }

        let accumulated: usize = current.iter().map(|l| word_count(l)).sum();
        if is_heading_candidate(line, STRUCTURE_HEADING_RULE)
            && !current.is_empty()
            && accumulated > HEADING_SECTION_MIN_WORDS
        {
            let number = sections.len() + 1;
            sections.push(Section::new(title, current.join("\n").trim().to_string(), number));
            current.clear();
            title = line.to_string();
        }
        current.push(line);
    }

    if !current.is_empty() {
        let number = sections.len() + 1;
        sections.push(Section::new(title, current.join("\n").trim().to_string(), number));
    }
    sections
}

fn split_by_pages(text: &str) -> Vec<Section> {
    words(text)
        .chunks(WORDS_PER_PAGE)
        .enumerate()
        .map(|(i, chunk)| Section::new(format!("Page {}", i + 1), chunk.join(" "), i + 1))
        .collect()
}

fn split_by_size(text: &str, size: usize) -> Vec<Section> {
    words(text)
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| {
            let first = i * size + 1;
            let last = i * size + chunk.len();
            Section::new(
                format!("Section {} (Words {}-{})", i + 1, first, last),
                chunk.join(" "),
                i + 1,
            )
        })
        .collect()
}

/// Groups of `max(3, paragraphs / 5)` paragraphs, so most documents yield about five sections
fn split_by_paragraph_groups(text: &str) -> Vec<Section> {
    let paragraphs = paragraphs(text);
    let group_size = MIN_PARAGRAPHS_PER_SECTION.max(paragraphs.len() / TARGET_SECTION_COUNT);

    paragraphs
        .chunks(group_size)
        .enumerate()
        .map(|(i, group)| {
            let preview = truncate_with_ellipsis(group[0], SECTION_TITLE_PREVIEW_CHARS);
            Section::new(format!("Section {}: {}", i + 1, preview), group.join("\n\n"), i + 1)
        })
        .collect()
}
