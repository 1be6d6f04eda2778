use std::collections::{BTreeSet, HashSet};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::lexicon::*;
use crate::modes::{ComparisonMode, MergeStrategy};
use crate::structure_analysis::is_heading_candidate;
use crate::text_utils::{
    average, char_len, contains_any, format_thousands, paragraphs, sentences, strip_token_punctuation,
    truncate_with_ellipsis, word_count, words,
};

/// Compare two document texts and render the report for `mode`
pub fn compare(text1: &str, text2: &str, name1: &str, name2: &str, mode: ComparisonMode) -> String {
    let empty1 = text1.trim().is_empty();
    let empty2 = text2.trim().is_empty();
    match (empty1, empty2) {
        (true, true) => return "Both documents appear to be empty.".to_string(),
        (true, false) => {
            return format!(
                "Document '{}' is empty, while '{}' contains {} words.",
                name1,
                name2,
                word_count(text2)
            );
        }
        (false, true) => {
            return format!(
                "Document '{}' is empty, while '{}' contains {} words.",
                name2,
                name1,
                word_count(text1)
            );
        }
        (false, false) => {}
    }

    match mode {
        ComparisonMode::Metadata => MetadataComparison::new(text1, text2).render(name1, name2),
        ComparisonMode::Structure => compare_structure(text1, text2, name1, name2),
        ComparisonMode::Comprehensive => compare_vocabulary(text1, text2, name1, name2),
        ComparisonMode::Content => compare_content(text1, text2, name1, name2),
    }
}

/// Size counts of one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentCounts {
    pub words: usize,
    pub chars: usize,
    pub lines: usize,
}

impl DocumentCounts {
    pub fn of(text: &str) -> Self {
        Self {
            words: word_count(text),
            chars: char_len(text),
            lines: text.split('\n').count(),
        }
    }
}

/// Size comparison between two documents, symmetric in its differences
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataComparison {
    pub first: DocumentCounts,
    pub second: DocumentCounts,
    pub word_difference: usize,
    pub char_difference: usize,
    /// Larger word count over the smaller one (the smaller floored at 1)
    pub size_ratio: f64,
}

impl MetadataComparison {
    pub fn new(text1: &str, text2: &str) -> Self {
        let first = DocumentCounts::of(text1);
        let second = DocumentCounts::of(text2);
        let larger = first.words.max(second.words);
        let smaller = first.words.min(second.words).max(1);
        Self {
            word_difference: first.words.abs_diff(second.words),
            char_difference: first.chars.abs_diff(second.chars),
            size_ratio: larger as f64 / smaller as f64,
            first,
            second,
        }
    }

    /// Index (0 or 1) of the document with more words, `None` when equal
    pub fn larger(&self) -> Option<usize> {
        match self.first.words.cmp(&self.second.words) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn render(&self, name1: &str, name2: &str) -> String {
        let larger = match self.larger() {
            Some(0) => name1,
            Some(_) => name2,
            None => "neither (equal word counts)",
        };
        format!(
            "Document Metadata Comparison:\n\n\
             {}:\n\
             - {} words, {} characters\n\
             - {} lines\n\n\
             {}:\n\
             - {} words, {} characters\n\
             - {} lines\n\n\
             Differences:\n\
             - Word count difference: {} words\n\
             - Character difference: {} characters\n\
             - Size ratio: {:.1}:1\n\
             - Larger document: {}",
            name1,
            format_thousands(self.first.words),
            format_thousands(self.first.chars),
            format_thousands(self.first.lines),
            name2,
            format_thousands(self.second.words),
            format_thousands(self.second.chars),
            format_thousands(self.second.lines),
            format_thousands(self.word_difference),
            format_thousands(self.char_difference),
            self.size_ratio,
            larger,
        )
    }
}

fn compare_structure(text1: &str, text2: &str, name1: &str, name2: &str) -> String {
    let paragraphs1 = paragraphs(text1);
    let paragraphs2 = paragraphs(text2);
    let headings1 = heading_count(&paragraphs1);
    let headings2 = heading_count(&paragraphs2);

    let complexity = if paragraphs1.len().abs_diff(paragraphs2.len()) < STRUCTURE_PARAGRAPH_DELTA {
        "Similar"
    } else {
        "Different"
    };
    let organization = if headings1 > 2 || headings2 > 2 { "Structured" } else { "Narrative" };

    format!(
        "Document Structure Comparison:\n\n\
         {} Structure:\n\
         - {} paragraphs\n\
         - {} potential headings\n\
         - Average paragraph length: {:.0} characters\n\n\
         {} Structure:\n\
         - {} paragraphs\n\
         - {} potential headings\n\
         - Average paragraph length: {:.0} characters\n\n\
         Structure Analysis:\n\
         - Document complexity: {}\n\
         - Organization style: {}",
        name1,
        paragraphs1.len(),
        headings1,
        average_paragraph_chars(&paragraphs1),
        name2,
        paragraphs2.len(),
        headings2,
        average_paragraph_chars(&paragraphs2),
        complexity,
        organization,
    )
}

fn heading_count(paragraphs: &[&str]) -> usize {
    paragraphs
        .iter()
        .filter(|p| is_heading_candidate(p, COMPARISON_HEADING_RULE))
        .count()
}

fn average_paragraph_chars(paragraphs: &[&str]) -> f64 {
    average(paragraphs.iter().map(|p| char_len(p)).sum(), paragraphs.len())
}

/// Lower-cased vocabulary without stop words, short tokens or edge punctuation
fn vocabulary(text: &str) -> BTreeSet<String> {
    words(text)
        .into_iter()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .map(|word| strip_token_punctuation(&word).to_string())
        .filter(|word| !word.is_empty())
        .collect()
}

/// Jaccard similarity of two vocabularies as a percentage
pub fn vocabulary_similarity(text1: &str, text2: &str) -> f64 {
    let set1 = vocabulary(text1);
    let set2 = vocabulary(text2);
    let union = set1.union(&set2).count();
    average(set1.intersection(&set2).count(), union) * 100.0
}

fn compare_vocabulary(text1: &str, text2: &str, name1: &str, name2: &str) -> String {
    let set1 = vocabulary(text1);
    let set2 = vocabulary(text2);
    let common: Vec<&String> = set1.intersection(&set2).collect();
    let unique1 = set1.difference(&set2).count();
    let unique2 = set2.difference(&set1).count();
    let similarity = average(common.len(), set1.union(&set2).count()) * 100.0;

    let shown: Vec<&str> = common.iter().take(COMMON_TERMS_SHOWN).map(|s| s.as_str()).collect();
    let assessment = if similarity > HIGH_SIMILARITY_PERCENT {
        "High similarity - documents appear related"
    } else if similarity < LOW_SIMILARITY_PERCENT {
        "Low similarity - documents appear to cover different topics"
    } else {
        "Moderate similarity - some common themes"
    };

    format!(
        "Comprehensive Document Comparison:\n\n\
         Content Similarity: {:.1}%\n\n\
         Vocabulary Analysis:\n\
         - Common terms: {} words\n\
         - Unique to {}: {} words\n\
         - Unique to {}: {} words\n\n\
         Most frequent common terms: {}\n\n\
         Document Characteristics:\n\
         {}: {} words, {} content\n\
         {}: {} words, {} content\n\n\
         Content Overlap Assessment:\n\
         {}",
        similarity,
        common.len(),
        name1,
        unique1,
        name2,
        unique2,
        shown.join(", "),
        name1,
        format_thousands(word_count(text1)),
        content_kind(text1),
        name2,
        format_thousands(word_count(text2)),
        content_kind(text2),
        assessment,
    )
}

fn content_kind(text: &str) -> &'static str {
    if contains_any(&text.to_lowercase(), TECHNICAL_INDICATORS) {
        "Technical"
    } else {
        "General"
    }
}

/// Similar sentence pairs among the opening sentences of both texts.
/// Each outer sentence counts at most once.
pub fn similar_sentence_count(text1: &str, text2: &str) -> usize {
    let opening = |text: &str| -> Vec<HashSet<String>> {
        sentences(text)
            .into_iter()
            .take(COMPARISON_SENTENCE_LIMIT)
            .filter(|s| char_len(s) > COMPARISON_SENTENCE_MIN_CHARS)
            .map(|s| s.to_lowercase().split_whitespace().map(str::to_string).collect())
            .collect()
    };
    let first = opening(text1);
    let second = opening(text2);

    first
        .iter()
        .filter(|words1| {
            second.iter().any(|words2| {
                let union = words1.union(words2).count();
                average(words1.intersection(words2).count(), union) > SIMILAR_SENTENCE_OVERLAP
            })
        })
        .count()
}

fn compare_content(text1: &str, text2: &str, name1: &str, name2: &str) -> String {
    let similar = similar_sentence_count(text1, text2);
    let relationship = if similar > 2 {
        "Closely related"
    } else if similar > 0 {
        "Some similarity"
    } else {
        "Different topics"
    };
    let overall = if similar > 1 {
        "These documents appear to discuss related topics with some overlapping content."
    } else {
        "These documents appear to cover different subjects with minimal content overlap."
    };

    format!(
        "Content Comparison between '{}' and '{}':\n\n\
         Document Lengths:\n\
         - {}: {} words, {} sentences\n\
         - {}: {} words, {} sentences\n\n\
         Content Analysis:\n\
         - Similar sentences found: {}\n\
         - Content relationship: {}\n\n\
         First paragraphs comparison:\n\
         {}: {}\n\
         {}: {}\n\n\
         Overall Assessment:\n\
         {}",
        name1,
        name2,
        name1,
        word_count(text1),
        sentences(text1).len(),
        name2,
        word_count(text2),
        sentences(text2).len(),
        similar,
        relationship,
        name1,
        opening_preview(text1),
        name2,
        opening_preview(text2),
        overall,
    )
}

fn opening_preview(text: &str) -> String {
    let first = text.split('.').next().unwrap_or_default().trim();
    truncate_with_ellipsis(first, OPENING_PREVIEW_CHARS)
}

/// One named input to a merge
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub name: String,
    pub content: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Merge sources into one text blob, stamped with the current local time
pub fn merge_documents(
    sources: &[SourceDocument],
    strategy: MergeStrategy,
    output_name: &str,
) -> Result<String, String> {
    merge_documents_at(sources, strategy, output_name, Local::now().naive_local())
}

/// Merge sources into one text blob with an explicit creation timestamp.
///
/// Sources with blank content are dropped; if none remain the merge fails.
pub fn merge_documents_at(
    sources: &[SourceDocument],
    strategy: MergeStrategy,
    output_name: &str,
    created: NaiveDateTime,
) -> Result<String, String> {
    let valid: Vec<&SourceDocument> = sources.iter().filter(|s| !s.content.trim().is_empty()).collect();
    if valid.is_empty() {
        return Err("No valid content found in source documents".to_string());
    }

    let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    let banner = "=".repeat(MERGE_BANNER_WIDTH);
    let rule = "-".repeat(MERGE_SECTION_RULE_WIDTH);
    let title = match strategy {
        MergeStrategy::Sequential => format!("MERGED DOCUMENT: {}", output_name),
        MergeStrategy::Interleaved => format!("MERGED DOCUMENT: {} (Interleaved)", output_name),
        MergeStrategy::Smart => format!("SMART MERGED DOCUMENT: {}", output_name),
    };

    let mut merged = format!(
        "{}\nCreated: {}\nSource documents: {}\n{}\n\n",
        title,
        created.format("%Y-%m-%d %H:%M:%S"),
        names.join(", "),
        banner
    );

    match strategy {
        MergeStrategy::Sequential => {
            for (i, source) in valid.iter().enumerate() {
                merged.push_str(&format!("DOCUMENT {}: {}\n{}\n", i + 1, source.name, rule));
                merged.push_str(source.content.trim());
                merged.push_str(&format!("\n\n{}\n\n", banner));
            }
        }
        MergeStrategy::Interleaved => {
            let split: Vec<(Vec<&str>, &str)> = valid
                .iter()
                .map(|s| (paragraphs(&s.content), s.name.as_str()))
                .collect();
            let longest = split.iter().map(|(p, _)| p.len()).max().unwrap_or(0);
            for i in 0..longest {
                for (paras, name) in &split {
                    if let Some(paragraph) = paras.get(i) {
                        merged.push_str(&format!("[From {}] {}\n\n", name, paragraph));
                    }
                }
            }
        }
        MergeStrategy::Smart => {
            merged.push_str("EXECUTIVE SUMMARY\n");
            merged.push_str(&"-".repeat(20));
            merged.push('\n');
            merged.push_str(&format!(
                "This document combines content from {} source files:\n",
                valid.len()
            ));
            for source in &valid {
                let kind = if contains_any(&source.content.to_lowercase(), MERGE_TECHNICAL_INDICATORS) {
                    "Technical"
                } else {
                    "General"
                };
                merged.push_str(&format!(
                    "• {}: {} words ({} content)\n",
                    source.name,
                    word_count(&source.content),
                    kind
                ));
            }
            merged.push_str(&format!("\n{}\n\n", banner));

            for (i, source) in valid.iter().enumerate() {
                merged.push_str(&format!(
                    "SECTION {}: {}\nSource: {}\n{}\n\n",
                    i + 1,
                    section_title(source),
                    source.name,
                    rule
                ));
                merged.push_str(source.content.trim());
                merged.push_str("\n\n");
            }
        }
    }

    log::debug!("Merged {} of {} sources as {}", valid.len(), sources.len(), strategy);
    Ok(merged)
}

/// First line of the source, or its name when that line is too long to be a title
fn section_title(source: &SourceDocument) -> &str {
    let first_line = source.content.trim().lines().next().unwrap_or_default().trim();
    if char_len(first_line) > MERGE_TITLE_MAX_CHARS {
        &source.name
    } else {
        first_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_inputs_short_circuit() {
        assert_eq!(
            compare("", " ", "a.odt", "b.odt", ComparisonMode::Content),
            "Both documents appear to be empty."
        );
        assert_eq!(
            compare("", "three small words", "a.odt", "b.odt", ComparisonMode::Metadata),
            "Document 'a.odt' is empty, while 'b.odt' contains 3 words."
        );
        assert_eq!(
            compare("one two", "\n", "a.odt", "b.odt", ComparisonMode::Structure),
            "Document 'b.odt' is empty, while 'a.odt' contains 2 words."
        );
    }

    #[test]
    fn test_metadata_comparison_is_symmetric() {
        let short = "one two three";
        let long = "one two three four five six seven\neight nine";
        let forward = MetadataComparison::new(short, long);
        let backward = MetadataComparison::new(long, short);

        assert_eq!(forward.word_difference, 6);
        assert_eq!(forward.word_difference, backward.word_difference);
        assert_eq!(forward.char_difference, backward.char_difference);
        assert_eq!(forward.size_ratio, 3.0);
        assert_eq!(forward.larger(), Some(1));
        assert_eq!(backward.larger(), Some(0));

        let report = forward.render("short.txt", "long.txt");
        assert!(report.contains("- Size ratio: 3.0:1"));
        assert!(report.contains("- Larger document: long.txt"));
        assert!(report.contains("- 2 lines"));
    }

    #[test]
    fn test_structure_comparison_verdicts() {
        let first = "INTRO\nSome text here.\nPART TWO\nMore text.\nEnd Notes\nDone.";
        let second = "Just one paragraph of text.";
        let report = compare(first, second, "a", "b", ComparisonMode::Structure);
        assert!(report.contains("- 6 paragraphs\n- 3 potential headings"));
        assert!(report.contains("- Document complexity: Different"));
        assert!(report.contains("- Organization style: Structured"));

        let similar = compare(second, "Another single paragraph.", "a", "b", ComparisonMode::Structure);
        assert!(similar.contains("- Document complexity: Similar"));
        assert!(similar.contains("- Organization style: Narrative"));
    }

    #[test]
    fn test_vocabulary_similarity() {
        let text = "Rust compiler checks ownership rules.";
        assert_eq!(vocabulary_similarity(text, text), 100.0);
        assert_eq!(vocabulary_similarity("alpha beta gamma", "delta epsilon zeta"), 0.0);

        // Stop words and short tokens are ignored
        let set = vocabulary("The cat and THE dog were running, (quickly).");
        let expected: BTreeSet<String> =
            ["cat", "dog", "running", "quickly"].iter().map(|s| s.to_string()).collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_comprehensive_report() {
        let a = "The system process handles parsing and validation of records.";
        let b = "Parsing and validation of records happens nightly.";
        let report = compare(a, b, "a", "b", ComparisonMode::Comprehensive);
        assert!(report.contains("Content Similarity: 37.5%"));
        assert!(report.contains("Most frequent common terms: parsing, records, validation\n"));
        assert!(report.contains("a: 9 words, Technical content"));
        assert!(report.contains("b: 7 words, General content"));
        assert!(report.contains("High similarity - documents appear related"));
    }

    #[test]
    fn test_content_comparison_counts_similar_sentences() {
        let a = "The quarterly report shows strong growth in sales. Costs were reduced significantly this year.";
        let b = "The quarterly report shows strong growth in revenue. Unrelated content about the weather today.";
        assert_eq!(similar_sentence_count(a, b), 1);

        let report = compare(a, b, "a.txt", "b.txt", ComparisonMode::Content);
        assert!(report.contains("- Similar sentences found: 1"));
        assert!(report.contains("- Content relationship: Some similarity"));
        assert!(report.contains("a.txt: The quarterly report shows strong growth in sales\n"));
    }

    #[test]
    fn test_short_sentences_are_not_compared() {
        assert_eq!(similar_sentence_count("Short one. Tiny.", "Short one. Tiny."), 0);
    }

    #[test]
    fn test_merge_rejects_all_empty_sources() {
        let sources = vec![SourceDocument::new("a.txt", "  "), SourceDocument::new("b.txt", "")];
        assert_eq!(
            merge_documents_at(&sources, MergeStrategy::Smart, "out.odt", fixed_time()),
            Err("No valid content found in source documents".to_string())
        );
    }

    #[test]
    fn test_sequential_merge() {
        let sources = vec![
            SourceDocument::new("a.txt", "First document.\n"),
            SourceDocument::new("empty.txt", ""),
            SourceDocument::new("b.txt", "Second document."),
        ];
        let merged = merge_documents_at(&sources, MergeStrategy::Sequential, "out.odt", fixed_time()).unwrap();
        let banner = "=".repeat(60);
        let rule = "-".repeat(40);
        let expected = format!(
            "MERGED DOCUMENT: out.odt\nCreated: 2024-03-01 09:30:00\nSource documents: a.txt, empty.txt, b.txt\n{b}\n\n\
             DOCUMENT 1: a.txt\n{r}\nFirst document.\n\n{b}\n\n\
             DOCUMENT 2: b.txt\n{r}\nSecond document.\n\n{b}\n\n",
            b = banner,
            r = rule
        );
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_interleaved_merge_alternates_paragraphs() {
        let sources = vec![
            SourceDocument::new("a", "A1\nA2\nA3"),
            SourceDocument::new("b", "B1"),
        ];
        let merged = merge_documents_at(&sources, MergeStrategy::Interleaved, "out", fixed_time()).unwrap();
        assert!(merged.starts_with("MERGED DOCUMENT: out (Interleaved)\n"));
        let body: Vec<&str> = merged.lines().filter(|l| l.starts_with("[From ")).collect();
        assert_eq!(body, vec!["[From a] A1", "[From b] B1", "[From a] A2", "[From a] A3"]);
    }

    #[test]
    fn test_smart_merge_sections() {
        let long_title = "x".repeat(120);
        let sources = vec![
            SourceDocument::new("design.txt", "System Design\nThe process is documented."),
            SourceDocument::new("notes.txt", format!("{}\nbody", long_title)),
        ];
        let merged = merge_documents_at(&sources, MergeStrategy::Smart, "out.odt", fixed_time()).unwrap();
        assert!(merged.starts_with("SMART MERGED DOCUMENT: out.odt\n"));
        assert!(merged.contains("This document combines content from 2 source files:\n"));
        assert!(merged.contains("• design.txt: 6 words (Technical content)\n"));
        assert!(merged.contains("• notes.txt: 2 words (General content)\n"));
        assert!(merged.contains("SECTION 1: System Design\nSource: design.txt\n"));
        assert!(merged.contains("SECTION 2: notes.txt\nSource: notes.txt\n"));
    }

    #[test]
    fn test_smart_merge_title_skips_leading_blank_lines() {
        let sources = vec![SourceDocument::new("draft.txt", "\n\n  Release Plan  \nShip in May.")];
        let merged = merge_documents_at(&sources, MergeStrategy::Smart, "out.odt", fixed_time()).unwrap();
        assert!(merged.contains("SECTION 1: Release Plan\nSource: draft.txt\n"));
    }
}
