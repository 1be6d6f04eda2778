use std::collections::HashSet;

use serde::Serialize;

use crate::lexicon::*;
use crate::modes::AnalysisDepth;
use crate::text_utils::{
    average, count_present, format_thousands, is_title_cased, is_upper_cased, paragraphs, sentences,
    strip_token_punctuation, truncate_with_ellipsis, word_count, words,
};

/// Whether a trimmed paragraph looks like a section heading under `rule`.
///
/// Size limits and the trailing-period check must all hold; after that a
/// marker token, an all-caps line or a title-cased line each qualify on their own.
pub fn is_heading_candidate(paragraph: &str, rule: HeadingRule) -> bool {
    let line = paragraph.trim();
    if line.is_empty()
        || line.chars().count() >= rule.max_chars
        || word_count(line) >= rule.max_words
        || line.ends_with('.')
    {
        return false;
    }

    let lower = line.to_lowercase();
    HEADING_MARKERS.iter().any(|marker| lower.contains(marker))
        || is_upper_cased(line)
        || is_title_cased(line)
}

/// Counts and classifications gathered once per analysed text
#[derive(Debug, Clone, Serialize)]
pub struct StructureReport {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub line_count: usize,
    pub headings: Vec<String>,
    pub average_paragraph_words: f64,
    pub average_sentence_words: f64,
    pub vocabulary_richness: f64,
    pub technical_score: usize,
    pub narrative_score: usize,
    pub intro_words: usize,
    pub body_words: usize,
    pub conclusion_words: usize,
}

impl StructureReport {
    pub fn from_text(text: &str) -> Self {
        let paragraphs = paragraphs(text);
        let sentences = sentences(text);
        let words = words(text);
        let lower = text.to_lowercase();

        let headings: Vec<String> = paragraphs
            .iter()
            .filter(|p| is_heading_candidate(p, STRUCTURE_HEADING_RULE))
            .map(|p| p.to_string())
            .collect();

        let paragraph_words: usize = paragraphs.iter().map(|p| word_count(p)).sum();
        let sentence_words: usize = sentences.iter().map(|s| word_count(s)).sum();

        let unique_words: HashSet<String> = words
            .iter()
            .map(|w| strip_token_punctuation(&w.to_lowercase()).to_string())
            .collect();

        let (intro_words, body_words, conclusion_words) = content_distribution(&paragraphs, words.len());

        Self {
            word_count: words.len(),
            sentence_count: sentences.len(),
            paragraph_count: paragraphs.len(),
            line_count: text.split('\n').count(),
            headings,
            average_paragraph_words: average(paragraph_words, paragraphs.len()),
            average_sentence_words: average(sentence_words, sentences.len()),
            vocabulary_richness: average(unique_words.len(), words.len()),
            technical_score: count_present(&lower, STRUCTURE_TECHNICAL_TERMS),
            narrative_score: count_present(&lower, STRUCTURE_NARRATIVE_TERMS),
            intro_words,
            body_words,
            conclusion_words,
        }
    }

    fn heading_count(&self) -> usize {
        self.headings.len()
    }
}

/// Intro is the first two paragraphs, conclusion the last two, body what is left.
///
/// With fewer than four paragraphs intro and conclusion overlap and the body is zero.
fn content_distribution(paragraphs: &[&str], total_words: usize) -> (usize, usize, usize) {
    if paragraphs.len() < 2 {
        return (total_words, 0, 0);
    }
    let intro: usize = paragraphs[..2].iter().map(|p| word_count(p)).sum();
    let conclusion: usize = paragraphs[paragraphs.len() - 2..].iter().map(|p| word_count(p)).sum();
    let body = total_words.saturating_sub(intro + conclusion);
    (intro, body, conclusion)
}

/// Render a structural report at the requested depth
pub fn analyze_structure(text: &str, filename: &str, depth: AnalysisDepth) -> String {
    if text.trim().is_empty() {
        return format!(
            "Document '{}' appears to be empty or content could not be extracted.",
            filename
        );
    }

    let report = StructureReport::from_text(text);
    log::debug!(
        "Structure of '{}': {} paragraphs, {} headings",
        filename,
        report.paragraph_count,
        report.heading_count()
    );

    match depth {
        AnalysisDepth::Basic => basic_report(&report, filename),
        AnalysisDepth::Detailed => detailed_report(&report, filename),
        AnalysisDepth::Comprehensive => comprehensive_report(&report, filename),
    }
}

fn basic_report(report: &StructureReport, filename: &str) -> String {
    let structure_type = match report.technical_score.cmp(&report.narrative_score) {
        std::cmp::Ordering::Greater => "Technical/Instructional",
        std::cmp::Ordering::Less => "Narrative/Descriptive",
        std::cmp::Ordering::Equal => "Mixed Content",
    };
    let organization = if report.heading_count() > 2 { "Well-structured" } else { "Simple structure" };

    format!(
        "Basic Structure Analysis for '{}':\n\n\
         Document Overview:\n\
         - {} words in {} sentences\n\
         - {} paragraphs, {} total lines\n\
         - Average paragraph length: {:.1} words\n\n\
         Structure Type: {}\n\
         Organization: {}",
        filename,
        format_thousands(report.word_count),
        report.sentence_count,
        report.paragraph_count,
        report.line_count,
        report.average_paragraph_words,
        structure_type,
        organization,
    )
}

fn detailed_report(report: &StructureReport, filename: &str) -> String {
    let headings = report.heading_count();
    let avg = report.average_paragraph_words;

    let previews: Vec<String> = report
        .headings
        .iter()
        .take(HEADING_PREVIEW_COUNT)
        .map(|h| truncate_with_ellipsis(h, HEADING_PREVIEW_CHARS))
        .collect();

    let hierarchy = if headings > 4 {
        "Multi-level structure"
    } else if headings > 1 {
        "Simple structure"
    } else {
        "Continuous text"
    };
    let style = if report.technical_score > 3 {
        "Technical/Formal"
    } else if report.narrative_score > 3 {
        "Narrative/Personal"
    } else {
        "General/Mixed"
    };
    let density = if avg > 60.0 {
        "Information-dense"
    } else if avg > 30.0 {
        "Moderate density"
    } else {
        "Concise style"
    };
    let purpose = match report.technical_score.cmp(&report.narrative_score) {
        std::cmp::Ordering::Greater => "Instructional/Reference",
        std::cmp::Ordering::Less => "Storytelling/Experiential",
        std::cmp::Ordering::Equal => "General communication",
    };
    let organization = if headings > 2 { "Well-organized" } else { "Basic organization" };
    let flow = if headings > 0 { "Structured progression" } else { "Continuous narrative" };
    let readability = if headings > 1 && avg > 20.0 && avg < 100.0 {
        "Professional format"
    } else {
        "Informal format"
    };

    format!(
        "Detailed Structure Analysis for '{}':\n\n\
         DOCUMENT OVERVIEW:\n\
         - Content volume: {} words across {} paragraphs\n\
         - Sentence count: {} sentences\n\
         - Average paragraph length: {:.1} words\n\n\
         ORGANIZATIONAL STRUCTURE:\n\
         - Structural elements identified: {} potential headings/sections\n\
         - Headings found: {}\n\
         - Document hierarchy: {}\n\n\
         CONTENT CHARACTERISTICS:\n\
         - Writing style: {}\n\
         - Content density: {}\n\
         - Document purpose: {}\n\n\
         STRUCTURAL QUALITY:\n\
         - Organization level: {}\n\
         - Content flow: {}\n\
         - Readability: {}",
        filename,
        format_thousands(report.word_count),
        report.paragraph_count,
        report.sentence_count,
        avg,
        headings,
        quoted_list(&previews),
        hierarchy,
        style,
        density,
        purpose,
        organization,
        flow,
        readability,
    )
}

fn comprehensive_report(report: &StructureReport, filename: &str) -> String {
    let headings = report.heading_count();
    let avg_paragraph = report.average_paragraph_words;
    let avg_sentence = report.average_sentence_words;

    let sections = if headings > 5 {
        "Highly structured"
    } else if headings > 2 {
        "Moderately structured"
    } else {
        "Simple structure"
    };
    let content_type = if report.technical_score >= 4 {
        "Technical/Analytical"
    } else if report.narrative_score >= 4 {
        "Narrative/Personal"
    } else {
        "General/Mixed"
    };
    let sentence_complexity = if avg_sentence > 20.0 {
        "Complex"
    } else if avg_sentence > 12.0 {
        "Moderate"
    } else {
        "Simple"
    };
    let paragraph_structure = if avg_paragraph > 100.0 {
        "Dense"
    } else if avg_paragraph > 40.0 {
        "Balanced"
    } else {
        "Concise"
    };
    let overall = if headings > 3 && avg_paragraph > 30.0 {
        "Professional document structure"
    } else {
        "Informal or narrative style"
    };
    let heading_advice = if headings < 3 && report.paragraph_count > 10 {
        "Consider adding more section headings for better navigation"
    } else {
        "Good structural organization maintained"
    };
    let paragraph_advice =
        if avg_paragraph > BALANCED_PARAGRAPH_WORDS_MIN && avg_paragraph < BALANCED_PARAGRAPH_WORDS_MAX {
            "Paragraph length is well-balanced for readability"
        } else {
            "Consider adjusting paragraph length for optimal readability"
        };

    format!(
        "Comprehensive Structure Analysis for '{}':\n\n\
         DOCUMENT METRICS:\n\
         - Total content: {} words, {} sentences, {} paragraphs\n\
         - Vocabulary richness: {:.2}% (unique words ratio)\n\
         - Average sentence length: {:.1} words\n\
         - Average paragraph length: {:.1} words\n\n\
         STRUCTURAL ORGANIZATION:\n\
         - Identified headings: {}\n\
         - Document sections: {}\n\
         - Content distribution: Introduction {} words, Body {} words, Conclusion {} words\n\n\
         CONTENT CLASSIFICATION:\n\
         - Technical complexity: {}/{} indicators\n\
         - Narrative elements: {}/{} indicators\n\
         - Content type: {}\n\n\
         READABILITY ASSESSMENT:\n\
         - Sentence complexity: {}\n\
         - Paragraph structure: {}\n\
         - Overall organization: {}\n\n\
         STRUCTURAL RECOMMENDATIONS:\n\
         - {}\n\
         - {}",
        filename,
        format_thousands(report.word_count),
        report.sentence_count,
        report.paragraph_count,
        report.vocabulary_richness * 100.0,
        avg_sentence,
        avg_paragraph,
        headings,
        sections,
        report.intro_words,
        report.body_words,
        report.conclusion_words,
        report.technical_score,
        STRUCTURE_TECHNICAL_TERMS.len(),
        report.narrative_score,
        STRUCTURE_NARRATIVE_TERMS.len(),
        content_type,
        sentence_complexity,
        paragraph_structure,
        overall,
        heading_advice,
        paragraph_advice,
    )
}

/// `['a', 'b']` style listing
fn quoted_list(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| {
            if item.contains('\'') && !item.contains('"') {
                format!("\"{}\"", item)
            } else {
                format!("'{}'", item.replace('\'', "\\'"))
            }
        })
        .collect();
    format!("[{}]", quoted.join(", "))
}
