use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::lexicon::*;
use crate::modes::{SearchMode, SummaryMode};
use crate::text_utils::{
    contains_any, format_thousands, paragraphs, raw_sentences, sentences, take_chars,
    truncate_with_ellipsis, words, CharIndex, ELLIPSIS,
};

/// Returned by `summarize` for a blank document
pub const EMPTY_DOCUMENT_MESSAGE: &str = "Document appears to be empty or content could not be extracted.";

/// Summarize document text in the requested style.
///
/// `max_words` only bounds the `brief` style. Output is fully determined by the input.
pub fn summarize(text: &str, mode: SummaryMode, max_words: usize) -> String {
    if text.trim().is_empty() {
        return EMPTY_DOCUMENT_MESSAGE.to_string();
    }

    match mode {
        SummaryMode::Brief => brief_summary(text, max_words),
        SummaryMode::BulletPoints => bullet_point_summary(text),
        SummaryMode::Detailed => detailed_summary(text),
    }
}

fn brief_summary(text: &str, max_words: usize) -> String {
    let paragraphs = paragraphs(text);
    let mut combined = paragraphs.first().copied().unwrap_or_default().to_string();

    let closing = paragraphs
        .iter()
        .find(|paragraph| contains_any(&paragraph.to_lowercase(), SUMMARY_INDICATORS));
    if let Some(closing) = closing {
        combined.push(' ');
        combined.push_str(closing);
    }

    let combined_words = words(&combined);
    if combined_words.len() > max_words {
        combined = format!("{}{}", combined_words[..max_words].join(" "), ELLIPSIS);
    }

    format!("Brief Summary: {}", combined)
}

fn bullet_point_summary(text: &str) -> String {
    let mut picked: Vec<&str> = Vec::new();

    // Lead sentence of each opening paragraph
    for paragraph in paragraphs(text).into_iter().take(BULLET_SOURCE_PARAGRAPHS) {
        let lead = raw_sentences(paragraph).first().map(|s| s.trim()).unwrap_or_default();
        if !lead.is_empty() && !picked.contains(&lead) {
            picked.push(lead);
        }
    }

    let mut extras = 0;
    for sentence in raw_sentences(text).into_iter().take(BULLET_KEYWORD_SCAN_SENTENCES) {
        if extras >= BULLET_KEYWORD_EXTRAS {
            break;
        }
        let sentence = sentence.trim();
        if sentence.is_empty() || picked.contains(&sentence) {
            continue;
        }
        if contains_any(&sentence.to_lowercase(), BULLET_KEYWORDS) {
            picked.push(sentence);
            extras += 1;
        }
    }

    let bullets: Vec<String> = picked
        .iter()
        .take(BULLET_MAX_LINES)
        .map(|sentence| format!("• {}", truncate_with_ellipsis(sentence, BULLET_MAX_CHARS)))
        .collect();

    format!("Document Summary (Bullet Points):\n\n{}", bullets.join("\n"))
}

fn detailed_summary(text: &str) -> String {
    let paragraphs = paragraphs(text);
    let word_total = words(text).len();
    let lower = text.to_lowercase();

    let introduction = paragraphs
        .first()
        .map(|p| truncate_with_ellipsis(p, DETAILED_INTRO_CHARS))
        .unwrap_or_else(|| "No content available".to_string());

    let key_points: Vec<String> = paragraphs
        .iter()
        .skip(1)
        .take(3)
        .filter(|p| p.chars().count() > DETAILED_KEY_POINT_MIN_CHARS)
        .map(|p| format!("• {}", truncate_with_ellipsis(p, DETAILED_KEY_POINT_CHARS)))
        .collect();

    let nature = if contains_any(&lower, TECHNICAL_INDICATORS) {
        "technical/structured"
    } else {
        "narrative/descriptive"
    };
    let density = if word_total > COMPLEX_DOCUMENT_WORDS { "complex" } else { "moderate" };

    format!(
        "Detailed Document Summary:\n\n\
         Document Structure:\n\
         - {} characters, {} words\n\
         - {} sentences in {} paragraphs\n\n\
         Introduction:\n{}\n\n\
         Key Content Areas:\n{}\n\n\
         Document Analysis:\n\
         This document appears to be {} in nature, with {} content density.",
        format_thousands(text.chars().count()),
        format_thousands(word_total),
        sentences(text).len(),
        paragraphs.len(),
        introduction,
        key_points.join("\n"),
        nature,
        density,
    )
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Character offset for exact/regex hits, sentence index for fuzzy hits
    pub position: usize,
    pub context: String,
    pub matched_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
}

/// Result of a search, including a message when the search could not run
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub matches: Vec<Match>,
    pub total_matches: usize,
    pub search_term: String,
    pub search_type: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SearchOutcome {
    pub fn success(matches: Vec<Match>, search_term: &str, search_type: SearchMode) -> Self {
        Self {
            total_matches: matches.len(),
            matches,
            search_term: search_term.to_string(),
            search_type,
            message: None,
        }
    }

    /// No matches, with a message explaining why
    pub fn empty(search_term: &str, search_type: SearchMode, message: String) -> Self {
        Self {
            matches: Vec::new(),
            total_matches: 0,
            search_term: search_term.to_string(),
            search_type,
            message: Some(message),
        }
    }
}

/// Search document text for a term.
///
/// An invalid regular expression is reported through `SearchOutcome::message`, never as a failure.
pub fn search(text: &str, term: &str, mode: SearchMode) -> SearchOutcome {
    if text.trim().is_empty() {
        return SearchOutcome::empty(term, mode, "No content to search".to_string());
    }

    match mode {
        SearchMode::Exact => {
            if term.is_empty() {
                return SearchOutcome::empty(term, mode, "Search term is empty".to_string());
            }
            match build_case_insensitive(&regex::escape(term)) {
                Ok(pattern) => SearchOutcome::success(pattern_matches(text, &pattern), term, mode),
                Err(e) => SearchOutcome::empty(term, mode, format!("Invalid search term: {}", e)),
            }
        }
        SearchMode::Regex => match build_case_insensitive(term) {
            Ok(pattern) => SearchOutcome::success(pattern_matches(text, &pattern), term, mode),
            Err(e) => SearchOutcome::empty(term, mode, format!("Invalid regex pattern: {}", e)),
        },
        SearchMode::Fuzzy => SearchOutcome::success(fuzzy_matches(text, term), term, mode),
    }
}

fn build_case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Every match of `pattern`, with a context window of SEARCH_CONTEXT_CHARS on each side
fn pattern_matches(text: &str, pattern: &Regex) -> Vec<Match> {
    let index = CharIndex::new(text);

    pattern
        .find_iter(text)
        .map(|found| {
            let start = index.char_at_byte(found.start());
            let end = index.char_at_byte(found.end());
            let context = index.slice(
                start.saturating_sub(SEARCH_CONTEXT_CHARS),
                end + SEARCH_CONTEXT_CHARS,
            );
            Match {
                position: start,
                context: context.to_string(),
                matched_text: found.as_str().to_string(),
                relevance: None,
            }
        })
        .collect()
}

/// Sentences holding at least 60% of the term's words, most relevant first
fn fuzzy_matches(text: &str, term: &str) -> Vec<Match> {
    let term_lower = term.to_lowercase();
    let term_words = words(&term_lower);
    let total = term_words.len();

    let mut matches: Vec<Match> = raw_sentences(text)
        .into_iter()
        .enumerate()
        .filter_map(|(position, sentence)| {
            let sentence = sentence.trim();
            if sentence.is_empty() || total == 0 {
                return None;
            }
            let sentence_lower = sentence.to_lowercase();
            let matched = term_words.iter().filter(|word| sentence_lower.contains(*word)).count();
            if matched == 0 || matched * FUZZY_MATCH_DENOMINATOR < total * FUZZY_MATCH_NUMERATOR {
                return None;
            }
            Some(Match {
                position,
                context: truncate_with_ellipsis(sentence, FUZZY_CONTEXT_CHARS),
                matched_text: take_chars(sentence, FUZZY_MATCH_TEXT_CHARS).to_string(),
                relevance: Some(matched as f64 / total as f64),
            })
        })
        .collect();

    // Stable sort keeps document order among equally relevant sentences
    matches.sort_by(|a, b| b.relevance.unwrap_or(0.0).total_cmp(&a.relevance.unwrap_or(0.0)));
    matches.truncate(FUZZY_MAX_MATCHES);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "Project Alpha Report\n\
        The team built a new ingestion system for the archive.\n\
        Testing took three weeks. Some tests were flaky.\n\
        In conclusion, the rollout was a success and all milestones were completed.";

    #[test]
    fn test_empty_document_summary() {
        assert_eq!(summarize("", SummaryMode::Brief, 200), EMPTY_DOCUMENT_MESSAGE);
        assert_eq!(summarize("  \n\t ", SummaryMode::Detailed, 10), EMPTY_DOCUMENT_MESSAGE);
    }

    #[test]
    fn test_brief_summary_adds_concluding_paragraph() {
        let summary = summarize(REPORT, SummaryMode::Brief, 200);
        assert_eq!(
            summary,
            "Brief Summary: Project Alpha Report In conclusion, the rollout was a success and all milestones were completed."
        );
    }

    #[test]
    fn test_brief_summary_respects_word_limit() {
        let text = "one two three four five six seven eight nine ten";
        let summary = summarize(text, SummaryMode::Brief, 4);
        assert_eq!(summary, "Brief Summary: one two three four...");

        let body = summary.trim_start_matches("Brief Summary: ");
        assert!(body.split_whitespace().count() <= 4);
    }

    #[test]
    fn test_bullet_points_collect_leads_and_keyword_sentences() {
        let text = "Alpha starts here. More alpha.\n\
                    Beta begins. Beta continues.\n\
                    This is important for everyone. Another critical note. A third critical point. Yet another important remark.";
        let summary = summarize(text, SummaryMode::BulletPoints, 200);
        let bullets: Vec<&str> = summary.lines().filter(|l| l.starts_with("• ")).collect();

        assert_eq!(bullets[0], "• Alpha starts here");
        assert_eq!(bullets[1], "• Beta begins");
        assert_eq!(bullets[2], "• This is important for everyone");
        // Two keyword extras at most; the lead sentence above is not repeated
        assert_eq!(bullets[3], "• Another critical note");
        assert_eq!(bullets[4], "• A third critical point");
        assert_eq!(bullets.len(), 5);
    }

    #[test]
    fn test_bullet_points_are_capped_and_truncated() {
        let long = "word ".repeat(40);
        let text = (0..8).map(|i| format!("Paragraph {} {}.", i, long)).collect::<Vec<_>>().join("\n");
        let summary = summarize(&text, SummaryMode::BulletPoints, 200);
        let bullets: Vec<&str> = summary.lines().filter(|l| l.starts_with("• ")).collect();

        assert_eq!(bullets.len(), 5);
        for bullet in bullets {
            assert!(bullet.ends_with("..."));
            assert_eq!(bullet.trim_start_matches("• ").chars().count(), 103);
        }
    }

    #[test]
    fn test_detailed_summary_reports_counts_and_classification() {
        let summary = summarize(REPORT, SummaryMode::Detailed, 200);
        assert!(summary.contains("- 4 sentences in 4 paragraphs"));
        assert!(summary.contains("Introduction:\nProject Alpha Report"));
        assert!(summary.contains("technical/structured"));
        assert!(summary.contains("moderate content density"));
        assert!(summary.contains("• The team built a new ingestion system for the archive."));
    }

    #[test]
    fn test_summaries_are_deterministic() {
        for mode in SummaryMode::ALL {
            assert_eq!(summarize(REPORT, *mode, 20), summarize(REPORT, *mode, 20));
        }
    }

    #[test]
    fn test_exact_search_counts_case_insensitive_occurrences() {
        let text = "Rust is fast. rust is safe. RUST is fun.";
        let outcome = search(text, "rust", SearchMode::Exact);
        assert_eq!(outcome.total_matches, 3);
        assert_eq!(outcome.matches[0].position, 0);
        assert_eq!(outcome.matches[1].position, 14);
        assert_eq!(outcome.matches[2].matched_text, "RUST");
        assert!(outcome.message.is_none());
    }

    #[test]
    fn test_exact_search_clamps_context_window() {
        let text = format!("{}needle{}", "a".repeat(60), "b".repeat(10));
        let outcome = search(&text, "needle", SearchMode::Exact);
        assert_eq!(outcome.total_matches, 1);
        let context = &outcome.matches[0].context;
        assert_eq!(context, &format!("{}needle{}", "a".repeat(50), "b".repeat(10)));
    }

    #[test]
    fn test_exact_search_treats_metacharacters_literally() {
        let outcome = search("cost is $5 (approx.) or $5.", "$5", SearchMode::Exact);
        assert_eq!(outcome.total_matches, 2);
    }

    #[test]
    fn test_regex_search_and_invalid_pattern() {
        let outcome = search("Call 555-1234 or 555-9876.", r"\d{3}-\d{4}", SearchMode::Regex);
        assert_eq!(outcome.total_matches, 2);

        let invalid = search("anything", "([unclosed", SearchMode::Regex);
        assert_eq!(invalid.total_matches, 0);
        assert!(invalid.message.unwrap().starts_with("Invalid regex pattern"));
    }

    #[test]
    fn test_fuzzy_search_single_word_full_relevance() {
        let text = "The cat sat down. A dog barked loudly. Birds sang.";
        let outcome = search(text, "dog", SearchMode::Fuzzy);
        assert_eq!(outcome.total_matches, 1);
        assert_eq!(outcome.matches[0].relevance, Some(1.0));
        assert_eq!(outcome.matches[0].position, 1);
        assert_eq!(outcome.matches[0].context, "A dog barked loudly");
    }

    #[test]
    fn test_fuzzy_search_threshold_and_ordering() {
        let text = "alpha beta gamma delta. alpha beta gamma. alpha beta. alpha.";
        let outcome = search(text, "alpha beta gamma delta epsilon", SearchMode::Fuzzy);
        // 5 term words need at least 3 matches
        let relevances: Vec<f64> = outcome.matches.iter().map(|m| m.relevance.unwrap()).collect();
        assert_eq!(relevances, vec![0.8, 0.6]);
        assert!(relevances.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_fuzzy_search_caps_results() {
        let text = "needle here. ".repeat(25);
        let outcome = search(&text, "needle", SearchMode::Fuzzy);
        assert_eq!(outcome.total_matches, FUZZY_MAX_MATCHES);
    }

    #[test]
    fn test_search_on_empty_document() {
        let outcome = search("   ", "term", SearchMode::Fuzzy);
        assert_eq!(outcome.total_matches, 0);
        assert_eq!(outcome.message.as_deref(), Some("No content to search"));
    }
}
