//! Fixed keyword tables and thresholds behind the text heuristics.
//!
//! Every classification in the analytics, relation and segmentation engines
//! reads its constants from here, so output stays reproducible and tests can
//! pin the exact values.

/// Paragraph markers that pull a second paragraph into a brief summary
pub const SUMMARY_INDICATORS: &[&str] = &["summary", "conclusion", "result", "achievement", "success", "completed"];

/// Sentence keywords that earn an extra bullet in a bullet-point summary
pub const BULLET_KEYWORDS: &[&str] = &["important", "critical", "summary", "conclusion", "result", "achievement", "success"];

/// Terms that mark a summarized or compared document as technical
pub const TECHNICAL_INDICATORS: &[&str] = &["system", "process", "method", "implementation"];

/// Terms that mark a merge source as technical
pub const MERGE_TECHNICAL_INDICATORS: &[&str] = &["system", "process", "implementation"];

/// Technical vocabulary scored by structural analysis
pub const STRUCTURE_TECHNICAL_TERMS: &[&str] = &[
    "system", "process", "method", "implementation", "algorithm", "function", "data", "analysis",
];

/// Narrative vocabulary scored by structural analysis
pub const STRUCTURE_NARRATIVE_TERMS: &[&str] = &[
    "story", "experience", "happened", "felt", "thought", "remember", "yesterday", "first", "then", "finally",
];

/// Tokens that flag a short line as a section heading
pub const HEADING_MARKERS: &[&str] = &["chapter", "section", "part", "1.", "2.", "a.", "b."];

/// Words ignored by the vocabulary overlap comparison
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "a", "an", "is", "are",
    "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would", "could", "should",
];

/// Characters stripped from both ends of a token before vocabulary comparison
pub const TOKEN_PUNCTUATION: &str = ".,!?;:\"()[]";

/// Size limits for a line to be considered a heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingRule {
    /// Trimmed line must be shorter than this many characters
    pub max_chars: usize,
    /// Trimmed line must have fewer than this many words
    pub max_words: usize,
}

/// Heading rule used by structural analysis and heading-based splitting
pub const STRUCTURE_HEADING_RULE: HeadingRule = HeadingRule { max_chars: 100, max_words: 12 };

/// Stricter heading rule used when comparing document structure
pub const COMPARISON_HEADING_RULE: HeadingRule = HeadingRule { max_chars: 100, max_words: 10 };

// Summaries
pub const BULLET_SOURCE_PARAGRAPHS: usize = 5;
pub const BULLET_KEYWORD_SCAN_SENTENCES: usize = 10;
pub const BULLET_KEYWORD_EXTRAS: usize = 2;
pub const BULLET_MAX_LINES: usize = 6;
pub const BULLET_MAX_CHARS: usize = 100;
pub const DETAILED_INTRO_CHARS: usize = 300;
pub const DETAILED_KEY_POINT_CHARS: usize = 150;
pub const DETAILED_KEY_POINT_MIN_CHARS: usize = 50;
pub const COMPLEX_DOCUMENT_WORDS: usize = 500;
pub const DEFAULT_SUMMARY_WORDS: usize = 200;

// Search
pub const SEARCH_CONTEXT_CHARS: usize = 50;
/// Fuzzy search keeps a sentence when matched/total >= NUMERATOR/DENOMINATOR (i.e. 60%)
pub const FUZZY_MATCH_NUMERATOR: usize = 3;
pub const FUZZY_MATCH_DENOMINATOR: usize = 5;
pub const FUZZY_MAX_MATCHES: usize = 10;
pub const FUZZY_CONTEXT_CHARS: usize = 200;
pub const FUZZY_MATCH_TEXT_CHARS: usize = 100;

// Structure analysis
pub const HEADING_PREVIEW_COUNT: usize = 5;
pub const HEADING_PREVIEW_CHARS: usize = 50;
pub const BALANCED_PARAGRAPH_WORDS_MIN: f64 = 30.0;
pub const BALANCED_PARAGRAPH_WORDS_MAX: f64 = 80.0;

// Comparison
pub const COMPARISON_SENTENCE_LIMIT: usize = 10;
pub const COMPARISON_SENTENCE_MIN_CHARS: usize = 20;
pub const SIMILAR_SENTENCE_OVERLAP: f64 = 0.5;
pub const STRUCTURE_PARAGRAPH_DELTA: usize = 3;
pub const COMMON_TERMS_SHOWN: usize = 8;
pub const HIGH_SIMILARITY_PERCENT: f64 = 30.0;
pub const LOW_SIMILARITY_PERCENT: f64 = 10.0;
pub const OPENING_PREVIEW_CHARS: usize = 150;

// Merge
pub const MERGE_TITLE_MAX_CHARS: usize = 100;
pub const MERGE_BANNER_WIDTH: usize = 60;
pub const MERGE_SECTION_RULE_WIDTH: usize = 40;

// Segmentation
pub const WORDS_PER_PAGE: usize = 250;
pub const DEFAULT_SECTION_WORDS: usize = 500;
pub const HEADING_SECTION_MIN_WORDS: usize = 50;
pub const TARGET_SECTION_COUNT: usize = 5;
pub const MIN_PARAGRAPHS_PER_SECTION: usize = 3;
pub const SECTION_TITLE_PREVIEW_CHARS: usize = 50;

// Templates
pub const PLACEHOLDER_NAME_MAX_CHARS: usize = 20;
