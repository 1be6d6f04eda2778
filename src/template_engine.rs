//! Placeholder substitution and its inverse.
//!
//! Both directions are one pass per binding or marker, in caller order, over
//! the text produced by the previous pass. A value is never rescanned for its
//! own key, but a later binding does see what earlier ones inserted, and a
//! marker contained in an earlier marker's placeholder is substituted again.

use serde::Serialize;

use crate::lexicon::PLACEHOLDER_NAME_MAX_CHARS;
use crate::modes::TemplateSyntax;

impl TemplateSyntax {
    /// Whether `key` already carries this syntax's delimiters
    pub fn is_wrapped(&self, key: &str) -> bool {
        match self {
            TemplateSyntax::Mustache => key.starts_with("{{") && key.ends_with("}}"),
            TemplateSyntax::Percent => key.starts_with('%') && key.ends_with('%'),
            TemplateSyntax::Dollar => key.starts_with('$'),
        }
    }

    /// Surround a bare name with this syntax's delimiters
    pub fn wrap(&self, name: &str) -> String {
        match self {
            TemplateSyntax::Mustache => format!("{{{{{}}}}}", name),
            TemplateSyntax::Percent => format!("%{}%", name),
            TemplateSyntax::Dollar => format!("${}", name),
        }
    }

    /// The literal text searched for when applying `key`
    pub fn search_key(&self, key: &str) -> String {
        if self.is_wrapped(key) {
            key.to_string()
        } else {
            self.wrap(key)
        }
    }
}

/// Key and replacement value of one placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderBinding {
    pub key: String,
    pub value: String,
}

impl PlaceholderBinding {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Replace each binding's placeholder with its value. Keys that never occur are ignored.
pub fn apply_placeholders(text: &str, bindings: &[PlaceholderBinding], syntax: TemplateSyntax) -> String {
    bindings.iter().fold(text.to_string(), |result, binding| {
        let search_key = syntax.search_key(&binding.key);
        if search_key.is_empty() {
            return result;
        }
        result.replace(&search_key, &binding.value)
    })
}

/// Placeholder name derived from a marker's text.
///
/// `index` is the marker's 0-based position, used for the fallback name.
pub fn placeholder_name(marker: &str, index: usize) -> String {
    let name: String = marker
        .replace([' ', '-'], "_")
        .to_uppercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .take(PLACEHOLDER_NAME_MAX_CHARS)
        .collect();

    if name.is_empty() {
        format!("PLACEHOLDER_{}", index + 1)
    } else {
        name
    }
}

/// Replace every occurrence of each marker with its derived placeholder
pub fn extract_placeholders(text: &str, markers: &[String], syntax: TemplateSyntax) -> String {
    markers
        .iter()
        .enumerate()
        .filter(|(_, marker)| !marker.is_empty())
        .fold(text.to_string(), |result, (index, marker)| {
            let placeholder = syntax.wrap(&placeholder_name(marker, index));
            result.replace(marker.as_str(), &placeholder)
        })
}
