//! Negation filtering for detected red flags
//!
//! "no chest pain" mentions a critical phrase without reporting it. A flag is
//! dropped when the turn text contains one of the negation cues directly in
//! front of the phrase.

use crate::extract::rules::{normalize, CRITICAL_KEYWORDS};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Cues that negate a directly following phrase
pub const NEGATION_CUES: &[&str] = &["no", "not", "don't have", "without"];

/// One negation pattern per critical keyword
static NEGATION_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    CRITICAL_KEYWORDS
        .iter()
        .map(|keyword| {
            let pattern = negation_pattern(keyword).expect("valid regex");
            (*keyword, pattern)
        })
        .collect()
});

fn negation_pattern(flag: &str) -> Result<Regex, regex::Error> {
    let cues = NEGATION_CUES
        .iter()
        .map(|cue| regex::escape(cue))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{cues})\s+{}", regex::escape(flag)))
}

/// Keep only the flags that are not explicitly negated in `source_text`.
///
/// Matching is case-insensitive and apostrophe-insensitive; returned flags
/// are normalized.
pub fn filter_negated(flags: &[String], source_text: &str) -> Vec<String> {
    let text = normalize(source_text);

    flags
        .iter()
        .map(|flag| normalize(flag))
        .filter(|flag| !flag.is_empty())
        .filter(|flag| {
            let negated = is_negated(flag, &text);
            if negated {
                tracing::debug!(flag = %flag, "Ignoring negated red flag");
            }
            !negated
        })
        .collect()
}

/// Byte spans of negated critical phrases in already normalized text
pub fn negated_spans(text: &str) -> Vec<Range<usize>> {
    NEGATION_PATTERNS
        .iter()
        .flat_map(|(_, pattern)| pattern.find_iter(text).map(|m| m.range()))
        .collect()
}

fn is_negated(flag: &str, text: &str) -> bool {
    if let Some((_, pattern)) = NEGATION_PATTERNS.iter().find(|(k, _)| *k == flag) {
        return pattern.is_match(text);
    }

    // Remote extraction may return phrases outside the table
    match negation_pattern(flag) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::warn!(flag = %flag, error = %e, "Unusable red flag pattern");
            false
        }
    }
}
