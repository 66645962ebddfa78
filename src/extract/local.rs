//! Rule-based entity extraction
//!
//! Total and pure: every input yields a candidate, with `None` for fields no
//! rule recognised.

use super::rules::{
    first_match, normalize, AGE_RULES, CRITICAL_KEYWORDS, DURATION_RULES, SEVERITY_RULES,
    SYMPTOM_STRIP_PATTERNS, WHITESPACE,
};
use super::{EntityCandidate, EntityExtractor, ExtractError, ExtractionSource, Severity};
use crate::red_flags::negated_spans;
use async_trait::async_trait;
use std::ops::Range;

const MAX_AGE: u32 = 130;

/// Local extractor driven by the tables in [`super::rules`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedExtractor;

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parse one turn of text.
    ///
    /// Age runs first, then duration, then severity; each match is blanked
    /// out before the next field runs so one number is never read twice.
    /// Negated critical phrases are blanked too. Whatever survives the
    /// blanking and the filler tables is the symptom.
    pub fn parse(&self, text: &str) -> EntityCandidate {
        let clean = normalize(text);
        let mut masked = clean.clone();
        for span in negated_spans(&clean) {
            mask(&mut masked, &span);
        }

        let age = first_match(&AGE_RULES, &masked).and_then(|(rule, m)| {
            mask(&mut masked, &m.span);
            tracing::trace!(rule, age = m.value, "Age matched");
            (m.value <= MAX_AGE).then_some(m.value)
        });

        let duration = first_match(&DURATION_RULES, &masked).map(|(rule, m)| {
            mask(&mut masked, &m.span);
            tracing::trace!(rule, duration = %m.value, "Duration matched");
            m.value
        });

        let severity = first_match(&SEVERITY_RULES, &masked).and_then(|(rule, m)| {
            mask(&mut masked, &m.span);
            tracing::trace!(rule, severity = m.value, "Severity matched");
            Severity::new(m.value)
        });

        EntityCandidate {
            symptom: extract_symptom(&masked),
            associated_symptoms: None,
            severity,
            duration,
            age,
            red_flags: detect_red_flags(&clean),
            source: ExtractionSource::Local,
        }
    }
}

#[async_trait]
impl EntityExtractor for RuleBasedExtractor {
    async fn extract(&self, text: &str) -> Result<EntityCandidate, ExtractError> {
        Ok(self.parse(text))
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Local
    }
}

/// Blank a matched span with spaces, keeping byte offsets stable
fn mask(text: &mut String, span: &Range<usize>) {
    if text.is_char_boundary(span.start) && text.is_char_boundary(span.end) {
        text.replace_range(span.clone(), &" ".repeat(span.len()));
    }
}

fn extract_symptom(masked: &str) -> Option<String> {
    let stripped = SYMPTOM_STRIP_PATTERNS
        .iter()
        .fold(masked.to_string(), |acc, pattern| {
            pattern.replace_all(&acc, " ").into_owned()
        });
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    let symptom = collapsed.trim();

    (!symptom.is_empty()).then(|| symptom.to_string())
}

/// Critical phrases present in `text`, in table order
pub fn detect_red_flags(text: &str) -> Vec<String> {
    let lower = normalize(text);
    CRITICAL_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .map(|keyword| (*keyword).to_string())
        .collect()
}
