//! Property-based tests for the rule-based extractor

use super::rules::{CRITICAL_KEYWORDS, NUMBER_WORDS, SEVERITY_KEYWORDS};
use super::{RuleBasedExtractor, Severity};
use proptest::prelude::*;

fn arb_keyword() -> impl Strategy<Value = &'static str> {
    prop::sample::select(SEVERITY_KEYWORDS.iter().map(|(w, _)| *w).collect::<Vec<_>>())
}

fn arb_symptom_word() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["headache", "cough", "rash", "sore throat", "dizziness", "nausea"])
}

proptest! {
    #[test]
    fn parse_is_total(text in "\\PC{0,80}") {
        let candidate = RuleBasedExtractor::new().parse(&text);
        if let Some(severity) = candidate.severity {
            prop_assert!((1..=10).contains(&severity.value()));
        }
    }

    #[test]
    fn parse_is_deterministic(text in "[a-zA-Z0-9 ,.']{0,60}") {
        let extractor = RuleBasedExtractor::new();
        prop_assert_eq!(extractor.parse(&text), extractor.parse(&text));
    }

    #[test]
    fn numeral_beats_keyword(
        keyword in arb_keyword(),
        symptom in arb_symptom_word(),
        n in 1u8..=10,
    ) {
        let text = format!("{keyword} {symptom}, rated {n}");
        let candidate = RuleBasedExtractor::new().parse(&text);
        prop_assert_eq!(candidate.severity.map(Severity::value), Some(n));
    }

    #[test]
    fn number_word_beats_keyword(
        keyword in arb_keyword(),
        idx in 0usize..NUMBER_WORDS.len(),
    ) {
        let (word, value) = NUMBER_WORDS[idx];
        let text = format!("{keyword} cramps, about {word}");
        let candidate = RuleBasedExtractor::new().parse(&text);
        prop_assert_eq!(candidate.severity.map(Severity::value), Some(value));
    }

    #[test]
    fn critical_keyword_always_detected(
        idx in 0usize..CRITICAL_KEYWORDS.len(),
        prefix in "[a-z ]{0,20}",
        suffix in "[a-z ]{0,20}",
    ) {
        let keyword = CRITICAL_KEYWORDS[idx];
        let text = format!("{prefix} {keyword} {suffix}");
        let candidate = RuleBasedExtractor::new().parse(&text);
        prop_assert!(candidate.red_flags.iter().any(|f| f == keyword));
    }

    #[test]
    fn explicit_age_extracted(age in 1u32..=110, symptom in arb_symptom_word()) {
        let text = format!("{symptom}, I am {age} years old");
        let candidate = RuleBasedExtractor::new().parse(&text);
        prop_assert_eq!(candidate.age, Some(age));
        prop_assert!(candidate.duration.is_none());
    }
}
