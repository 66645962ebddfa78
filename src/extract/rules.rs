//! Rule tables for the rule-based extractor
//!
//! Every field is extracted by an ordered list of [`Rule`]s. Lower priority
//! values run first and the first rule that yields a value wins. Keyword and
//! phrase tables are plain data so they can be read and tested directly.

use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::LazyLock;

/// Apostrophe variants folded to ASCII `'` before any rule runs
const APOSTROPHES: &[char] = &['\u{2019}', '\u{2018}', '\u{02BC}', '\u{FF07}'];

/// Trim, lowercase and fold typographic apostrophes so phone-keyboard text
/// ("I\u{2019}m", "can\u{2019}t") matches the tables
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase().replace(APOSTROPHES, "'")
}

/// Qualitative severity words and their weight on the 1-10 scale
pub const SEVERITY_KEYWORDS: &[(&str, u8)] = &[
    ("mild", 2),
    ("low", 2),
    ("slight", 2),
    ("bit", 2),
    ("moderate", 5),
    ("medium", 5),
    ("average", 5),
    ("severe", 8),
    ("high", 8),
    ("intense", 8),
    ("worst", 10),
    ("excruciating", 10),
    ("unbearable", 10),
    ("killer", 9),
    ("bad", 7),
    ("hurts", 6),
    ("painful", 6),
];

/// Spelled-out numbers accepted as a severity rating
pub const NUMBER_WORDS: &[(&str, u8)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

/// Phrases that indicate a potential emergency
pub const CRITICAL_KEYWORDS: &[&str] = &[
    "chest pain",
    "heart attack",
    "crushing pain",
    "shortness of breath",
    "can't breathe",
    "gasping",
    "air hunger",
    "stroke",
    "face drooping",
    "slurred speech",
    "numbness",
    "unconscious",
    "fainted",
    "passed out",
    "severe bleeding",
    "hemorrhage",
    "suicide",
    "kill myself",
    "overdose",
];

/// Connector words removed from the symptom text
pub const CONNECTORS: &[&str] = &[
    "for", "since", "is", "was", "around", "about", "and", "also", "but", "with",
];

/// Lead-in and filler phrases removed from the symptom text
pub const FILLER_PHRASES: &[&str] = &[
    "i have",
    "i am having",
    "i've had",
    "i feel",
    "it feels",
    "there is",
    "i'm",
    "im",
    "suffering from",
    "complaining of",
    "experiencing",
    "my",
    "severity",
    "level",
    "rated",
    "age",
    "years",
    "old",
];

/// Articles and intensity adjectives removed from the symptom text
pub const DESCRIPTORS: &[&str] = &[
    "a", "an", "the", "some", "very", "really", "quite", "bad", "mild", "severe", "moderate",
];

/// How a rule chooses among several matches in the same text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Earliest accepted match
    FirstMatch,
    /// Accepted match with the largest value; earliest wins ties
    HighestValue,
}

/// A value found in the text together with the byte span that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<T> {
    pub value: T,
    pub span: Range<usize>,
}

/// One extraction rule: a pattern plus a handler that turns a match into a
/// value, or rejects it by returning `None`.
pub struct Rule<T> {
    pub name: &'static str,
    pub priority: u8,
    pub pattern: Regex,
    pub selection: Selection,
    pub handler: fn(&Captures<'_>) -> Option<T>,
}

impl<T: PartialOrd> Rule<T> {
    pub fn apply(&self, text: &str) -> Option<RuleMatch<T>> {
        let mut best: Option<RuleMatch<T>> = None;

        for caps in self.pattern.captures_iter(text) {
            let Some(value) = (self.handler)(&caps) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let found = RuleMatch {
                value,
                span: whole.range(),
            };

            match self.selection {
                Selection::FirstMatch => return Some(found),
                Selection::HighestValue => {
                    if best.as_ref().map_or(true, |b| found.value > b.value) {
                        best = Some(found);
                    }
                }
            }
        }

        best
    }
}

/// Run `rules` in priority order; the first rule that yields a value wins.
pub fn first_match<T: PartialOrd>(
    rules: &[Rule<T>],
    text: &str,
) -> Option<(&'static str, RuleMatch<T>)> {
    rules
        .iter()
        .find_map(|rule| rule.apply(text).map(|m| (rule.name, m)))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

fn lookup(table: &[(&str, u8)], word: &str) -> Option<u8> {
    table.iter().find(|(w, _)| *w == word).map(|(_, v)| *v)
}

fn alternation(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn word_list_pattern(words: &[&str]) -> Regex {
    compile(&format!(r"\b(?:{})\b", alternation(words)))
}

fn numeral(caps: &Captures<'_>) -> Option<u8> {
    caps.get(1)?.as_str().parse().ok()
}

fn age_digits(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

/// Severity rules, in priority order
pub static SEVERITY_RULES: LazyLock<Vec<Rule<u8>>> = LazyLock::new(|| {
    let words: Vec<&str> = NUMBER_WORDS.iter().map(|(w, _)| *w).collect();
    let keywords: Vec<&str> = SEVERITY_KEYWORDS.iter().map(|(w, _)| *w).collect();
    vec![
        Rule {
            name: "rating_out_of_ten",
            priority: 0,
            pattern: compile(r"\b(10|[1-9])\s*(?:/|out of)\s*10\b"),
            selection: Selection::FirstMatch,
            handler: numeral,
        },
        Rule {
            name: "numeral",
            priority: 1,
            pattern: compile(r"\b(10|[1-9])\b"),
            selection: Selection::FirstMatch,
            handler: numeral,
        },
        Rule {
            name: "number_word",
            priority: 2,
            pattern: compile(&format!(r"\b({})\b", alternation(&words))),
            selection: Selection::FirstMatch,
            handler: |caps| lookup(NUMBER_WORDS, caps.get(1)?.as_str()),
        },
        Rule {
            name: "keyword",
            priority: 3,
            pattern: compile(&format!(r"\b({})\b", alternation(&keywords))),
            selection: Selection::HighestValue,
            handler: |caps| lookup(SEVERITY_KEYWORDS, caps.get(1)?.as_str()),
        },
    ]
});

/// Duration rules, in priority order
pub static DURATION_RULES: LazyLock<Vec<Rule<String>>> = LazyLock::new(|| {
    vec![
        Rule {
            name: "quantity_unit",
            priority: 0,
            pattern: compile(r"\b(?:\d+|a|an|one|two|three)\s+(?:minute|hour|day|week|month|year)s?\b"),
            selection: Selection::FirstMatch,
            handler: |caps| Some(caps.get(0)?.as_str().to_string()),
        },
        Rule {
            name: "relative_phrase",
            priority: 1,
            pattern: compile(r"\b(?:since|for)\s+(?:yesterday|last night|this morning|a while)\b"),
            selection: Selection::FirstMatch,
            handler: |caps| Some(caps.get(0)?.as_str().to_string()),
        },
    ]
});

/// Age rules, in priority order
pub static AGE_RULES: LazyLock<Vec<Rule<u32>>> = LazyLock::new(|| {
    vec![
        Rule {
            name: "age_marker",
            priority: 0,
            // Group 1 catches "for 2 years" so it can be rejected as a duration
            pattern: compile(
                r"(?:\b(for|since|past|last|over)\s+)?\b(\d{1,3})\s*(?:(?:years?|yrs?)(\s*-?\s*old)?|yo|old)\b",
            ),
            selection: Selection::FirstMatch,
            handler: |caps| {
                let as_duration = caps.get(1).is_some() && caps.get(3).is_none();
                let marker_is_years = caps
                    .get(0)
                    .is_some_and(|m| m.as_str().contains("year") || m.as_str().contains("yr"));
                if as_duration && marker_is_years {
                    return None;
                }
                age_digits(caps, 2)
            },
        },
        Rule {
            name: "self_reference",
            priority: 1,
            // Group 2 catches a trailing unit or rating, which means the number is not an age
            pattern: compile(
                r"\b(?:i'm|i am|im|aged|age)\s+(\d{1,3})\b(\s*(?:/|out of|minutes?|mins?|hours?|hrs?|days?|weeks?|months?|years?))?",
            ),
            selection: Selection::FirstMatch,
            handler: |caps| {
                if caps.get(2).is_some() {
                    return None;
                }
                age_digits(caps, 1)
            },
        },
    ]
});

/// Symptom cleanup passes, applied in order
pub static SYMPTOM_STRIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        word_list_pattern(FILLER_PHRASES),
        word_list_pattern(CONNECTORS),
        word_list_pattern(DESCRIPTORS),
        compile(r"[.,!?;:]"),
    ]
});

pub static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));
