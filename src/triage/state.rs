//! Dialogue state and the per-session accumulator

use super::risk::{RiskAssessment, RiskLevel};
use crate::extract::{EntityCandidate, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Dialogue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriageState {
    #[default]
    Greeting,
    MainSymptom,
    AssociatedSymptoms,
    Details,
    Age,
    Complete,
}

impl TriageState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TriageState::Complete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriageState::Greeting => "GREETING",
            TriageState::MainSymptom => "MAIN_SYMPTOM",
            TriageState::AssociatedSymptoms => "ASSOCIATED_SYMPTOMS",
            TriageState::Details => "DETAILS",
            TriageState::Age => "AGE",
            TriageState::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for TriageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything learned during one session.
///
/// Fields are filled in and never cleared. `risk` and `rationale` are set
/// together, once, by [`SessionContext::finalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub main_symptom: Option<String>,
    pub associated_symptoms: Option<String>,
    pub severity: Option<Severity>,
    pub duration: Option<String>,
    pub age: Option<u32>,
    /// Unnegated red flags seen in any turn
    pub red_flags: BTreeSet<String>,
    pub risk: Option<RiskLevel>,
    pub rationale: Option<String>,
}

impl SessionContext {
    /// Take severity, duration and age from the candidate where still unknown
    pub fn merge_details(&mut self, candidate: &EntityCandidate) {
        if self.severity.is_none() {
            self.severity = candidate.severity;
        }
        if self.duration.is_none() {
            self.duration.clone_from(&candidate.duration);
        }
        if self.age.is_none() {
            self.age = candidate.age;
        }
    }

    pub fn add_red_flags(&mut self, flags: impl IntoIterator<Item = String>) {
        self.red_flags.extend(flags);
    }

    pub fn has_severity_and_duration(&self) -> bool {
        self.severity.is_some() && self.duration.is_some()
    }

    /// Severity, duration and age are all known
    pub fn has_all_details(&self) -> bool {
        self.has_severity_and_duration() && self.age.is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.risk.is_some()
    }

    /// Record the assessment. Returns false, leaving the context untouched,
    /// when a risk tier was already assigned.
    pub fn finalize(&mut self, assessment: RiskAssessment) -> bool {
        if self.risk.is_some() {
            return false;
        }
        self.risk = Some(assessment.level);
        self.rationale = Some(assessment.rationale);
        true
    }

    /// Main and associated symptom text, lowercased, for keyword checks
    pub fn combined_symptoms(&self) -> String {
        format!(
            "{} {}",
            self.main_symptom.as_deref().unwrap_or_default(),
            self.associated_symptoms.as_deref().unwrap_or_default()
        )
        .trim()
        .to_lowercase()
    }

    pub fn red_flag_list(&self) -> String {
        self.red_flags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
