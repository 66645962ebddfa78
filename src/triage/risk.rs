//! Risk classification
//!
//! A fixed, ordered rule list evaluated first-match-wins over the finalized
//! context. Pure: the same severity, age and symptom text always give the
//! same tier and rationale.

use super::state::SessionContext;
use crate::extract::Severity;
use serde::{Deserialize, Serialize};

/// Severity assumed when none was reported
pub const DEFAULT_SEVERITY: u8 = 1;
/// Age assumed when none was reported
pub const DEFAULT_AGE: u32 = 30;

/// Urgency tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Emergency,
    Urgent,
    Teleconsult,
    Routine,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Emergency => "CRITICAL ALERT",
            RiskLevel::Urgent => "URGENT CARE",
            RiskLevel::Teleconsult => "TELECONSULT",
            RiskLevel::Routine => "SELF CARE / ROUTINE",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            RiskLevel::Emergency => "Call Emergency Services (911) or go to ER immediately.",
            RiskLevel::Urgent => "Seek medical attention (Clinic/Urgent Care) within 24 hours.",
            RiskLevel::Teleconsult => "Schedule a video/audio consultation with a doctor.",
            RiskLevel::Routine => "Manage at home. Monitor symptoms.",
        }
    }

    /// Display color for presentation layers
    pub fn color(self) -> &'static str {
        match self {
            RiskLevel::Emergency => "red",
            RiskLevel::Urgent => "orange",
            RiskLevel::Teleconsult => "blue",
            RiskLevel::Routine => "green",
        }
    }
}

/// Tier plus the explanation shown to patient and clinician
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub rationale: String,
}

impl RiskAssessment {
    pub fn new(level: RiskLevel, rationale: impl Into<String>) -> Self {
        Self {
            level,
            rationale: rationale.into(),
        }
    }
}

/// Values the rules look at, with defaults substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskInputs {
    pub severity: u8,
    pub age: u32,
    /// Lowercased main + associated symptom text
    pub symptoms: String,
}

impl RiskInputs {
    pub fn from_context(ctx: &SessionContext) -> Self {
        Self {
            severity: ctx.severity.map_or(DEFAULT_SEVERITY, Severity::value),
            age: ctx.age.unwrap_or(DEFAULT_AGE),
            symptoms: ctx.combined_symptoms(),
        }
    }
}

struct RiskRule {
    name: &'static str,
    applies: fn(&RiskInputs) -> bool,
    level: RiskLevel,
    rationale: fn(&RiskInputs) -> String,
}

const SYSTEMIC_KEYWORDS: &[&str] = &["fever", "vomit"];

static RISK_RULES: &[RiskRule] = &[
    RiskRule {
        name: "extreme_severity",
        applies: |i| i.severity >= 9,
        level: RiskLevel::Emergency,
        rationale: |i| format!("Severity is extremely high ({}/10).", i.severity),
    },
    RiskRule {
        name: "high_severity",
        applies: |i| i.severity >= 7,
        level: RiskLevel::Urgent,
        rationale: |i| {
            format!(
                "High severity symptoms ({}/10) require physical assessment.",
                i.severity
            )
        },
    },
    RiskRule {
        name: "age_risk",
        applies: |i| i.age > 65 && i.severity >= 5,
        level: RiskLevel::Urgent,
        rationale: |i| {
            format!(
                "Moderate symptoms ({}/10) at age {} carry higher risk.",
                i.severity, i.age
            )
        },
    },
    RiskRule {
        name: "moderate_severity",
        applies: |i| i.severity >= 4,
        level: RiskLevel::Teleconsult,
        rationale: |i| {
            format!(
                "Moderate severity ({}/10) is suitable for remote assessment.",
                i.severity
            )
        },
    },
    RiskRule {
        name: "systemic_symptoms",
        applies: |i| SYSTEMIC_KEYWORDS.iter().any(|k| i.symptoms.contains(k)),
        level: RiskLevel::Teleconsult,
        rationale: |i| {
            format!(
                "Systemic symptoms detected (fever/vomiting) at severity {}/10.",
                i.severity
            )
        },
    },
];

/// Classify the context. Falls through to ROUTINE when no rule applies.
pub fn finalize_risk(ctx: &SessionContext) -> RiskAssessment {
    let inputs = RiskInputs::from_context(ctx);
    classify(&inputs)
}

pub fn classify(inputs: &RiskInputs) -> RiskAssessment {
    for rule in RISK_RULES {
        if (rule.applies)(inputs) {
            tracing::debug!(rule = rule.name, level = ?rule.level, "Risk rule matched");
            return RiskAssessment::new(rule.level, (rule.rationale)(inputs));
        }
    }

    RiskAssessment::new(
        RiskLevel::Routine,
        format!("Symptoms appear mild (Severity {}/10).", inputs.severity),
    )
}
