//! Final report and SBAR handoff rendering

use super::state::SessionContext;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Appended to every terminal reply; presentation layers strip it
pub const COMPLETION_MARKER: &str = "[TRIAGE_COMPLETE]";

const NOT_REPORTED: &str = "Not reported";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("risk has not been assigned yet")]
    NotFinalized,
}

/// Patient-facing summary of a finalized context, ending in [`COMPLETION_MARKER`]
pub fn generate_report(ctx: &SessionContext) -> Result<String, ReportError> {
    let risk = ctx.risk.ok_or(ReportError::NotFinalized)?;

    Ok(format!(
        "**Assessment Complete**\n\n\
         **Main Symptom:** {main}\n\
         **Associated:** {associated}\n\
         **Severity:** {severity}\n\
         **Age:** {age}\n\n\
         **Result:** {label}\n\
         **Analysis:** {rationale}\n\
         **Advice:** {advice}\n\n\
         {COMPLETION_MARKER}",
        main = ctx.main_symptom.as_deref().unwrap_or(NOT_REPORTED),
        associated = ctx.associated_symptoms.as_deref().unwrap_or("None"),
        severity = ctx
            .severity
            .map_or_else(|| NOT_REPORTED.to_string(), |s| format!("{s}/10")),
        age = ctx
            .age
            .map_or_else(|| NOT_REPORTED.to_string(), |a| a.to_string()),
        label = risk.label(),
        rationale = ctx.rationale.as_deref().unwrap_or_default(),
        advice = risk.advice(),
    ))
}

/// Remove the completion marker for display
pub fn strip_completion_marker(text: &str) -> String {
    text.replace(COMPLETION_MARKER, "").trim().to_string()
}

/// Situation-Background-Assessment-Recommendation handoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sbar {
    pub situation: String,
    pub background: String,
    pub assessment: String,
    pub recommendation: String,
}

impl fmt::Display for Sbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Situation: {}\nBackground: {}\nAssessment: {}\nRecommendation: {}",
            self.situation, self.background, self.assessment, self.recommendation
        )
    }
}

/// Build the clinician handoff from a finalized context
pub fn generate_sbar(ctx: &SessionContext) -> Result<Sbar, ReportError> {
    let risk = ctx.risk.ok_or(ReportError::NotFinalized)?;

    let mut situation = ctx
        .main_symptom
        .clone()
        .unwrap_or_else(|| NOT_REPORTED.to_string());
    if let Some(associated) = &ctx.associated_symptoms {
        situation.push_str(&format!(" with {associated}"));
    }
    match ctx.severity {
        Some(s) => situation.push_str(&format!(" (Sev {s}/10)")),
        None => situation.push_str(" (Sev not rated)"),
    }
    situation.push('.');

    let background = format!(
        "Age {}, Duration {}.",
        ctx.age
            .map_or_else(|| "unknown".to_string(), |a| a.to_string()),
        ctx.duration.as_deref().unwrap_or("unknown"),
    );

    let mut assessment = format!(
        "{} - {}",
        risk.label(),
        ctx.rationale.as_deref().unwrap_or_default()
    );
    if !ctx.red_flags.is_empty() {
        assessment.push_str(&format!(" Red flags: {}.", ctx.red_flag_list()));
    }

    Ok(Sbar {
        situation,
        background,
        assessment,
        recommendation: risk.advice().to_string(),
    })
}
