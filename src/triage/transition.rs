//! Pure per-turn transition function
//!
//! Given the current state, the accumulated context and an event, decide the
//! next state, the updated context, the reply text and the effects to run.
//! No I/O happens here; extraction has already been performed by the caller.

use super::report::{generate_report, COMPLETION_MARKER};
use super::risk::{finalize_risk, RiskAssessment, RiskLevel, DEFAULT_AGE};
use super::{Effect, Event, SessionContext, TriageState};
use crate::extract::{EntityCandidate, Severity};
use crate::red_flags::filter_negated;

/// Severity recorded when the DETAILS answer does not contain one
pub const DETAILS_DEFAULT_SEVERITY: u8 = 5;

const GREETING: &str =
    "Hi, I'm your health triage assistant. What symptoms are you experiencing today?";
const ASK_ASSOCIATED: &str =
    "Do you have any symptoms accompanying this? (e.g., fever, nausea, dizziness)";
const ASK_AGE: &str = "Okay. Finally, just to be safe, what is your **age**?";
const SESSION_ENDED: &str = "Session ended. Start a new session to restart.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TriageState,
    pub context: SessionContext,
    /// Reply for the patient; terminal replies end with the completion marker
    pub reply: String,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    fn new(state: TriageState, context: SessionContext, reply: impl Into<String>) -> Self {
        Self {
            new_state: state,
            context,
            reply: reply.into(),
            effects: vec![],
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.new_state.is_terminal()
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. The red-flag
/// override runs before any state-specific logic, followed by the
/// all-details shortcut.
pub fn transition(state: TriageState, ctx: &SessionContext, event: Event) -> TransitionResult {
    match (state, event) {
        (TriageState::Complete, _) => {
            TransitionResult::new(TriageState::Complete, ctx.clone(), SESSION_ENDED)
                .with_effect(Effect::IgnoredAfterCompletion)
        }

        (TriageState::Greeting, Event::Start) => {
            TransitionResult::new(TriageState::MainSymptom, ctx.clone(), GREETING)
        }

        // Start replayed mid-session: ask the pending question again
        (state, Event::Start) => {
            TransitionResult::new(state, ctx.clone(), prompt_for(state, ctx))
        }

        (state, Event::UserTurn { text, entities }) => handle_turn(state, ctx, &text, &entities),
    }
}

/// Question the patient is expected to answer in `state`
pub fn prompt_for(state: TriageState, ctx: &SessionContext) -> String {
    match state {
        TriageState::Greeting | TriageState::MainSymptom => GREETING.to_string(),
        TriageState::AssociatedSymptoms => ASK_ASSOCIATED.to_string(),
        TriageState::Details => ask_details(ctx),
        TriageState::Age => ASK_AGE.to_string(),
        TriageState::Complete => SESSION_ENDED.to_string(),
    }
}

fn handle_turn(
    state: TriageState,
    ctx: &SessionContext,
    text: &str,
    entities: &EntityCandidate,
) -> TransitionResult {
    let mut next = ctx.clone();
    next.merge_details(entities);

    // Symptoms from a GREETING turn are only kept if the turn completes
    let mut staged = next.clone();
    match state {
        TriageState::Greeting | TriageState::MainSymptom => {
            merge_main_symptom(&mut staged, text, entities);
        }
        TriageState::AssociatedSymptoms => merge_associated_symptoms(&mut staged, text, entities),
        TriageState::Details | TriageState::Age | TriageState::Complete => {}
    }
    if state != TriageState::Greeting {
        next = staged.clone();
    }

    let survivors = filter_negated(&entities.red_flags, text);
    staged.add_red_flags(survivors.iter().cloned());
    next.add_red_flags(survivors);

    if !staged.red_flags.is_empty() {
        return escalate(staged);
    }

    if staged.has_all_details() {
        return complete(staged);
    }

    match state {
        TriageState::Greeting => {
            TransitionResult::new(TriageState::MainSymptom, next, GREETING)
        }
        TriageState::MainSymptom => after_main_symptom(next),
        TriageState::AssociatedSymptoms => {
            if next.has_severity_and_duration() {
                let reply = format!(
                    "Got it.\n\nSince you already mentioned the details ({}), I just need your **Age** to finish.",
                    detail_summary(&next)
                );
                TransitionResult::new(TriageState::Age, next, reply)
            } else {
                let reply = ask_details(&next);
                TransitionResult::new(TriageState::Details, next, reply)
            }
        }
        TriageState::Details => fill_details(next, text),
        TriageState::Age => fill_age(next, text),
        TriageState::Complete => {
            TransitionResult::new(TriageState::Complete, next, SESSION_ENDED)
        }
    }
}

fn merge_main_symptom(ctx: &mut SessionContext, text: &str, entities: &EntityCandidate) {
    if ctx.main_symptom.is_none() {
        ctx.main_symptom = entities.symptom.clone().or_else(|| non_blank(text));
    }
    if ctx.associated_symptoms.is_none() {
        ctx.associated_symptoms.clone_from(&entities.associated_symptoms);
    }
}

fn merge_associated_symptoms(ctx: &mut SessionContext, text: &str, entities: &EntityCandidate) {
    if ctx.associated_symptoms.is_none() {
        ctx.associated_symptoms = entities.symptom.clone().or_else(|| non_blank(text));
    }
}

fn after_main_symptom(ctx: SessionContext) -> TransitionResult {
    let main = ctx.main_symptom.clone().unwrap_or_default();

    match ctx.associated_symptoms.clone() {
        Some(associated) if ctx.has_severity_and_duration() => {
            let reply = format!(
                "Got it. ({main} + {associated}).\n\nI just need your **Age** to finish."
            );
            TransitionResult::new(TriageState::Age, ctx, reply)
        }
        Some(_) => {
            let reply = ask_details(&ctx);
            TransitionResult::new(TriageState::Details, ctx, reply)
        }
        None => {
            let mut reply = format!("Noted (\"{main}\").");
            if ctx.severity.is_some() || ctx.duration.is_some() {
                reply.push_str(" I've noted the details.");
            }
            reply.push_str("\n\n");
            reply.push_str(ASK_ASSOCIATED);
            TransitionResult::new(TriageState::AssociatedSymptoms, ctx, reply)
        }
    }
}

fn fill_details(mut ctx: SessionContext, text: &str) -> TransitionResult {
    let mut effects = Vec::new();

    if ctx.severity.is_none() {
        ctx.severity = Severity::new(DETAILS_DEFAULT_SEVERITY);
        effects.push(Effect::default_applied("severity", DETAILS_DEFAULT_SEVERITY));
    }
    if ctx.duration.is_none() {
        ctx.duration = non_blank(text);
        if ctx.duration.is_some() {
            effects.push(Effect::default_applied("duration", text.trim()));
        }
    }

    if ctx.age.is_some() {
        return complete(ctx).with_effects(effects);
    }

    TransitionResult::new(TriageState::Age, ctx, ASK_AGE).with_effects(effects)
}

fn fill_age(mut ctx: SessionContext, text: &str) -> TransitionResult {
    let mut effects = Vec::new();

    if ctx.age.is_none() {
        match leading_number(text) {
            Some(age) => ctx.age = Some(age),
            None => {
                ctx.age = Some(DEFAULT_AGE);
                effects.push(Effect::default_applied("age", DEFAULT_AGE));
            }
        }
    }

    complete(ctx).with_effects(effects)
}

fn escalate(mut ctx: SessionContext) -> TransitionResult {
    let flags: Vec<String> = ctx.red_flags.iter().cloned().collect();
    let rationale = format!("Detected Critical Red Flags: {}", ctx.red_flag_list());
    ctx.finalize(RiskAssessment::new(RiskLevel::Emergency, rationale));

    let level = ctx.risk.unwrap_or(RiskLevel::Emergency);
    let reply = format!(
        "**{}**\n\nI have detected signs of a medical emergency (\"{}\").\n\n**Recommendation**: {}\n\n{}",
        level.label(),
        ctx.red_flag_list(),
        level.advice(),
        final_report(&ctx)
    );

    TransitionResult::new(TriageState::Complete, ctx, reply)
        .with_effect(Effect::EmergencyEscalated { red_flags: flags })
        .with_effect(Effect::Finalized { risk: level })
}

fn complete(mut ctx: SessionContext) -> TransitionResult {
    if !ctx.is_finalized() {
        let assessment = finalize_risk(&ctx);
        ctx.finalize(assessment);
    }
    let reply = final_report(&ctx);
    let mut result = TransitionResult::new(TriageState::Complete, ctx, reply);
    if let Some(risk) = result.context.risk {
        result = result.with_effect(Effect::Finalized { risk });
    }
    result
}

fn final_report(ctx: &SessionContext) -> String {
    generate_report(ctx)
        .unwrap_or_else(|_| format!("**Assessment Complete**\n\n{COMPLETION_MARKER}"))
}

fn ask_details(ctx: &SessionContext) -> String {
    let mut missing = Vec::new();
    if ctx.severity.is_none() {
        missing.push("Severity (1-10)");
    }
    if ctx.duration.is_none() {
        missing.push("Duration (how long?)");
    }

    let mut reply = String::from("Got it.\n\nPlease tell me:");
    for (i, item) in missing.iter().enumerate() {
        reply.push_str(&format!("\n{}. {item}", i + 1));
    }
    reply
}

fn detail_summary(ctx: &SessionContext) -> String {
    format!(
        "Severity {}, {}",
        ctx.severity.map(Severity::value).unwrap_or_default(),
        ctx.duration.as_deref().unwrap_or_default()
    )
}

/// First run of ASCII digits in the text, if it fits
fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
