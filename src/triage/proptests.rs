//! Property-based tests for the triage dialogue
//!
//! These tests verify key invariants hold across all possible inputs.

use super::report::generate_sbar;
use super::risk::{finalize_risk, RiskLevel};
use super::transition::transition;
use super::{Event, SessionContext, TriageState};
use crate::extract::rules::CRITICAL_KEYWORDS;
use crate::extract::{EntityCandidate, RuleBasedExtractor, Severity};
use crate::red_flags::filter_negated;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_open_state() -> impl Strategy<Value = TriageState> {
    prop_oneof![
        Just(TriageState::Greeting),
        Just(TriageState::MainSymptom),
        Just(TriageState::AssociatedSymptoms),
        Just(TriageState::Details),
        Just(TriageState::Age),
    ]
}

fn arb_red_flag() -> impl Strategy<Value = &'static str> {
    prop::sample::select(CRITICAL_KEYWORDS.to_vec())
}

fn arb_severity() -> impl Strategy<Value = Severity> {
    (1u8..=10).prop_filter_map("in range", Severity::new)
}

fn arb_symptoms() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::sample::select(vec![
        "headache", "fever", "vomiting", "cough", "rash", "back ache",
    ]))
    .prop_map(|s| s.map(str::to_string))
}

fn arb_finalized_context() -> impl Strategy<Value = SessionContext> {
    (
        arb_symptoms(),
        arb_symptoms(),
        prop::option::of(arb_severity()),
        prop::option::of("[0-9] (days|hours)"),
        prop::option::of(1u32..100),
    )
        .prop_map(|(main, associated, severity, duration, age)| {
            let mut ctx = SessionContext {
                main_symptom: main,
                associated_symptoms: associated,
                severity,
                duration,
                age,
                ..SessionContext::default()
            };
            let assessment = finalize_risk(&ctx);
            ctx.finalize(assessment);
            ctx
        })
}

/// Which side of the merge supplies a detail
#[derive(Debug, Clone, Copy)]
enum Supplier {
    Context,
    Turn,
    Both,
}

fn arb_supplier() -> impl Strategy<Value = Supplier> {
    prop_oneof![
        Just(Supplier::Context),
        Just(Supplier::Turn),
        Just(Supplier::Both),
    ]
}

fn split<T: Clone>(value: T, supplier: Supplier) -> (Option<T>, Option<T>) {
    match supplier {
        Supplier::Context => (Some(value), None),
        Supplier::Turn => (None, Some(value)),
        Supplier::Both => (Some(value.clone()), Some(value)),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn unnegated_red_flag_completes_as_emergency(
        state in arb_open_state(),
        flag in arb_red_flag(),
        prefix in prop::sample::select(vec!["", "i have", "suddenly", "help,", "there is"]),
    ) {
        let text = format!("{prefix} {flag}");
        let entities = RuleBasedExtractor::new().parse(&text);
        let result = transition(state, &SessionContext::default(), Event::user_turn(text, entities));

        prop_assert!(result.is_complete());
        prop_assert_eq!(result.context.risk, Some(RiskLevel::Emergency));
        prop_assert!(result.context.red_flags.contains(flag));
    }

    #[test]
    fn negated_red_flag_excluded(
        flag in arb_red_flag(),
        cue in prop::sample::select(vec!["no", "not", "No", "NOT"]),
    ) {
        let text = format!("{cue} {flag}");
        let detected = RuleBasedExtractor::new().parse(&text).red_flags;
        let kept = filter_negated(&detected, &text);
        prop_assert!(!kept.iter().any(|f| f == flag));
    }

    #[test]
    fn all_details_complete_same_turn(
        state in arb_open_state(),
        severity in arb_severity(),
        age in 1u32..110,
        severity_from in arb_supplier(),
        duration_from in arb_supplier(),
        age_from in arb_supplier(),
    ) {
        let (ctx_severity, turn_severity) = split(severity, severity_from);
        let (ctx_duration, turn_duration) = split("2 days".to_string(), duration_from);
        let (ctx_age, turn_age) = split(age, age_from);

        let ctx = SessionContext {
            main_symptom: Some("rash".to_string()),
            severity: ctx_severity,
            duration: ctx_duration,
            age: ctx_age,
            ..SessionContext::default()
        };
        let entities = EntityCandidate {
            severity: turn_severity,
            duration: turn_duration,
            age: turn_age,
            ..EntityCandidate::default()
        };

        let result = transition(state, &ctx, Event::user_turn("ok", entities));
        prop_assert!(result.is_complete());
        prop_assert!(result.context.risk.is_some());
    }

    #[test]
    fn finalize_risk_is_pure(ctx in arb_finalized_context()) {
        let first = finalize_risk(&ctx);
        let second = finalize_risk(&ctx.clone());
        prop_assert_eq!(&first, &second);

        let severity = ctx.severity.map_or(1, Severity::value);
        let expected = format!("{severity}/10");
        prop_assert!(first.rationale.contains(&expected));
    }

    #[test]
    fn sbar_is_deterministic(ctx in arb_finalized_context()) {
        let first = generate_sbar(&ctx).map(|s| s.to_string());
        let second = generate_sbar(&ctx.clone()).map(|s| s.to_string());
        prop_assert!(first.is_ok());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn risk_never_overwritten(ctx in arb_finalized_context(), text in "[a-z ]{0,30}") {
        let entities = RuleBasedExtractor::new().parse(&text);
        let result = transition(TriageState::Complete, &ctx, Event::user_turn(text, entities));
        prop_assert_eq!(result.context, ctx);
    }
}
