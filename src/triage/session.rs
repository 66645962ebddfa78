//! One patient's triage session

use super::report::strip_completion_marker;
use super::transition::{transition, TransitionResult};
use super::{Effect, Event, SessionContext, TriageState};
use crate::extract::{EntityCandidate, ExtractorChain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel turn text that opens a session without running extraction
pub const START_SESSION: &str = "START_SESSION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Reply to a single turn. Terminal replies still carry the completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnResponse {
    pub text: String,
    pub is_complete: bool,
    /// State after the turn
    pub state: TriageState,
}

/// Read-only view of a session for presentation layers
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub state: TriageState,
    pub is_complete: bool,
    pub messages: Vec<ChatMessage>,
    pub summary: SessionContext,
}

/// Dialogue state, accumulated context and transcript for one session
#[derive(Debug, Clone)]
pub struct TriageSession {
    id: String,
    state: TriageState,
    context: SessionContext,
    transcript: Vec<ChatMessage>,
    created_at: DateTime<Utc>,
}

impl TriageSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: TriageState::Greeting,
            context: SessionContext::default(),
            transcript: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn state(&self) -> TriageState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// Run one turn. Extraction is skipped for the start sentinel and once
    /// the session is complete; a completed session records nothing more,
    /// transcript included.
    pub async fn process_message(&mut self, text: &str, extractor: &ExtractorChain) -> TurnResponse {
        if self.is_complete() {
            let event = Event::user_turn(text, EntityCandidate::empty());
            let result = transition(self.state, &self.context, event);
            self.execute_effects(&result.effects);
            return TurnResponse {
                text: result.reply,
                is_complete: true,
                state: self.state,
            };
        }

        let event = if text == START_SESSION {
            Event::Start
        } else {
            self.transcript.push(ChatMessage::new(ChatRole::User, text));
            let entities = extractor.extract(text).await;
            tracing::debug!(
                session_id = %self.id,
                source = ?entities.source,
                severity = ?entities.severity,
                duration = ?entities.duration,
                age = ?entities.age,
                red_flags = ?entities.red_flags,
                "Turn entities"
            );
            Event::user_turn(text, entities)
        };

        let result = transition(self.state, &self.context, event);
        self.apply(result)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            created_at: self.created_at,
            state: self.state,
            is_complete: self.is_complete(),
            messages: self.transcript.clone(),
            summary: self.context.clone(),
        }
    }

    fn apply(&mut self, result: TransitionResult) -> TurnResponse {
        let is_complete = result.is_complete();

        if result.new_state != self.state {
            tracing::info!(
                session_id = %self.id,
                from = %self.state,
                to = %result.new_state,
                "State transition"
            );
        }

        self.state = result.new_state;
        self.context = result.context;
        self.execute_effects(&result.effects);

        self.transcript.push(ChatMessage::new(
            ChatRole::Assistant,
            strip_completion_marker(&result.reply),
        ));

        TurnResponse {
            text: result.reply,
            is_complete,
            state: self.state,
        }
    }

    fn execute_effects(&self, effects: &[Effect]) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&self, effect: &Effect) {
        match effect {
            Effect::EmergencyEscalated { red_flags } => {
                tracing::warn!(session_id = %self.id, ?red_flags, "Emergency escalation");
            }
            Effect::Finalized { risk } => {
                tracing::info!(
                    session_id = %self.id,
                    risk = ?risk,
                    rationale = self.context.rationale.as_deref().unwrap_or_default(),
                    "Triage complete"
                );
            }
            Effect::DefaultApplied { field, value } => {
                tracing::info!(session_id = %self.id, field, value = %value, "Filled missing field");
            }
            Effect::IgnoredAfterCompletion => {
                tracing::debug!(session_id = %self.id, "Turn after completion ignored");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::{FailingExtractor, StaticExtractor};
    use crate::triage::report::{generate_sbar, ReportError, COMPLETION_MARKER};
    use crate::triage::RiskLevel;
    use std::sync::Arc;

    async fn started() -> (TriageSession, ExtractorChain) {
        let chain = ExtractorChain::local_only();
        let mut session = TriageSession::new("test");
        let reply = session.process_message(START_SESSION, &chain).await;
        assert!(!reply.is_complete);
        (session, chain)
    }

    #[tokio::test]
    async fn test_start_session() {
        let (session, _) = started().await;
        assert_eq!(session.state(), TriageState::MainSymptom);
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_full_dialogue() {
        let (mut session, chain) = started().await;

        let reply = session.process_message("I have a cough", &chain).await;
        assert!(!reply.is_complete);
        assert_eq!(session.state(), TriageState::AssociatedSymptoms);

        session.process_message("a runny nose", &chain).await;
        assert_eq!(session.state(), TriageState::Details);

        session.process_message("mild, for 3 days", &chain).await;
        assert_eq!(session.state(), TriageState::Age);

        let reply = session.process_message("I'm 25", &chain).await;
        assert!(reply.is_complete);
        assert!(reply.text.ends_with(COMPLETION_MARKER));
        assert_eq!(session.context().risk, Some(RiskLevel::Routine));

        let last = session.transcript().last().unwrap();
        assert!(!last.text.contains(COMPLETION_MARKER));
        assert!(generate_sbar(session.context()).is_ok());
    }

    #[tokio::test]
    async fn test_complete_session_skips_extraction() {
        let stage = Arc::new(FailingExtractor::new());
        let chain = ExtractorChain::local_only().with_stage(stage.clone());
        let mut session = TriageSession::new("test");
        session.process_message(START_SESSION, &chain).await;

        let reply = session.process_message("chest pain", &chain).await;
        assert!(reply.is_complete);
        assert_eq!(stage.calls(), 1);

        let risk = session.context().clone();
        let transcript_len = session.transcript().len();
        let reply = session.process_message("actually I'm fine", &chain).await;
        assert!(reply.is_complete);
        assert_eq!(reply.state, TriageState::Complete);
        assert!(reply.text.starts_with("Session ended"));
        assert_eq!(stage.calls(), 1);
        assert_eq!(session.context(), &risk);
        assert_eq!(session.transcript().len(), transcript_len);

        session.process_message(START_SESSION, &chain).await;
        assert_eq!(session.transcript().len(), transcript_len);
    }

    #[tokio::test]
    async fn test_remote_entities_used() {
        let candidate = EntityCandidate {
            symptom: Some("migraine".to_string()),
            severity: crate::extract::Severity::new(9),
            duration: Some("1 day".to_string()),
            age: Some(33),
            ..EntityCandidate::default()
        };
        let chain =
            ExtractorChain::local_only().with_stage(Arc::new(StaticExtractor::new(candidate)));
        let mut session = TriageSession::new("test");
        session.process_message(START_SESSION, &chain).await;

        let reply = session.process_message("whatever", &chain).await;
        assert!(reply.is_complete);
        assert_eq!(session.context().main_symptom.as_deref(), Some("migraine"));
        assert_eq!(session.context().risk, Some(RiskLevel::Emergency));
    }

    #[tokio::test]
    async fn test_sbar_before_completion() {
        let (session, _) = started().await;
        assert_eq!(
            generate_sbar(session.context()),
            Err(ReportError::NotFinalized)
        );
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (mut session, chain) = started().await;
        session.process_message("mild headache", &chain).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.session_id, "test");
        assert_eq!(snapshot.state, TriageState::AssociatedSymptoms);
        assert!(!snapshot.is_complete);
        assert_eq!(snapshot.messages.len(), 3);
        assert_eq!(snapshot.summary.main_symptom.as_deref(), Some("headache"));
    }

    #[tokio::test]
    async fn test_single_turn_urgent() {
        let (mut session, chain) = started().await;
        let reply = session
            .process_message("I have a headache, severity 8, for 2 days, I'm 40", &chain)
            .await;
        assert!(reply.is_complete);
        assert_eq!(session.context().risk, Some(RiskLevel::Urgent));
        assert!(reply.text.contains("URGENT CARE"));
    }

    #[tokio::test]
    async fn test_first_turn_emergency() {
        let (mut session, chain) = started().await;
        let reply = session.process_message("chest pain", &chain).await;
        assert!(reply.is_complete);
        assert_eq!(session.context().risk, Some(RiskLevel::Emergency));
        assert!(reply.text.contains("CRITICAL ALERT"));
    }

    #[tokio::test]
    async fn test_mild_symptom_asks_for_more() {
        let (mut session, chain) = started().await;
        let reply = session.process_message("mild headache", &chain).await;
        assert!(!reply.is_complete);
        assert_eq!(session.state(), TriageState::AssociatedSymptoms);
        assert_eq!(
            session.context().severity.map(crate::extract::Severity::value),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_negated_chest_pain_not_emergency() {
        let (mut session, chain) = started().await;
        session
            .process_message("no chest pain but I have a mild cough for 3 days, I'm 25", &chain)
            .await;
        while !session.is_complete() {
            session.process_message("25", &chain).await;
        }
        assert!(session.context().red_flags.is_empty());
        assert!(matches!(
            session.context().risk,
            Some(RiskLevel::Routine | RiskLevel::Teleconsult)
        ));
    }

    #[tokio::test]
    async fn test_typographic_apostrophe_emergency() {
        let (mut session, chain) = started().await;
        let reply = session.process_message("I can\u{2019}t breathe", &chain).await;
        assert!(reply.is_complete);
        assert_eq!(session.context().risk, Some(RiskLevel::Emergency));
    }
}
