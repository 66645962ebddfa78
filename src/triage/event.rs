//! Events that drive the triage dialogue

use crate::extract::EntityCandidate;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Session start sentinel; no extraction is performed
    Start,
    /// A user turn with the entities extracted from it
    UserTurn {
        text: String,
        entities: EntityCandidate,
    },
}

impl Event {
    pub fn user_turn(text: impl Into<String>, entities: EntityCandidate) -> Self {
        Event::UserTurn {
            text: text.into(),
            entities,
        }
    }
}
