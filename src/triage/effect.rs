//! Effects produced by state transitions

use super::risk::RiskLevel;

/// Side effects the session runs after applying a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Unnegated red flags forced an emergency completion
    EmergencyEscalated { red_flags: Vec<String> },

    /// Risk tier assigned and the session completed
    Finalized { risk: RiskLevel },

    /// A field was filled with a placeholder instead of patient input
    DefaultApplied { field: &'static str, value: String },

    /// A turn arrived after completion and was ignored
    IgnoredAfterCompletion,
}

impl Effect {
    pub fn default_applied(field: &'static str, value: impl ToString) -> Self {
        Effect::DefaultApplied {
            field,
            value: value.to_string(),
        }
    }
}
