//! API request and response types

use crate::triage::{ChatMessage, SessionContext, TriageState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to send a patient turn
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Response for session creation and reset
#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: String,
    pub reply: String,
}

/// Response with the full session view
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub state: TriageState,
    pub is_complete: bool,
    /// Display color of the assigned tier, once finalized
    pub risk_color: Option<&'static str>,
    pub messages: Vec<ChatMessage>,
    pub summary: SessionContext,
}

/// Response for a processed turn
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Reply text with the completion marker removed
    pub reply: String,
    pub is_complete: bool,
    pub state: TriageState,
}

/// Template SBAR handoff
#[derive(Debug, Serialize)]
pub struct SbarResponse {
    pub sbar: String,
    pub situation: String,
    pub background: String,
    pub assessment: String,
    pub recommendation: String,
}

/// Response for a delete
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Model info for the models list
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub description: String,
}

/// Response for the models list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
