//! HTTP request handlers

use super::types::{
    ErrorResponse, MessageRequest, MessageResponse, ModelInfo, ModelsResponse,
    SbarResponse, SessionCreatedResponse, SessionResponse, SuccessResponse,
};
use super::AppState;
use crate::llm::all_models;
use crate::runtime::{NarrativeHandoff, SessionError};
use crate::triage::{strip_completion_marker, RiskLevel};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

const TURN_FAILED: &str = "Sorry, I encountered an error. Please try again.";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/reset", post(reset_session))
        // Dialogue
        .route("/api/sessions/:id/messages", post(send_message))
        // Handoff
        .route("/api/sessions/:id/sbar", get(get_sbar))
        .route("/api/sessions/:id/sbar/narrative", get(get_narrative_sbar))
        // Model info
        .route("/api/models", get(list_models))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<SessionCreatedResponse> {
    let (session_id, greeting) = state.sessions.create_session().await;
    Json(SessionCreatedResponse {
        session_id,
        reply: strip_completion_marker(&greeting.text),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let snapshot = state.sessions.snapshot(&id).await?;
    Ok(Json(SessionResponse {
        session_id: snapshot.session_id,
        created_at: snapshot.created_at,
        state: snapshot.state,
        is_complete: snapshot.is_complete,
        risk_color: snapshot.summary.risk.map(RiskLevel::color),
        messages: snapshot.messages,
        summary: snapshot.summary,
    }))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionCreatedResponse>, AppError> {
    let greeting = state.sessions.reset_session(&id).await?;
    Ok(Json(SessionCreatedResponse {
        session_id: id,
        reply: strip_completion_marker(&greeting.text),
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.sessions.destroy_session(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(SessionError::NotFound(id).into())
    }
}

// ============================================================
// Dialogue
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest("Message text is required".to_string()));
    }

    // Run the turn on its own task so a panic inside it becomes a 500
    let sessions = state.sessions.clone();
    let turn_id = id.clone();
    let reply = tokio::spawn(async move { sessions.process_message(&turn_id, &text).await })
        .await
        .map_err(|e| {
            tracing::error!(session_id = %id, error = %e, "Turn failed");
            AppError::Internal(TURN_FAILED.to_string())
        })??;

    Ok(Json(MessageResponse {
        reply: strip_completion_marker(&reply.text),
        is_complete: reply.is_complete,
        state: reply.state,
    }))
}

// ============================================================
// Handoff
// ============================================================

async fn get_sbar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SbarResponse>, AppError> {
    let sbar = state.sessions.sbar(&id).await?;
    Ok(Json(SbarResponse {
        sbar: sbar.to_string(),
        situation: sbar.situation,
        background: sbar.background,
        assessment: sbar.assessment,
        recommendation: sbar.recommendation,
    }))
}

async fn get_narrative_sbar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NarrativeHandoff>, AppError> {
    Ok(Json(state.sessions.narrative_sbar(&id).await?))
}

// ============================================================
// Model Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let available = state.llm_registry.available_models();
    let models = all_models()
        .iter()
        .filter(|m| available.iter().any(|id| id == m.id))
        .map(|m| ModelInfo {
            id: m.id.to_string(),
            description: m.description.to_string(),
        })
        .collect();

    Json(ModelsResponse {
        models,
        default: state.llm_registry.default_model_id().to_string(),
    })
}

async fn get_version() -> &'static str {
    concat!("careflow ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => AppError::NotFound(e.to_string()),
            SessionError::NotComplete(_) => AppError::Conflict(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractorChain;
    use crate::llm::ModelRegistry;
    use crate::runtime::{HandoffSource, SessionManager};
    use crate::triage::TriageState;
    use std::sync::Arc;

    fn test_state() -> AppState {
        AppState::new(
            SessionManager::new(ExtractorChain::local_only(), None),
            Arc::new(ModelRegistry::new_empty()),
        )
    }

    async fn new_session(state: &AppState) -> String {
        let Json(created) = create_session(State(state.clone())).await;
        assert!(created.reply.contains("What symptoms"));
        created.session_id
    }

    async fn send(state: &AppState, id: &str, text: &str) -> Result<MessageResponse, AppError> {
        send_message(
            State(state.clone()),
            Path(id.to_string()),
            Json(MessageRequest {
                text: text.to_string(),
            }),
        )
        .await
        .map(|Json(r)| r)
    }

    #[tokio::test]
    async fn test_message_flow() {
        let state = test_state();
        let id = new_session(&state).await;

        let reply = send(&state, &id, "mild headache").await.unwrap();
        assert!(!reply.is_complete);
        assert_eq!(reply.state, TriageState::AssociatedSymptoms);

        let reply = send(&state, &id, "chest pain").await.unwrap();
        assert!(reply.is_complete);
        assert_eq!(reply.state, TriageState::Complete);
        assert!(!reply.reply.contains("[TRIAGE_COMPLETE]"));

        let Json(sbar) = get_sbar(State(state.clone()), Path(id.clone())).await.unwrap();
        assert!(sbar.sbar.starts_with("Situation: headache"));
        assert!(sbar.assessment.starts_with("CRITICAL ALERT"));

        let Json(view) = get_session(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(view.risk_color, Some("red"));
        assert_eq!(view.messages.len(), 5);

        let Json(handoff) = get_narrative_sbar(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(handoff.source, HandoffSource::Template);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let state = test_state();
        let id = new_session(&state).await;
        let err = send(&state, &id, "   ").await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let state = test_state();
        let err = send(&state, "nope", "hello").await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = delete_session(State(state.clone()), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sbar_before_completion_conflicts() {
        let state = test_state();
        let id = new_session(&state).await;
        let err = get_sbar(State(state.clone()), Path(id)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_reset_and_delete() {
        let state = test_state();
        let id = new_session(&state).await;
        send(&state, &id, "stroke").await.unwrap();

        let Json(reset) = reset_session(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(reset.session_id, id);

        let Json(view) = get_session(State(state.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(view.state, TriageState::MainSymptom);
        assert!(!view.is_complete);
        assert!(view.risk_color.is_none());

        let Json(deleted) = delete_session(State(state.clone()), Path(id)).await.unwrap();
        assert!(deleted.success);
        assert_eq!(state.sessions.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_models_empty_registry() {
        let Json(models) = list_models(State(test_state())).await;
        assert!(models.models.is_empty());
        assert_eq!(models.default, "gemini-1.5-flash");
    }
}
