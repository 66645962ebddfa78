//! Session registry
//!
//! Sessions are keyed by a caller-visible id. Each session sits behind its
//! own async mutex so turns on one session run one at a time while different
//! sessions proceed independently.

use crate::extract::ExtractorChain;
use crate::handoff::generate_narrative_sbar;
use crate::llm::LlmService;
use crate::triage::{
    generate_sbar, ReportError, Sbar, SessionSnapshot, TriageSession, TurnResponse, START_SESSION,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session {0} has not completed triage yet")]
    NotComplete(String),
}

/// Where a handoff text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandoffSource {
    Llm,
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativeHandoff {
    pub sbar: String,
    pub source: HandoffSource,
}

/// Manager for all triage sessions
pub struct SessionManager {
    extractor: ExtractorChain,
    narrator: Option<Arc<dyn LlmService>>,
    sessions: RwLock<HashMap<String, Arc<Mutex<TriageSession>>>>,
}

impl SessionManager {
    pub fn new(extractor: ExtractorChain, narrator: Option<Arc<dyn LlmService>>) -> Self {
        Self {
            extractor,
            narrator,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session and play the greeting turn
    pub async fn create_session(&self) -> (String, TurnResponse) {
        let id = uuid::Uuid::new_v4().to_string();
        let mut session = TriageSession::new(&id);
        let greeting = session.process_message(START_SESSION, &self.extractor).await;

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        tracing::info!(session_id = %id, "Session created");

        (id, greeting)
    }

    pub async fn process_message(&self, id: &str, text: &str) -> Result<TurnResponse, SessionError> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;
        let reply = session.process_message(text, &self.extractor).await;
        tracing::debug!(
            session_id = %id,
            state = %session.state(),
            is_complete = reply.is_complete,
            "Turn processed"
        );
        Ok(reply)
    }

    pub async fn snapshot(&self, id: &str) -> Result<SessionSnapshot, SessionError> {
        let handle = self.get(id).await?;
        let session = handle.lock().await;
        Ok(session.snapshot())
    }

    /// Template SBAR for a completed session
    pub async fn sbar(&self, id: &str) -> Result<Sbar, SessionError> {
        let handle = self.get(id).await?;
        let session = handle.lock().await;
        generate_sbar(session.context()).map_err(|e| match e {
            ReportError::NotFinalized => SessionError::NotComplete(id.to_string()),
        })
    }

    /// Narrative SBAR from the language model, falling back to the template
    pub async fn narrative_sbar(&self, id: &str) -> Result<NarrativeHandoff, SessionError> {
        let template = self.sbar(id).await?;

        let Some(narrator) = self.narrator.clone() else {
            return Ok(NarrativeHandoff {
                sbar: template.to_string(),
                source: HandoffSource::Template,
            });
        };

        // Copy the transcript so the session lock is not held across the call
        let transcript = {
            let handle = self.get(id).await?;
            let session = handle.lock().await;
            session.transcript().to_vec()
        };

        match generate_narrative_sbar(&transcript, narrator).await {
            Some(sbar) => Ok(NarrativeHandoff {
                sbar,
                source: HandoffSource::Llm,
            }),
            None => Ok(NarrativeHandoff {
                sbar: template.to_string(),
                source: HandoffSource::Template,
            }),
        }
    }

    /// Replace the session with a fresh one under the same id
    pub async fn reset_session(&self, id: &str) -> Result<TurnResponse, SessionError> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;

        let mut fresh = TriageSession::new(id);
        let greeting = fresh.process_message(START_SESSION, &self.extractor).await;
        *session = fresh;
        tracing::info!(session_id = %id, "Session reset");

        Ok(greeting)
    }

    /// Returns false when no such session existed
    pub async fn destroy_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session destroyed");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn get(&self, id: &str) -> Result<Arc<Mutex<TriageSession>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }
}
