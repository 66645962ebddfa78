//! Narrative SBAR handoff written by a language model
//!
//! Best-effort companion to [`crate::triage::generate_sbar`]: the whole
//! transcript goes to the model, and any failure leaves the caller with the
//! deterministic template.

use crate::llm::{LlmRequest, LlmService};
use crate::triage::{ChatMessage, ChatRole};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const HANDOFF_PROMPT: &str = r"Based on the following triage conversation, generate a structured SBAR summary for the doctor.

Format:
**S - Situation**: One line summary of patient and main complaint.
**B - Background**: Relevant history, age, gender.
**A - Assessment**: Key symptoms, severity, risk level (Red/Amber/Green).
**R - Recommendation**: Where they should go (ER/Clinic/Home) and urgency.

Conversation:";

const HANDOFF_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_TRANSCRIPT_CHARS: usize = 8000;

/// Ask the model for a narrative handoff.
///
/// Returns None on error, timeout or an empty answer; the caller should use
/// the template SBAR in that case.
pub async fn generate_narrative_sbar(
    transcript: &[ChatMessage],
    llm_service: Arc<dyn LlmService>,
) -> Option<String> {
    narrative_with_timeout(transcript, llm_service, HANDOFF_TIMEOUT).await
}

async fn narrative_with_timeout(
    transcript: &[ChatMessage],
    llm_service: Arc<dyn LlmService>,
    limit: Duration,
) -> Option<String> {
    let prompt = format!("{HANDOFF_PROMPT}\n{}", render_transcript(transcript));
    let request = LlmRequest::user_prompt(prompt).with_max_tokens(400);

    match timeout(limit, llm_service.complete(&request)).await {
        Ok(Ok(response)) => {
            let text = response.text.trim();
            if text.is_empty() {
                tracing::warn!("Narrative handoff was empty");
                None
            } else {
                Some(text.to_string())
            }
        }
        Ok(Err(e)) => {
            tracing::warn!("Narrative handoff LLM error: {}", e.message);
            None
        }
        Err(_) => {
            tracing::warn!("Narrative handoff timed out");
            None
        }
    }
}

/// One `role: text` line per message, keeping the most recent part when long
fn render_transcript(transcript: &[ChatMessage]) -> String {
    let rendered = transcript
        .iter()
        .map(|m| {
            let role = match m.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            format!("{role}: {}", m.text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let total = rendered.chars().count();
    if total > MAX_TRANSCRIPT_CHARS {
        rendered.chars().skip(total - MAX_TRANSCRIPT_CHARS).collect()
    } else {
        rendered
    }
}
