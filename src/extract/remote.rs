//! Remote entity extraction through a language model
//!
//! Asks the model for a strict JSON object with the same fields as
//! [`EntityCandidate`]. Anything other than a decodable object is an error,
//! which the extractor chain turns into a local fallback.

use super::{EntityCandidate, EntityExtractor, ExtractError, ExtractionSource, Severity};
use crate::llm::{LlmRequest, LlmService, SystemContent};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const EXTRACTION_PROMPT: &str = r#"Analyze the following text and extract clinical entities into a strict JSON format.

Output Schema:
{
    "symptom": "string (main symptom only, e.g. headache)",
    "associated_symptoms": "string or null (any other symptoms or radiation, e.g. nausea, radiating to left)",
    "severity": "number or null (1-10)",
    "duration": "string or null (e.g. 2 days)",
    "age": "number or null",
    "redFlags": ["string"] (list of critical keywords found. Correct typos like 'cbest' -> 'chest')
}

Reply with the JSON object only."#;

const MAX_EXTRACTION_TOKENS: u32 = 300;

/// Extractor backed by an [`LlmService`]
pub struct LlmExtractor {
    llm: Arc<dyn LlmService>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }

    fn build_request(text: &str) -> LlmRequest {
        let mut request = LlmRequest::user_prompt(format!("Text: \"{text}\""));
        request.system = vec![SystemContent::new(EXTRACTION_PROMPT)];
        request
            .with_json_output()
            .with_max_tokens(MAX_EXTRACTION_TOKENS)
    }
}

#[async_trait]
impl EntityExtractor for LlmExtractor {
    async fn extract(&self, text: &str) -> Result<EntityCandidate, ExtractError> {
        let response = self.llm.complete(&Self::build_request(text)).await?;
        parse_response(&response.text)
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Remote
    }
}

/// Wire shape of the model's answer. Numbers sometimes arrive as strings.
#[derive(Debug, Deserialize)]
struct RemoteEntities {
    #[serde(default)]
    symptom: Option<String>,
    #[serde(default, alias = "associatedSymptoms")]
    associated_symptoms: Option<String>,
    #[serde(default)]
    severity: Option<Value>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    age: Option<Value>,
    #[serde(default, rename = "redFlags", alias = "red_flags")]
    red_flags: Option<Vec<String>>,
}

fn parse_response(raw: &str) -> Result<EntityCandidate, ExtractError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(ExtractError::Empty);
    }

    let entities: Option<RemoteEntities> =
        serde_json::from_str(body).map_err(|e| ExtractError::Decode(e.to_string()))?;
    let entities = entities.ok_or(ExtractError::Empty)?;

    Ok(EntityCandidate {
        symptom: non_blank(entities.symptom),
        associated_symptoms: non_blank(entities.associated_symptoms),
        severity: entities
            .severity
            .as_ref()
            .and_then(as_integer)
            .and_then(|v| u8::try_from(v).ok())
            .and_then(Severity::new),
        duration: non_blank(entities.duration),
        age: entities
            .age
            .as_ref()
            .and_then(as_integer)
            .and_then(|v| u32::try_from(v).ok()),
        red_flags: entities
            .red_flags
            .unwrap_or_default()
            .into_iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect(),
        source: ExtractionSource::Remote,
    })
}

/// Models occasionally wrap JSON in a markdown fence despite the mime type
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

#[allow(clippy::cast_possible_truncation)] // fractional ratings round toward zero
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}
