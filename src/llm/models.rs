//! Model definitions for the extraction and handoff providers

use super::gemini::{GeminiModel, GeminiService};
use super::LlmService;
use std::sync::Arc;
use std::time::Duration;

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gemini-1.5-flash")
    pub id: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>, Duration) -> Result<Arc<dyn LlmService>, String>,
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-1.5-flash",
            description: "Fast structured extraction (default)",
            factory: |key, gateway, timeout| {
                gemini_factory(key, gateway, timeout, GeminiModel::Gemini15Flash)
            },
        },
        ModelDef {
            id: "gemini-2.0-flash",
            description: "Newer conversational model",
            factory: |key, gateway, timeout| {
                gemini_factory(key, gateway, timeout, GeminiModel::Gemini20Flash)
            },
        },
    ]
}

fn gemini_factory(
    api_key: &str,
    gateway: Option<&str>,
    timeout: Duration,
    model: GeminiModel,
) -> Result<Arc<dyn LlmService>, String> {
    GeminiService::new(api_key.to_string(), model, gateway, timeout)
        .map(|service| Arc::new(service) as Arc<dyn LlmService>)
        .map_err(|e| e.message)
}
