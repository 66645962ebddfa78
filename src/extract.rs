//! Entity extraction
//!
//! Turns one free-text turn into an [`EntityCandidate`]. Two capability
//! implementations sit behind [`EntityExtractor`]: the remote language-model
//! parser and the rule-based parser. [`ExtractorChain`] tries them in order
//! and always ends at the rule-based one, so extraction never fails.

mod local;
#[cfg(test)]
mod proptests;
mod remote;
pub mod rules;
#[cfg(test)]
pub mod testing;

pub use local::RuleBasedExtractor;
pub use remote::LlmExtractor;

use crate::llm::{LlmConfig, LlmError, ModelRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Pain/discomfort rating on the 1-10 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Returns `None` outside 1..=10
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("severity {value} outside 1-10"))
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which extractor produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Remote,
    Local,
    /// No extractor ran (session start sentinel)
    #[default]
    None,
}

/// Entities found in a single turn. Produced fresh per turn and consumed by
/// the merge step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub symptom: Option<String>,
    pub associated_symptoms: Option<String>,
    pub severity: Option<Severity>,
    pub duration: Option<String>,
    pub age: Option<u32>,
    /// Critical phrases as matched, before negation filtering
    pub red_flags: Vec<String>,
    #[serde(skip)]
    pub source: ExtractionSource,
}

impl EntityCandidate {
    /// Candidate for a turn where no extractor runs
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Extraction failure. Only remote extraction can fail; the chain recovers
/// from every variant.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("remote extractor request failed: {0}")]
    Remote(#[from] LlmError),
    #[error("remote extractor returned undecodable output: {0}")]
    Decode(String),
    #[error("remote extractor returned no result")]
    Empty,
}

/// Capability interface for turning turn text into entities
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<EntityCandidate, ExtractError>;

    /// Label recorded on candidates this extractor produces
    fn source(&self) -> ExtractionSource;
}

/// Ordered fallback policy: each stage is tried in turn, the first success
/// wins, and the rule-based extractor is the total last resort.
pub struct ExtractorChain {
    stages: Vec<Arc<dyn EntityExtractor>>,
    terminal: RuleBasedExtractor,
}

impl ExtractorChain {
    /// Chain with only the rule-based extractor
    pub fn local_only() -> Self {
        Self {
            stages: Vec::new(),
            terminal: RuleBasedExtractor::new(),
        }
    }

    /// Remote extraction first when it is enabled and the model is configured
    pub fn from_registry(config: &LlmConfig, registry: &ModelRegistry) -> Self {
        let chain = Self::local_only();
        if !config.remote_extraction {
            tracing::info!("Remote extraction disabled");
            return chain;
        }

        match registry.default() {
            Some(service) => {
                tracing::info!(model = %registry.default_model_id(), "Remote extraction enabled");
                chain.with_stage(Arc::new(LlmExtractor::new(service)))
            }
            None => {
                tracing::warn!(
                    model = %registry.default_model_id(),
                    "Extractor model unavailable, using rule-based extraction only"
                );
                chain
            }
        }
    }

    /// Append a stage; it runs after earlier stages and before the rule-based extractor
    pub fn with_stage(mut self, stage: Arc<dyn EntityExtractor>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Extract entities; failures of earlier stages are logged and skipped.
    pub async fn extract(&self, text: &str) -> EntityCandidate {
        for stage in &self.stages {
            match stage.extract(text).await {
                Ok(mut candidate) => {
                    candidate.source = stage.source();
                    tracing::debug!(source = ?candidate.source, "Entities extracted");
                    return candidate;
                }
                Err(e) => {
                    tracing::warn!(
                        source = ?stage.source(),
                        error = %e,
                        "Extractor failed, falling back"
                    );
                }
            }
        }

        let mut candidate = self.terminal.parse(text);
        candidate.source = ExtractionSource::Local;
        tracing::debug!("Using rule-based extraction");
        candidate
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::local_only()
    }
}
