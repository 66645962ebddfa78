//! Mock extractors for tests

use super::{EntityCandidate, EntityExtractor, ExtractError, ExtractionSource};
use crate::llm::LlmError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Extractor that always returns the same candidate
pub struct StaticExtractor {
    candidate: EntityCandidate,
    calls: AtomicUsize,
}

impl StaticExtractor {
    pub fn new(candidate: EntityCandidate) -> Self {
        Self {
            candidate,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityExtractor for StaticExtractor {
    async fn extract(&self, _text: &str) -> Result<EntityCandidate, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidate.clone())
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Remote
    }
}

/// Extractor that always fails, counting attempts
pub struct FailingExtractor {
    calls: AtomicUsize,
}

impl FailingExtractor {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityExtractor for FailingExtractor {
    async fn extract(&self, _text: &str) -> Result<EntityCandidate, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExtractError::Remote(LlmError::network("service unavailable")))
    }

    fn source(&self) -> ExtractionSource {
        ExtractionSource::Remote
    }
}
