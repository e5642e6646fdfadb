use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::types::ChatRequest;
use crate::core::errors::ServiceError;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// provider label (e.g. "openai", "groq")
    fn name(&self) -> &str;

    /// chat completion (non-streaming); returns the first choice's text
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ServiceError>;
}

/// Identifies the embedding configuration an index was built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EmbedderFingerprint {
    pub provider: String,
    pub model: String,
    pub base_url: String,
}

impl EmbedderFingerprint {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }
}

impl fmt::Display for EmbedderFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.provider, self.model, self.base_url)
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn fingerprint(&self) -> &EmbedderFingerprint;

    /// generate one embedding
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}
