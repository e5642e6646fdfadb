use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{Embedder, EmbedderFingerprint};
use crate::core::errors::{ConfigError, ServiceError};
use crate::core::http::{build_client, read_json, trim_base_url};

const SERVICE: &str = "embedding service";

#[derive(Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: Client,
    fingerprint: EmbedderFingerprint,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let base_url = trim_base_url(base_url);
        let model = model.trim().to_string();
        Ok(Self {
            fingerprint: EmbedderFingerprint::new("ollama", model.clone(), base_url.clone()),
            client: build_client(timeout, None)?,
            base_url,
            model,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn fingerprint(&self) -> &EmbedderFingerprint {
        &self.fingerprint
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|err| ServiceError::transport(SERVICE, err))?;

        let payload: EmbeddingResponse = read_json(SERVICE, res).await?;
        if payload.embedding.is_empty() {
            return Err(ServiceError::Empty { service: SERVICE });
        }
        Ok(payload.embedding)
    }
}
