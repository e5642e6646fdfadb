use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::index::{ScoredChunk, VectorIndex};
use crate::core::errors::RetrievalError;
use crate::llm::Embedder;

pub const DEFAULT_TOP_K: usize = 4;

/// Hits in non-increasing score order, at most `k` of them.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub hits: Vec<ScoredChunk>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    pub async fn search(
        &self,
        index: &VectorIndex,
        query: &str,
    ) -> Result<QueryResult, RetrievalError> {
        self.search_k(index, query, self.top_k).await
    }

    pub async fn search_k(
        &self,
        index: &VectorIndex,
        query: &str,
        k: usize,
    ) -> Result<QueryResult, RetrievalError> {
        let fingerprint = self.embedder.fingerprint();
        if fingerprint != index.fingerprint() {
            return Err(RetrievalError::EmbedderMismatch {
                index: index.fingerprint().to_string(),
                query: fingerprint.to_string(),
            });
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(RetrievalError::Embedding)?;
        if vector.len() != index.dimensions() {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dimensions(),
                actual: vector.len(),
            });
        }

        let hits = index.nearest(&vector, k);
        if hits.is_empty() {
            return Err(RetrievalError::NoResults);
        }
        info!("Retrieved {} of {} chunk(s)", hits.len(), index.len());
        Ok(QueryResult { hits })
    }
}
