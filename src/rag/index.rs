use serde::Serialize;
use tracing::{debug, info};

use super::chunker::Chunk;
use super::vector_math::rank_descending_by_cosine;
use crate::core::errors::IndexError;
use crate::llm::{Embedder, EmbedderFingerprint};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Exact in-memory cosine index over one run's chunks.
///
/// Only obtainable through [`VectorIndex::build`], which either embeds every
/// chunk or fails; a partially embedded index never exists.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    fingerprint: EmbedderFingerprint,
    dimensions: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::NoChunks);
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let vector = embedder
                .embed(&chunk.text)
                .await
                .map_err(|source| IndexError::Embedding {
                    chunk_id: chunk.id.clone(),
                    source,
                })?;

            if vector.is_empty() {
                return Err(IndexError::EmptyVector {
                    chunk_id: chunk.id.clone(),
                });
            }
            if let Some(first) = vectors.first() {
                if first.len() != vector.len() {
                    return Err(IndexError::DimensionMismatch {
                        chunk_id: chunk.id.clone(),
                        expected: first.len(),
                        actual: vector.len(),
                    });
                }
            }
            debug!(chunk = %chunk.id, "Embedded chunk");
            vectors.push(vector);
        }

        let dimensions = vectors[0].len();
        info!(
            "Indexed {} chunk(s), {} dimensions, embedder {}",
            chunks.len(),
            dimensions,
            embedder.fingerprint()
        );
        Ok(Self {
            fingerprint: embedder.fingerprint().clone(),
            dimensions,
            chunks,
            vectors,
        })
    }

    pub fn fingerprint(&self) -> &EmbedderFingerprint {
        &self.fingerprint
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Up to `k` chunks by descending cosine similarity; ties keep
    /// insertion order.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        rank_descending_by_cosine(query, self.vectors.iter().map(Vec::as_slice))
            .into_iter()
            .take(k)
            .map(|(idx, score)| ScoredChunk {
                chunk: self.chunks[idx].clone(),
                score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ServiceError;
    use crate::test_support::{chunk, FixedEmbedder, HashEmbedder};

    #[tokio::test]
    async fn builds_one_vector_per_chunk() {
        let embedder = HashEmbedder::new();
        let chunks = vec![chunk(0, "alpha beta"), chunk(1, "gamma delta")];

        let index = VectorIndex::build(chunks, &embedder).await.expect("index builds");
        assert_eq!(index.len(), 2);
        assert_eq!(index.dimensions(), HashEmbedder::DIMENSIONS);
        assert_eq!(embedder.calls(), 2);
        assert_eq!(index.fingerprint(), embedder.fingerprint());
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let err = VectorIndex::build(Vec::new(), &HashEmbedder::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::NoChunks));
    }

    #[tokio::test]
    async fn any_failure_aborts_the_build() {
        let chunks = || vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")];

        let failing = FixedEmbedder::new(vec![
            Ok(vec![1.0, 0.0]),
            Err(ServiceError::Timeout {
                service: "embedding service",
            }),
        ]);
        let err = VectorIndex::build(chunks(), &failing).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding { ref chunk_id, .. } if chunk_id == "1:0"));

        let ragged = FixedEmbedder::new(vec![Ok(vec![1.0, 0.0]), Ok(vec![1.0, 0.0, 0.0])]);
        let err = VectorIndex::build(chunks(), &ragged).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));

        let empty = FixedEmbedder::new(vec![Ok(Vec::new())]);
        let err = VectorIndex::build(chunks(), &empty).await.unwrap_err();
        assert!(matches!(err, IndexError::EmptyVector { .. }));
    }

    #[tokio::test]
    async fn nearest_respects_k_and_order() {
        let embedder = FixedEmbedder::new(vec![
            Ok(vec![1.0, 0.0]),
            Ok(vec![0.0, 1.0]),
            Ok(vec![1.0, 0.0]),
        ]);
        let chunks = vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")];
        let index = VectorIndex::build(chunks, &embedder).await.expect("index");

        let hits = index.nearest(&[1.0, 0.0], 2);
        let ids: Vec<&str> = hits.iter().map(|hit| hit.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["0:0", "2:0"]);
        assert_eq!(index.nearest(&[1.0, 0.0], 10).len(), 3);
    }
}
