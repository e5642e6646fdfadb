//! Fixed-size, overlapping character windows.
//!
//! Windows are measured in Unicode scalar values. Each window after the
//! first starts with the last `overlap` characters of the previous one.

use serde::Serialize;

use crate::core::errors::ConfigError;
use crate::loader::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::invalid("chunk_size", "must be at least 1"));
        }
        if overlap >= chunk_size {
            return Err(ConfigError::invalid(
                "chunk_overlap",
                format!("must be smaller than chunk_size ({})", chunk_size),
            ));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// `"{document_index}:{chunk_index}"`
    pub id: String,
    pub text: String,
    pub source: String,
    pub title: Option<String>,
    pub document_index: usize,
    pub chunk_index: usize,
    /// Character offset of the window inside its document.
    pub start_offset: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .enumerate()
            .flat_map(|(document_index, document)| self.split_document(document_index, document))
            .collect()
    }

    fn split_document(&self, document_index: usize, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.text().chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        if total_chars == 0 {
            return chunks;
        }

        let metadata = document.metadata();
        let mut start = 0;
        loop {
            let end = (start + self.config.chunk_size).min(total_chars);
            let chunk_index = chunks.len();
            chunks.push(Chunk {
                id: format!("{}:{}", document_index, chunk_index),
                text: chars[start..end].iter().collect(),
                source: metadata.url.clone(),
                title: metadata.title.clone(),
                document_index,
                chunk_index,
                start_offset: start,
            });

            if end >= total_chars {
                break;
            }
            start += self.config.step();
        }

        chunks
    }
}
