//! Retrieval-augmented generation building blocks.
//!
//! - `Chunker`: splits loaded documents into overlapping windows
//! - `VectorIndex`: embeds every chunk once per run
//! - `Retriever`: top-k cosine search with embedder fingerprint checks
//! - `Generator`: prompt assembly and a single completion call

pub mod chunker;
pub mod generator;
pub mod index;
pub mod retriever;
pub mod vector_math;

pub use chunker::{Chunk, Chunker, ChunkingConfig};
pub use generator::{GenerationSettings, Generator, PromptLayout};
pub use index::{ScoredChunk, VectorIndex};
pub use retriever::{QueryResult, Retriever, DEFAULT_TOP_K};
