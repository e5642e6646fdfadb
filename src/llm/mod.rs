pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiCompatibleProvider;
pub use provider::{CompletionProvider, Embedder, EmbedderFingerprint};
pub use types::{ChatMessage, ChatRequest};
