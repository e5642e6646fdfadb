//! Built-in valve presets for the bundled pipelines.

use super::types::{RagValves, YoutubeSettings};
use crate::loader::CrawlMode;
use crate::rag::generator::PromptLayout;
use crate::rag::retriever::DEFAULT_TOP_K;

pub const FIRECRAWL_OPENAI_ID: &str = "firecrawl_openai";
pub const FIRECRAWL_GROQ_ID: &str = "firecrawl_groq";

pub fn pipeline_name(id: &str) -> &'static str {
    match id {
        FIRECRAWL_OPENAI_ID => "Firecrawl, Ollama and OpenAI Pipeline",
        FIRECRAWL_GROQ_ID => "Firecrawl, Ollama and Groq Llama 3 Pipeline",
        _ => "Website RAG Pipeline",
    }
}

pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_YOUTUBE_WATCH_BASE: &str = "https://www.youtube.com";

/// Firecrawl + Ollama embeddings + OpenAI chat completions.
pub fn firecrawl_openai_valves() -> RagValves {
    RagValves {
        firecrawl_api_key: String::new(),
        firecrawl_base_url: DEFAULT_FIRECRAWL_BASE_URL.to_string(),
        crawl_mode: CrawlMode::Crawl,
        crawl_page_limit: 25,
        crawl_poll_interval_ms: 1_000,
        crawl_timeout_secs: 300,
        ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
        completion_provider: "openai".to_string(),
        completion_api_key: String::new(),
        completion_base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-3.5-turbo".to_string(),
        temperature: 0.7,
        max_tokens: 2048,
        top_p: 0.9,
        chunk_size: 1000,
        chunk_overlap: 200,
        top_k: DEFAULT_TOP_K,
        request_timeout_secs: 30,
        prompt_layout: PromptLayout::SystemAndUser,
    }
}

/// Firecrawl + Ollama embeddings + Groq-hosted Llama 3.
pub fn firecrawl_groq_valves() -> RagValves {
    RagValves {
        completion_provider: "groq".to_string(),
        completion_base_url: "https://api.groq.com/openai/v1".to_string(),
        model: "llama3-8b-8192".to_string(),
        temperature: 1.0,
        max_tokens: 1024,
        top_p: 1.0,
        prompt_layout: PromptLayout::SingleUser,
        ..firecrawl_openai_valves()
    }
}

pub fn youtube_settings() -> YoutubeSettings {
    YoutubeSettings {
        api_key: None,
        api_base: DEFAULT_YOUTUBE_API_BASE.to_string(),
        watch_base: DEFAULT_YOUTUBE_WATCH_BASE.to_string(),
        default_language: "en".to_string(),
        max_comments: None,
        request_timeout_secs: 30,
    }
}
