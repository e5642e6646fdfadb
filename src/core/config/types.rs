//! Typed configuration records.
//!
//! The YAML file is merged over the serialized defaults before it is
//! deserialized here, so every field is always present.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::core::errors::ConfigError;
use crate::loader::CrawlMode;
use crate::rag::generator::PromptLayout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipelines: PipelinesConfig,
    pub youtube: YoutubeSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pipelines: PipelinesConfig::default(),
            youtube: defaults::youtube_settings(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9099,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinesConfig {
    pub firecrawl_openai: RagValves,
    pub firecrawl_groq: RagValves,
}

impl Default for PipelinesConfig {
    fn default() -> Self {
        Self {
            firecrawl_openai: defaults::firecrawl_openai_valves(),
            firecrawl_groq: defaults::firecrawl_groq_valves(),
        }
    }
}

impl PipelinesConfig {
    pub fn entries(&self) -> [(&'static str, &RagValves); 2] {
        [
            (defaults::FIRECRAWL_OPENAI_ID, &self.firecrawl_openai),
            (defaults::FIRECRAWL_GROQ_ID, &self.firecrawl_groq),
        ]
    }
}

/// Inclusive bounds for the integer valves, shared by the typed check and
/// the raw document check.
pub const VALVE_INTEGER_BOUNDS: [(&str, u64, u64); 8] = [
    ("max_tokens", 1, 1_000_000),
    ("chunk_size", 1, 1_000_000),
    ("chunk_overlap", 0, 1_000_000),
    ("top_k", 1, 1_000),
    ("crawl_page_limit", 1, 10_000),
    ("crawl_poll_interval_ms", 1, 600_000),
    ("crawl_timeout_secs", 1, 86_400),
    ("request_timeout_secs", 1, 3_600),
];

/// Runtime-editable settings of one website RAG pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagValves {
    pub firecrawl_api_key: String,
    pub firecrawl_base_url: String,
    pub crawl_mode: CrawlMode,
    pub crawl_page_limit: usize,
    pub crawl_poll_interval_ms: u64,
    pub crawl_timeout_secs: u64,
    pub ollama_base_url: String,
    pub ollama_model: String,
    /// Provider label used in logs and credential errors ("openai", "groq").
    pub completion_provider: String,
    pub completion_api_key: String,
    pub completion_base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub request_timeout_secs: u64,
    pub prompt_layout: PromptLayout,
}

impl Default for RagValves {
    fn default() -> Self {
        defaults::firecrawl_openai_valves()
    }
}

impl RagValves {
    /// Range checks that hold regardless of credentials.
    pub fn validate_ranges(&self) -> Result<(), ConfigError> {
        require_text("firecrawl_base_url", &self.firecrawl_base_url)?;
        require_text("ollama_base_url", &self.ollama_base_url)?;
        require_text("ollama_model", &self.ollama_model)?;
        require_text("completion_base_url", &self.completion_base_url)?;
        require_text("model", &self.model)?;

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid("temperature", "must be between 0 and 2"));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigError::invalid("top_p", "must be in (0, 1]"));
        }
        for ((key, min, max), value) in VALVE_INTEGER_BOUNDS.iter().zip(self.integer_fields()) {
            if value < *min || value > *max {
                return Err(ConfigError::invalid(
                    *key,
                    format!("must be between {} and {}", min, max),
                ));
            }
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::invalid(
                "chunk_overlap",
                format!("must be smaller than chunk_size ({})", self.chunk_size),
            ));
        }
        Ok(())
    }

    /// Values in `VALVE_INTEGER_BOUNDS` order.
    fn integer_fields(&self) -> [u64; 8] {
        [
            u64::from(self.max_tokens),
            self.chunk_size as u64,
            self.chunk_overlap as u64,
            self.top_k as u64,
            self.crawl_page_limit as u64,
            self.crawl_poll_interval_ms,
            self.crawl_timeout_secs,
            self.request_timeout_secs,
        ]
    }

    /// Full construction-time check: ranges plus required credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_ranges()?;
        if self.firecrawl_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("firecrawl_api_key".to_string()));
        }
        if self.completion_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential(self.completion_credential_name()));
        }
        Ok(())
    }

    pub fn completion_credential_name(&self) -> String {
        format!("{}_api_key", self.completion_provider.trim())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoutubeSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub watch_base: String,
    pub default_language: String,
    /// Upper bound on collected comment lines; `None` fetches every page.
    pub max_comments: Option<usize>,
    pub request_timeout_secs: u64,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        defaults::youtube_settings()
    }
}

impl YoutubeSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, "value cannot be empty"));
    }
    Ok(())
}
