use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::index::ScoredChunk;
use crate::core::config::RagValves;
use crate::core::errors::GenerationError;
use crate::llm::{ChatMessage, ChatRequest, CompletionProvider};

pub const DEFAULT_INSTRUCTION: &str = "You are a friendly assistant. Your job is to answer the user's question based on the documentation provided below.";

/// How instruction, context and question are laid out in the chat request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptLayout {
    /// System instruction, then one user turn with docs and question.
    #[default]
    SystemAndUser,
    /// Everything in a single user turn.
    SingleUser,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub layout: PromptLayout,
}

impl GenerationSettings {
    pub fn from_valves(valves: &RagValves) -> Self {
        Self {
            model: valves.model.clone(),
            temperature: valves.temperature,
            top_p: valves.top_p,
            max_tokens: valves.max_tokens,
            layout: valves.prompt_layout,
        }
    }
}

pub fn context_block(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_messages(layout: PromptLayout, context: &str, question: &str) -> Vec<ChatMessage> {
    match layout {
        PromptLayout::SystemAndUser => vec![
            ChatMessage::system(DEFAULT_INSTRUCTION),
            ChatMessage::user(format!("Docs: {}\n\nQuestion: {}", context, question)),
        ],
        PromptLayout::SingleUser => vec![ChatMessage::user(format!(
            "{}:\nDocs:\n\n{}\n\nQuestion: {}",
            DEFAULT_INSTRUCTION.trim_end_matches('.'),
            context,
            question
        ))],
    }
}

pub struct Generator {
    provider: Arc<dyn CompletionProvider>,
    settings: GenerationSettings,
}

impl Generator {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// One non-streaming completion over the retrieved chunks.
    pub async fn answer(
        &self,
        chunks: &[ScoredChunk],
        question: &str,
    ) -> Result<String, GenerationError> {
        let context = context_block(chunks);
        let messages = build_messages(self.settings.layout, &context, question);
        let request = ChatRequest::new(messages).with_sampling(
            self.settings.temperature,
            self.settings.top_p,
            self.settings.max_tokens,
        );

        let content = self.provider.chat(request, &self.settings.model).await?;
        let answer = content.trim();
        if answer.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        info!(
            "Generated {} character answer with {} ({})",
            answer.chars().count(),
            self.settings.model,
            self.provider.name()
        );
        Ok(answer.to_string())
    }
}
