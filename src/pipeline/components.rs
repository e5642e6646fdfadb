use std::sync::Arc;

use crate::core::config::RagValves;
use crate::core::errors::PipelineError;
use crate::llm::{CompletionProvider, Embedder, OllamaEmbedder, OpenAiCompatibleProvider};
use crate::loader::{CrawlOptions, CrawlService, FirecrawlClient, WebLoader};
use crate::rag::{Chunker, ChunkingConfig, GenerationSettings, Generator, Retriever};

/// Everything one run needs, built from a valves snapshot. Replaced as a
/// whole when valves change.
pub struct PipelineComponents {
    pub loader: WebLoader,
    pub chunker: Chunker,
    pub embedder: Arc<dyn Embedder>,
    pub retriever: Retriever,
    pub generator: Generator,
}

pub type ComponentFactory =
    Arc<dyn Fn(&RagValves) -> Result<PipelineComponents, PipelineError> + Send + Sync>;

impl PipelineComponents {
    /// HTTP clients for Firecrawl, Ollama and the completion endpoint.
    pub fn from_valves(valves: &RagValves) -> Result<Self, PipelineError> {
        valves.validate()?;
        let timeout = valves.request_timeout();

        let crawler = FirecrawlClient::new(
            &valves.firecrawl_base_url,
            &valves.firecrawl_api_key,
            timeout,
            CrawlOptions::from_valves(valves),
        )?;
        let embedder = OllamaEmbedder::new(&valves.ollama_base_url, &valves.ollama_model, timeout)?;
        let provider = OpenAiCompatibleProvider::new(
            valves.completion_provider.clone(),
            &valves.completion_base_url,
            &valves.completion_api_key,
            timeout,
        )?;

        Self::assemble(
            Arc::new(crawler),
            Arc::new(embedder),
            Arc::new(provider),
            valves,
        )
    }

    /// Wires already-built collaborators. Valves are validated first, so a
    /// missing credential fails before any collaborator is touched.
    pub fn assemble(
        crawler: Arc<dyn CrawlService>,
        embedder: Arc<dyn Embedder>,
        provider: Arc<dyn CompletionProvider>,
        valves: &RagValves,
    ) -> Result<Self, PipelineError> {
        valves.validate()?;
        let chunking = ChunkingConfig::new(valves.chunk_size, valves.chunk_overlap)?;

        Ok(Self {
            loader: WebLoader::new(crawler, valves.crawl_mode),
            chunker: Chunker::new(chunking),
            retriever: Retriever::new(embedder.clone(), valves.top_k),
            embedder,
            generator: Generator::new(provider, GenerationSettings::from_valves(valves)),
        })
    }
}

pub fn http_factory() -> ComponentFactory {
    Arc::new(PipelineComponents::from_valves)
}
