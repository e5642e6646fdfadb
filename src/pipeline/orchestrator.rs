use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::components::{ComponentFactory, PipelineComponents};
use super::stage::{PipelineStage, StageTracker, GENERATION_FAILED};
use super::{PipeRequest, Pipeline};
use crate::core::config::RagValves;
use crate::core::errors::{ConfigError, PipelineError};
use crate::rag::VectorIndex;

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

/// Outcome of one invocation together with the stages it went through.
#[derive(Debug)]
pub struct PipelineRun {
    pub stages: Vec<PipelineStage>,
    pub failed_at: Option<PipelineStage>,
    pub outcome: Result<String, PipelineError>,
}

impl PipelineRun {
    /// The answer, or the fixed message for the stage that failed.
    pub fn into_response(self) -> String {
        match self.outcome {
            Ok(answer) => answer,
            Err(_) => self
                .failed_at
                .and_then(PipelineStage::failure_message)
                .unwrap_or(GENERATION_FAILED)
                .to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RagPipeline
// ---------------------------------------------------------------------------

struct Active {
    valves: RagValves,
    components: Arc<PipelineComponents>,
}

/// Website RAG: load, chunk, index, retrieve, generate. Each invocation
/// builds its own index; nothing is shared between runs except the
/// component snapshot.
pub struct RagPipeline {
    id: String,
    name: String,
    active: RwLock<Arc<Active>>,
    factory: ComponentFactory,
}

impl RagPipeline {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        valves: RagValves,
        factory: ComponentFactory,
    ) -> Result<Self, PipelineError> {
        let components = factory(&valves)?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            active: RwLock::new(Arc::new(Active {
                valves,
                components: Arc::new(components),
            })),
            factory,
        })
    }

    pub async fn valves(&self) -> RagValves {
        self.active.read().await.valves.clone()
    }

    /// Builds fresh components from `valves` and swaps them in. Runs already
    /// in flight finish with the previous snapshot.
    pub async fn replace_valves(&self, valves: RagValves) -> Result<(), PipelineError> {
        let components = (self.factory)(&valves)?;
        let next = Arc::new(Active {
            valves,
            components: Arc::new(components),
        });
        *self.active.write().await = next;
        Ok(())
    }

    /// Uses the same text as crawl target and question, like `pipe`.
    pub async fn answer(&self, url: &str, question: &str) -> String {
        self.run(url, question).await.into_response()
    }

    pub async fn run(&self, url: &str, question: &str) -> PipelineRun {
        let snapshot = self.active.read().await.clone();
        let span = info_span!("pipeline_run", pipeline = %self.id, run_id = %Uuid::new_v4());

        async move {
            let mut tracker = StageTracker::new();
            let outcome = execute(&snapshot.components, url, question, &mut tracker).await;

            let failed_at = match &outcome {
                Ok(_) => {
                    info!("Run completed");
                    None
                }
                Err(err) => {
                    let stage = tracker.fail();
                    error!(stage = stage.as_str(), "Run failed: {}", err);
                    Some(stage)
                }
            };

            PipelineRun {
                stages: tracker.into_history(),
                failed_at,
                outcome,
            }
        }
        .instrument(span)
        .await
    }
}

async fn execute(
    components: &PipelineComponents,
    url: &str,
    question: &str,
    tracker: &mut StageTracker,
) -> Result<String, PipelineError> {
    info!(stage = tracker.current().as_str(), "Loading {}", url);
    let documents = components.loader.load(url).await?;

    let stage = tracker.advance();
    info!(stage = stage.as_str(), "Chunking {} document(s)", documents.len());
    let chunks = components.chunker.split(&documents);

    let stage = tracker.advance();
    info!(stage = stage.as_str(), "Indexing {} chunk(s)", chunks.len());
    let index = VectorIndex::build(chunks, components.embedder.as_ref()).await?;

    let stage = tracker.advance();
    info!(stage = stage.as_str(), "Retrieving");
    let result = components.retriever.search(&index, question).await?;

    let stage = tracker.advance();
    info!(stage = stage.as_str(), "Generating from {} chunk(s)", result.len());
    let answer = components.generator.answer(&result.hits, question).await?;

    tracker.advance();
    Ok(answer)
}

#[async_trait]
impl Pipeline for RagPipeline {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn pipe(&self, request: PipeRequest) -> String {
        info!("pipe: {}", self.name);
        if request.is_title_request() {
            info!("Title Generation Request");
        }

        let message = request.user_message.trim();
        self.answer(message, message).await
    }

    async fn valves_json(&self) -> Value {
        serde_json::to_value(self.valves().await).unwrap_or(Value::Null)
    }

    async fn update_valves(&self, valves: Value) -> Result<(), PipelineError> {
        let valves: RagValves = serde_json::from_value(valves)
            .map_err(|err| ConfigError::invalid("valves", err.to_string()))?;
        self.replace_valves(valves).await?;
        self.on_valves_updated().await;
        Ok(())
    }
}
