//! Pipelines hosted by the server and the orchestrator that runs them.

pub mod components;
pub mod orchestrator;
pub mod registry;
pub mod stage;


use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::core::errors::PipelineError;
pub use components::{http_factory, ComponentFactory, PipelineComponents};
pub use orchestrator::{PipelineRun, RagPipeline};
pub use registry::PipelineRegistry;
pub use stage::{PipelineStage, StageTracker};

/// Arguments of one `pipe` invocation as sent by a chat front end.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipeRequest {
    pub user_message: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default)]
    pub body: Value,
}

impl PipeRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ..Self::default()
        }
    }

    pub fn is_title_request(&self) -> bool {
        self.body
            .get("title")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Host-facing surface of a pipeline. Lifecycle hooks and the body filters
/// default to logging pass-throughs.
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    async fn on_startup(&self) {
        info!("on_startup: {}", self.name());
    }

    async fn on_shutdown(&self) {
        info!("on_shutdown: {}", self.name());
    }

    async fn on_valves_updated(&self) {
        info!("on_valves_updated: {}", self.name());
    }

    async fn inlet(&self, body: Value, _user: Option<Value>) -> Value {
        info!("inlet: {}", self.name());
        body
    }

    async fn outlet(&self, body: Value, _user: Option<Value>) -> Value {
        info!("outlet: {}", self.name());
        body
    }

    /// Always produces a short text answer; failures become fixed messages.
    async fn pipe(&self, request: PipeRequest) -> String;

    async fn valves_json(&self) -> Value;

    async fn update_valves(&self, valves: Value) -> Result<(), PipelineError>;
}
