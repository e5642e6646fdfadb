use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info};

use super::components::ComponentFactory;
use super::orchestrator::RagPipeline;
use super::Pipeline;
use crate::core::config::{defaults, PipelinesConfig};

#[derive(Default)]
pub struct PipelineRegistry {
    pipelines: BTreeMap<String, Arc<dyn Pipeline>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every configured preset. A preset whose valves do not
    /// validate (usually a missing API key) is logged and left out.
    pub fn from_config(config: &PipelinesConfig, factory: ComponentFactory) -> Self {
        let mut registry = Self::new();
        for (id, valves) in config.entries() {
            let name = defaults::pipeline_name(id);
            match RagPipeline::new(id, name, valves.clone(), factory.clone()) {
                Ok(pipeline) => {
                    info!("Registered pipeline {} ({})", id, name);
                    registry.insert(Arc::new(pipeline));
                }
                Err(err) => error!("Pipeline {} not registered: {}", id, err),
            }
        }
        registry
    }

    pub fn insert(&mut self, pipeline: Arc<dyn Pipeline>) {
        self.pipelines.insert(pipeline.id().to_string(), pipeline);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Pipeline>> {
        self.pipelines.get(id).cloned()
    }

    pub fn list(&self) -> impl Iterator<Item = &Arc<dyn Pipeline>> {
        self.pipelines.values()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub async fn startup_all(&self) {
        for pipeline in self.pipelines.values() {
            pipeline.on_startup().await;
        }
    }

    pub async fn shutdown_all(&self) {
        for pipeline in self.pipelines.values() {
            pipeline.on_shutdown().await;
        }
    }
}
