use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::pipeline::{http_factory, ComponentFactory, PipelineRegistry};
use crate::tools::YoutubeMetadataTool;

pub mod error;

use error::InitializationError;

/// Shared state behind every route.
///
/// The registry and the tool are built once from the loaded configuration;
/// pipeline valves change in place afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config_service: ConfigService,
    pub config: AppConfig,
    pub pipelines: Arc<PipelineRegistry>,
    pub youtube: Arc<YoutubeMetadataTool>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Loads configuration from disk and the environment, then builds
    /// HTTP-backed pipelines.
    pub fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths);
        let config = config_service
            .load_app_config()
            .map_err(InitializationError::Config)?;
        Self::build(config_service, config, http_factory())
    }

    pub fn build(
        config_service: ConfigService,
        config: AppConfig,
        factory: ComponentFactory,
    ) -> Result<Arc<Self>, InitializationError> {
        let pipelines = PipelineRegistry::from_config(&config.pipelines, factory);
        if pipelines.is_empty() {
            tracing::warn!("No pipeline is configured; set FIRECRAWL_API_KEY and a completion key");
        }

        let youtube = YoutubeMetadataTool::from_settings(&config.youtube)
            .map_err(InitializationError::Tool)?;
        if !youtube.is_configured() {
            tracing::warn!("YOUTUBE_API_KEY is not set; the YouTube tool will report an error");
        }

        Ok(Arc::new(AppState {
            config_service,
            config,
            pipelines: Arc::new(pipelines),
            youtube: Arc::new(youtube),
            started_at: Utc::now(),
        }))
    }
}
