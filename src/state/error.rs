use thiserror::Error;

use crate::core::errors::ConfigError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] ConfigError),

    #[error("Failed to initialize YouTube tool: {0}")]
    Tool(#[source] ConfigError),
}
