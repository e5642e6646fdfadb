use std::fmt;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

const MAX_ERROR_BODY: usize = 512;

/// Failure of a single call to an external HTTP service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} is unreachable: {message}")]
    Unreachable {
        service: &'static str,
        message: String,
    },
    #[error("{service} did not answer in time")]
    Timeout { service: &'static str },
    #[error("{service} rejected the credentials (HTTP {status})")]
    Unauthorized { service: &'static str, status: u16 },
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} returned an unexpected payload: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
    #[error("{service} returned no data")]
    Empty { service: &'static str },
}

impl ServiceError {
    pub fn transport(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout { service }
        } else if err.is_decode() {
            ServiceError::Decode {
                service,
                message: err.to_string(),
            }
        } else {
            ServiceError::Unreachable {
                service,
                message: err.to_string(),
            }
        }
    }

    pub fn decode<E: fmt::Display>(service: &'static str, err: E) -> Self {
        ServiceError::Decode {
            service,
            message: err.to_string(),
        }
    }

    /// Converts a non-success response into the matching failure mode.
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return ServiceError::Unauthorized {
                service,
                status: status.as_u16(),
            };
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        ServiceError::Status {
            service,
            status: status.as_u16(),
            body,
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            ServiceError::Unreachable { service, .. }
            | ServiceError::Timeout { service }
            | ServiceError::Unauthorized { service, .. }
            | ServiceError::Status { service, .. }
            | ServiceError::Decode { service, .. }
            | ServiceError::Empty { service } => service,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential `{0}`")]
    MissingCredential(String),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
    #[error("failed to access configuration: {0}")]
    Io(String),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("crawl service rejected the request: {message}")]
    Rejected { message: String },
    #[error("crawl job {job_id} ended with status `{status}`")]
    CrawlFailed { job_id: String, status: String },
    #[error("crawl job {job_id} did not finish within {seconds}s")]
    Timeout { job_id: String, seconds: u64 },
    #[error("no content was loaded from {url}")]
    Empty { url: String },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no chunks to index")]
    NoChunks,
    #[error("failed to embed chunk {chunk_id}: {source}")]
    Embedding {
        chunk_id: String,
        #[source]
        source: ServiceError,
    },
    #[error("embedding for chunk {chunk_id} is empty")]
    EmptyVector { chunk_id: String },
    #[error("embedding for chunk {chunk_id} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        chunk_id: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("index was built with {index} but the query embedder is {query}")]
    EmbedderMismatch { index: String, query: String },
    #[error("failed to embed query: {0}")]
    Embedding(#[source] ServiceError),
    #[error("query embedding has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("no documents matched the query")]
    NoResults,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("completion contained no text")]
    EmptyResponse,
}

/// Structured failure of a pipeline run. Converted to text only at the
/// outer boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("load failed: {0}")]
    Load(#[from] LoadError),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("indexing failed: {0}")]
    Index(#[from] IndexError),
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Non-fatal condition: the run continues with degraded data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartialDataWarning {
    TranscriptUnavailable { language: String, reason: String },
    CommentsIncomplete { fetched: usize, reason: String },
}

impl fmt::Display for PartialDataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialDataWarning::TranscriptUnavailable { language, reason } => {
                write!(f, "transcript unavailable in `{}`: {}", language, reason)
            }
            PartialDataWarning::CommentsIncomplete { fetched, reason } => {
                write!(f, "comments incomplete after {} entries: {}", fetched, reason)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Configuration(inner) => inner.into(),
            PipelineError::InvalidUrl(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
