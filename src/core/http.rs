//! Shared HTTP client plumbing for the external service adapters.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::core::errors::{ConfigError, ServiceError};

/// Builds a client with a per-request deadline and an optional bearer token.
pub fn build_client(timeout: Duration, bearer: Option<&str>) -> Result<Client, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = bearer.map(str::trim).filter(|token| !token.is_empty()) {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ConfigError::invalid("api_key", "contains characters not allowed in a header"))?;
        headers.insert(AUTHORIZATION, value);
    }

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|err| ConfigError::Io(format!("failed to build HTTP client: {}", err)))
}

/// Reads a JSON body, mapping non-success statuses to a `ServiceError`.
pub async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T, ServiceError> {
    if !response.status().is_success() {
        return Err(ServiceError::from_response(service, response).await);
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|err| ServiceError::transport(service, err))?;
    serde_json::from_slice(&bytes).map_err(|err| ServiceError::decode(service, err))
}

/// Same as [`read_json`] for plain-text bodies.
pub async fn read_text(
    service: &'static str,
    response: reqwest::Response,
) -> Result<String, ServiceError> {
    if !response.status().is_success() {
        return Err(ServiceError::from_response(service, response).await);
    }
    response
        .text()
        .await
        .map_err(|err| ServiceError::transport(service, err))
}

pub fn trim_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}
