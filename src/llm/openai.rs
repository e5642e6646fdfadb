use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::CompletionProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::errors::{ConfigError, ServiceError};
use crate::core::http::{build_client, read_json, trim_base_url};

const SERVICE: &str = "completion service";

/// Chat completions against any OpenAI-compatible endpoint (OpenAI, Groq).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        api_key: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.into(),
            base_url: trim_base_url(base_url),
            client: build_client(timeout, Some(api_key))?,
        })
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionBody {
            model: model_id,
            messages: &request.messages,
            stream: false,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
        };
        debug!(provider = %self.name, model = model_id, "Sending chat completion");

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        let payload: CompletionResponse = read_json(SERVICE, res).await?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or(ServiceError::Empty { service: SERVICE })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    #[tokio::test]
    async fn sends_sampling_parameters_and_bearer_token() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let mut keys: Vec<&str> = body
                    .as_object()
                    .map(|fields| fields.keys().map(String::as_str).collect())
                    .unwrap_or_default();
                keys.sort_unstable();
                Json(json!({
                    "choices": [{ "message": {
                        "role": "assistant",
                        "content": format!(
                            "{}|{}|{}|{}|{}|{}",
                            auth,
                            body["model"],
                            body["temperature"],
                            body["max_tokens"],
                            body["stream"],
                            keys.join(",")
                        )
                    }}]
                }))
            }),
        );
        let base = serve(app).await;

        let provider = OpenAiCompatibleProvider::new(
            "openai",
            &format!("{}/v1/", base),
            "sk-test",
            Duration::from_secs(5),
        )
        .expect("provider builds");
        let request =
            ChatRequest::new(vec![ChatMessage::user("hi")]).with_sampling(0.5, 0.9, 64);

        let content = provider.chat(request, "gpt-test").await.expect("chat succeeds");
        assert_eq!(
            content,
            "Bearer sk-test|\"gpt-test\"|0.5|64|false|max_tokens,messages,model,stream,temperature,top_p"
        );
    }

    #[tokio::test]
    async fn maps_auth_failures_and_empty_choices() {
        let app = Router::new()
            .route(
                "/denied/chat/completions",
                post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
            )
            .route(
                "/empty/chat/completions",
                post(|| async { Json(json!({ "choices": [] })) }),
            );
        let base = serve(app).await;
        let request = || ChatRequest::new(vec![ChatMessage::user("hi")]);

        let denied = OpenAiCompatibleProvider::new(
            "groq",
            &format!("{}/denied", base),
            "nope",
            Duration::from_secs(5),
        )
        .expect("provider builds");
        let err = denied.chat(request(), "m").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized { status: 401, .. }));

        let empty = OpenAiCompatibleProvider::new(
            "groq",
            &format!("{}/empty", base),
            "key",
            Duration::from_secs(5),
        )
        .expect("provider builds");
        let err = empty.chat(request(), "m").await.unwrap_err();
        assert!(matches!(err, ServiceError::Empty { .. }));
    }
}
