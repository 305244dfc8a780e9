//! OpenAI providers for embeddings and chat completion
//!
//! Both share one [`OpenAiClient`]. Embedding requests are retried with
//! exponential backoff on transport errors, 429 and 5xx; chat requests are
//! sent exactly once.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{OpenAiConfig, Secret};
use crate::error::{Error, Result};

use super::embedding::{EmbeddingProvider, EmbeddingResult};
use super::llm::{ChatMessage, ChatProvider, ChatRequest};

/// Inputs accepted by one embeddings call
pub const MAX_EMBEDDING_BATCH: usize = 2048;

/// OpenAI REST client
pub struct OpenAiClient {
    /// HTTP client
    client: Client,
    base_url: String,
    api_key: Secret,
    /// Retries for embedding requests
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// Vectors in input order
    fn into_result(mut self) -> EmbeddingResult {
        self.data.sort_by_key(|d| d.index);
        EmbeddingResult {
            vectors: self.data.into_iter().map(|d| d.embedding).collect(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Outcome of a single attempt
enum Attempt<T> {
    Done(T),
    Retry(String),
    Fail(String),
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    /// POST a JSON body, retrying up to `retries` times with backoff
    async fn post_json<B, R>(
        &self,
        path: &str,
        body: &B,
        retries: u32,
        kind: fn(String) -> Error,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            let message = match self.try_post(&url, body).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fail(message) => return Err(kind(message)),
                Attempt::Retry(message) => message,
            };

            if attempt >= retries {
                return Err(kind(message));
            }

            let delay = Duration::from_secs(2u64.pow(attempt));
            tracing::warn!(
                "OpenAI request to {} failed (attempt {}/{}): {}; retrying in {:?}",
                path,
                attempt + 1,
                retries + 1,
                message,
                delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    async fn try_post<B, R>(&self, url: &str, body: &B) -> Attempt<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = match self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose())
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(format!("request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            let message = format!("HTTP {} - {}", status, detail);
            return if is_retriable(status) {
                Attempt::Retry(message)
            } else {
                Attempt::Fail(message)
            };
        }

        match response.json::<R>().await {
            Ok(value) => Attempt::Done(value),
            Err(e) => Attempt::Fail(format!("failed to parse response: {}", e)),
        }
    }
}

fn is_retriable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// OpenAI embedding provider
pub struct OpenAiEmbedder {
    client: Arc<OpenAiClient>,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// `dimensions` is sent with every request (Matryoshka truncation)
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };

        let response: EmbeddingResponse = self
            .client
            .post_json("embeddings", &request, self.client.max_retries, Error::Embedding)
            .await?;

        Ok(response.into_result())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_batch_size(&self) -> usize {
        MAX_EMBEDDING_BATCH
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// OpenAI chat completion provider
pub struct OpenAiChat {
    client: Arc<OpenAiClient>,
}

impl OpenAiChat {
    pub fn new(client: Arc<OpenAiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        tracing::info!("Generating answer with model: {}", request.model);

        let body = CompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response: CompletionResponse = self
            .client
            .post_json("chat/completions", &body, 0, Error::Llm)
            .await?;

        response
            .into_text()
            .ok_or_else(|| Error::llm("model returned an empty completion"))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedding_request_carries_dimensions() {
        let input = vec!["protein".to_string(), "fiber".to_string()];
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &input,
            dimensions: 1024,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "text-embedding-3-small",
                "input": ["protein", "fiber"],
                "dimensions": 1024
            })
        );
    }

    #[test]
    fn test_embedding_response_restores_input_order() {
        let response: EmbeddingResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ],
            "model": "text-embedding-3-small"
        }))
        .unwrap();
        let result = response.into_result();
        assert_eq!(result.vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_completion_request_shape() {
        let messages = vec![ChatMessage::system("be careful"), ChatMessage::user("hi")];
        let body = CompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 1000,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 1000);
    }

    #[test]
    fn test_completion_text_extraction() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Eat legumes."}}]
        }))
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some("Eat legumes."));

        let empty: CompletionResponse = serde_json::from_value(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(empty.into_text().is_none());
    }

    #[test]
    fn test_retriable_statuses() {
        assert!(is_retriable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retriable(StatusCode::BAD_GATEWAY));
        assert!(!is_retriable(StatusCode::UNAUTHORIZED));
        assert!(!is_retriable(StatusCode::BAD_REQUEST));
    }
}
