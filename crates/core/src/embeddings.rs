//! Embedding adapters.
//!
//! Stored chunks are embedded with [`TaskType::RetrievalDocument`] and
//! questions with [`TaskType::RetrievalQuery`]; the provider may return
//! different vectors for the same text under the two tasks.

use crate::config::ProviderSettings;
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

const SNIPPET_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;

    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError>;
}

/// Embeds a chunk for storage. Failures are logged and reported as `None`
/// so the caller can drop the chunk and carry on.
pub async fn embed_for_ingestion<E>(embedder: &E, text: &str) -> Option<Vec<f32>>
where
    E: Embedder + ?Sized,
{
    match embedder.embed(text, TaskType::RetrievalDocument).await {
        Ok(vector) => Some(vector),
        Err(error) => {
            warn!(model = embedder.model(), %error, "embedding failed, chunk dropped");
            None
        }
    }
}

/// Client for the Generative Language `embedContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    client: reqwest::Client,
    model: String,
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Serialize)]
pub(crate) struct Content<'a> {
    pub(crate) parts: [Part<'a>; 1],
}

#[derive(Serialize)]
pub(crate) struct Part<'a> {
    pub(crate) text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ConfigError> {
        let model = qualified_model(&settings.embedding_model);
        let url = settings.endpoint(&format!("{model}:embedContent"));
        Ok(Self {
            client: settings.http_client()?,
            model,
            url,
        })
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError> {
        let started = Instant::now();
        let body = EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type: task,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        let response = ensure_success(response, &self.url).await?;
        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|error| ProviderError::Decode(format!("embedContent body: {error}")))?;

        let values = parse_embedding(parsed)?;
        debug!(
            model = %self.model,
            ?task,
            dimensions = values.len(),
            latency_ms = started.elapsed().as_millis(),
            "embedded text"
        );
        Ok(values)
    }
}

fn parse_embedding(response: EmbedContentResponse) -> Result<Vec<f32>, ProviderError> {
    match response.embedding {
        Some(embedding) if !embedding.values.is_empty() => Ok(embedding.values),
        _ => Err(ProviderError::Decode(
            "embedContent returned no embedding values".to_string(),
        )),
    }
}

/// Model names are sent as `models/<name>`.
pub(crate) fn qualified_model(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

pub(crate) async fn ensure_success(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        url: url.to_string(),
        status,
        snippet: body.chars().take(SNIPPET_CHARS).collect(),
    })
}

#[cfg(test)]
pub(crate) use test_support::HashingEmbedder;
