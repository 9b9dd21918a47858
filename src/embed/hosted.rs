//! Hosted embedding backend: OpenAI-compatible `/embeddings` endpoint.
//!
//! One pooled HTTP client per provider instance. Responses are accepted in
//! the OpenAI `data[].embedding` shape as well as the bare
//! `{"embeddings": [[..]]}` shape some gateways return.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::EmbeddingSettings;
use crate::embed::EmbeddingProvider;
use crate::error::PipelineError;

pub struct HostedEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimension: u64,
}

impl HostedEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, PipelineError> {
        let url = settings.api_url.clone().ok_or_else(|| {
            PipelineError::UnsupportedBackend(
                "hosted backend requires embedding.api_url".into(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .connect_timeout(settings.timeout())
            .build()
            .map_err(|e| PipelineError::EmbeddingBackend(format!("http client: {e}")))?;

        Ok(Self {
            client,
            url,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            dimension: settings.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HostedEmbedder {
    fn dimension(&self) -> u64 {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "embedding input is empty or whitespace-only".into(),
            ));
        }

        let payload = json!({ "input": text, "model": self.model });
        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::Timeout(format!("embedding call to {}", self.url))
            } else {
                PipelineError::EmbeddingBackend(format!("request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "embedding endpoint returned error");
            return Err(PipelineError::EmbeddingBackend(format!(
                "HTTP {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::EmbeddingBackend(format!("invalid JSON: {e}")))?;

        let vector = parse_embedding(body)?;
        let actual = vector.len() as u64;
        if actual != self.dimension {
            return Err(PipelineError::EmbeddingBackend(format!(
                "backend returned {actual}-dimensional vector, configured dimension is {}",
                self.dimension
            )));
        }
        Ok(vector)
    }
}

/// Extract the first embedding vector from a response body.
fn parse_embedding(body: Value) -> Result<Vec<f32>, PipelineError> {
    let candidate = match body {
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("data") {
                items
                    .into_iter()
                    .next()
                    .and_then(|item| match item {
                        Value::Object(mut obj) => obj.remove("embedding"),
                        _ => None,
                    })
                    .ok_or_else(|| {
                        PipelineError::EmbeddingBackend(
                            "response `data` contained no embedding".into(),
                        )
                    })?
            } else if let Some(embeddings) = map.remove("embeddings") {
                match embeddings {
                    Value::Array(items) => items.into_iter().next().ok_or_else(|| {
                        PipelineError::EmbeddingBackend("response `embeddings` is empty".into())
                    })?,
                    other => other,
                }
            } else {
                return Err(PipelineError::EmbeddingBackend(
                    "unsupported response shape".into(),
                ));
            }
        }
        other => other,
    };

    parse_vector(candidate)
}

fn parse_vector(value: Value) -> Result<Vec<f32>, PipelineError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| {
                entry
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| {
                        PipelineError::EmbeddingBackend(
                            "embedding entries must be numbers".into(),
                        )
                    })
            })
            .collect(),
        _ => Err(PipelineError::EmbeddingBackend(
            "embedding vector must be an array".into(),
        )),
    }
}
