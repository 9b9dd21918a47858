//! Generative synthesis collaborator.
//!
//! Retrieval only knows the [`Synthesizer`] capability; the shipped
//! implementation talks to an OpenAI-compatible chat-completions endpoint
//! and grounds the model on the retrieved document texts.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::SynthesisSettings;
use crate::error::PipelineError;

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Produce a natural-language answer for `query` from `contexts`.
    async fn synthesize(&self, query: &str, contexts: &[String])
        -> Result<String, PipelineError>;
}

pub struct HostedSynthesizer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl HostedSynthesizer {
    pub fn new(settings: &SynthesisSettings) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| PipelineError::Synthesis(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl Synthesizer for HostedSynthesizer {
    async fn synthesize(
        &self,
        query: &str,
        contexts: &[String],
    ) -> Result<String, PipelineError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "Answer the user's question using only the provided context documents. \
                                If the context does not contain the answer, say so."
                },
                {
                    "role": "user",
                    "content": build_prompt(query, contexts)
                }
            ]
        });

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::Timeout(format!("synthesis call to {}", self.url))
            } else {
                PipelineError::Synthesis(format!("request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Synthesis(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Synthesis(format!("invalid JSON: {e}")))?;
        parse_answer(&body)
    }
}

fn build_prompt(query: &str, contexts: &[String]) -> String {
    let mut prompt = String::from("Context documents:\n");
    for (i, context) in contexts.iter().enumerate() {
        prompt.push_str(&format!("--- document {} ---\n{context}\n", i + 1));
    }
    prompt.push_str("\nQuestion: ");
    prompt.push_str(query);
    prompt
}

fn parse_answer(body: &Value) -> Result<String, PipelineError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PipelineError::Synthesis("response contained no message content".into())
        })
}
