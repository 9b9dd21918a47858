//! Layered configuration: `docpipe.toml` (optional) overridden by
//! `DOCPIPE__`-prefixed environment variables, e.g.
//! `DOCPIPE__EMBEDDING__BACKEND=hosted`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::DistanceMetric;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub qdrant: QdrantSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    /// Optional generative synthesis collaborator. Absent means
    /// retrieve-and-synthesize requests are rejected.
    #[serde(default)]
    pub synthesis: Option<SynthesisSettings>,
}

impl AppConfig {
    /// Load configuration from `docpipe.toml` (if present) and environment.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("docpipe").required(false))
            .add_source(config::Environment::with_prefix("DOCPIPE").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
            enable_cors: default_true(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Embedding backend selection. `backend` is a closed enumerated value
/// ("local" | "hosted"); anything else fails at provider construction,
/// not at first use.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Fixed vector length of the local backend. The hosted backend's
    /// dimension is declared here too and verified against responses.
    #[serde(default = "default_dimension")]
    pub dimension: u64,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Full embeddings endpoint URL, required for the hosted backend.
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dimension: default_dimension(),
            model: default_embedding_model(),
            api_url: None,
            api_key: None,
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Vector index service endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QdrantSettings {
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Deadline for every index call (exists, create, upsert, search).
    #[serde(default = "default_index_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: None,
            timeout_secs: default_index_timeout_secs(),
        }
    }
}

impl QdrantSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ingestion defaults. `source_dir` is the fallback when a request does not
/// name one; processed files move to `archive_dir` after their upsert.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestSettings {
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    #[serde(default)]
    pub metric: DistanceMetric,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            archive_dir: default_archive_dir(),
            metric: DistanceMetric::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub top_k: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// Generative synthesis collaborator (chat-completions shaped endpoint).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthesisSettings {
    pub api_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_synthesis_model")]
    pub model: String,

    #[serde(default = "default_synthesis_timeout_secs")]
    pub timeout_secs: u64,
}

impl SynthesisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_backend() -> String {
    "local".to_string()
}

fn default_dimension() -> u64 {
    384
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embed_timeout_secs() -> u64 {
    30
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_index_timeout_secs() -> u64 {
    10
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("data/incoming")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("data/archive")
}

fn default_top_k() -> u64 {
    5
}

fn default_synthesis_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_synthesis_timeout_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.embedding.backend, "local");
        assert_eq!(cfg.embedding.dimension, 384);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.ingest.metric, DistanceMetric::Cosine);
        assert!(cfg.synthesis.is_none());
    }

    #[test]
    fn socket_addr_parses() {
        let settings = ServerSettings::default();
        let addr = settings.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: AppConfig = serde_json::from_value(json!({
            "embedding": {
                "backend": "hosted",
                "api_url": "https://api.openai.com/v1/embeddings",
                "dimension": 1536
            }
        }))
        .unwrap();
        assert_eq!(cfg.embedding.backend, "hosted");
        assert_eq!(cfg.embedding.dimension, 1536);
        assert_eq!(cfg.server.port, 8080);
    }
}
