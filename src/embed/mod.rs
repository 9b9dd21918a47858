//! Embedding providers.
//!
//! The backend is a closed set selected once from configuration; call sites
//! only ever see `Arc<dyn EmbeddingProvider>`. Adding a backend means adding
//! a variant here, never branching on config strings deeper in the pipeline.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EmbeddingSettings;
use crate::error::PipelineError;

mod hosted;
mod local;
mod normalize;

pub use hosted::HostedEmbedder;
pub use local::LocalEmbedder;

/// Produces a fixed-length vector for one text input.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fixed output length, known at configuration time. This is the value
    /// collections are created with.
    fn dimension(&self) -> u64;

    /// Empty or whitespace-only input fails with `InvalidInput`; it is
    /// never silently embedded as a zero vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}

/// Construct the configured backend. Unknown selectors fail here, at
/// startup, not at first use.
pub fn provider_from(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingProvider>, PipelineError> {
    if settings.dimension == 0 {
        return Err(PipelineError::InvalidInput(
            "embedding dimension must be a positive integer".into(),
        ));
    }
    match settings.backend.as_str() {
        "local" => Ok(Arc::new(LocalEmbedder::new(settings.dimension))),
        "hosted" => Ok(Arc::new(HostedEmbedder::new(settings)?)),
        other => Err(PipelineError::UnsupportedBackend(other.to_string())),
    }
}
