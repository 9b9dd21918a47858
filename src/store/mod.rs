//! Vector index boundary.
//!
//! The pipelines never talk to a concrete index service; they hold an
//! `Arc<dyn VectorIndex>` constructed once at startup. [`qdrant::QdrantIndex`]
//! is the production backend, [`memory::MemoryIndex`] backs tests.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

mod collection;
mod memory;
mod qdrant;

pub use collection::CollectionManager;
pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

/// Distance metric for a collection, fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    Dot,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Dot => "dot",
        };
        f.write_str(name)
    }
}

/// Declared schema of an existing collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionInfo {
    pub dimension: u64,
    pub metric: DistanceMetric,
}

/// One vector plus its payload, keyed by a stable document id.
#[derive(Debug, Clone)]
pub struct PointRecord {
    pub id: String,
    pub vector: Vec<f32>,
    /// Original document text, stored alongside the vector so retrieval can
    /// hand context to synthesis without a second store.
    pub text: String,
    pub metadata: HashMap<String, String>,
}

/// One ranked search hit, best first in the backend's own order.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub metadata: HashMap<String, String>,
}

/// Client capability over the vector-index service.
///
/// Transport failures surface as `ServiceUnavailable`; "collection absent"
/// is a distinct, non-error answer from `collection_exists` /
/// `describe_collection`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn collection_exists(&self, name: &str) -> Result<bool, PipelineError>;

    async fn create_collection(
        &self,
        name: &str,
        dimension: u64,
        metric: DistanceMetric,
    ) -> Result<(), PipelineError>;

    async fn delete_collection(&self, name: &str) -> Result<(), PipelineError>;

    /// `Ok(None)` when the collection does not exist.
    async fn describe_collection(
        &self,
        name: &str,
    ) -> Result<Option<CollectionInfo>, PipelineError>;

    /// Insert-or-update by point id. Vectors whose length differs from the
    /// collection's declared dimension are rejected.
    async fn upsert(
        &self,
        collection: &str,
        points: Vec<PointRecord>,
    ) -> Result<(), PipelineError>;

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<ScoredHit>, PipelineError>;
}
