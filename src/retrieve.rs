//! Retrieval pipeline: query → embedding → top-K similarity search →
//! optional generative synthesis.
//!
//! Querying never creates collections; an unknown collection name is a
//! reportable condition, because auto-creating it at query time would mask
//! a configuration error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RetrievalSettings;
use crate::embed::EmbeddingProvider;
use crate::error::PipelineError;
use crate::store::{CollectionManager, ScoredHit, VectorIndex};
use crate::synthesis::Synthesizer;

/// Whether to return the ranked hits as-is or feed them through the
/// generative synthesis collaborator as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalMode {
    #[default]
    RetrieveOnly,
    RetrieveAndSynthesize,
}

/// Ranked hits, score-descending in the index's own stable order, plus the
/// synthesized answer when one was requested.
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    pub hits: Vec<ScoredHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Clone)]
pub struct RetrievalPipeline {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    manager: CollectionManager,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    settings: RetrievalSettings,
}

impl RetrievalPipeline {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        synthesizer: Option<Arc<dyn Synthesizer>>,
        settings: RetrievalSettings,
    ) -> Self {
        let manager = CollectionManager::new(index.clone());
        Self {
            index,
            embedder,
            manager,
            synthesizer,
            settings,
        }
    }

    /// Answer `query` against `collection`. `top_k` falls back to the
    /// configured default when absent.
    pub async fn run(
        &self,
        collection: &str,
        query: &str,
        mode: RetrievalMode,
        top_k: Option<u64>,
    ) -> Result<QueryOutcome, PipelineError> {
        let info = self
            .manager
            .describe(collection)
            .await?
            .ok_or_else(|| PipelineError::CollectionNotFound(collection.to_string()))?;

        let vector = self.embedder.embed(query).await?;

        let actual = vector.len() as u64;
        if actual != info.dimension {
            return Err(PipelineError::DimensionMismatch {
                collection: collection.to_string(),
                expected: info.dimension,
                actual,
            });
        }

        let top_k = top_k.unwrap_or(self.settings.top_k);
        let hits = self.index.search(collection, vector, top_k).await?;
        info!(collection, hits = hits.len(), top_k, "search complete");

        let answer = match mode {
            RetrievalMode::RetrieveOnly => None,
            RetrievalMode::RetrieveAndSynthesize => {
                let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
                    PipelineError::Synthesis("no synthesis backend configured".into())
                })?;
                let contexts: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
                Some(synthesizer.synthesize(query, &contexts).await?)
            }
        };

        Ok(QueryOutcome { hits, answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingSettings, IngestSettings};
    use crate::embed::provider_from;
    use crate::store::{DistanceMetric, MemoryIndex};
    use async_trait::async_trait;

    struct CannedSynthesizer;

    #[async_trait]
    impl Synthesizer for CannedSynthesizer {
        async fn synthesize(
            &self,
            query: &str,
            contexts: &[String],
        ) -> Result<String, PipelineError> {
            Ok(format!("{} docs about: {query}", contexts.len()))
        }
    }

    fn pipeline(
        index: Arc<MemoryIndex>,
        synthesizer: Option<Arc<dyn Synthesizer>>,
    ) -> RetrievalPipeline {
        let embedder = provider_from(&EmbeddingSettings {
            dimension: 16,
            ..Default::default()
        })
        .unwrap();
        RetrievalPipeline::new(index, embedder, synthesizer, RetrievalSettings::default())
    }

    #[tokio::test]
    async fn unknown_collection_is_not_created() {
        let index = Arc::new(MemoryIndex::new());
        let retrieval = pipeline(index.clone(), None);
        let err = retrieval
            .run("ghost", "anything", RetrievalMode::RetrieveOnly, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::CollectionNotFound(_)));
        assert!(!index.collection_exists("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn dimension_mismatch_fails_before_search() {
        let index = Arc::new(MemoryIndex::new());
        index
            .create_collection("docs", 8, DistanceMetric::Cosine)
            .await
            .unwrap();
        // Provider dimension is 16, collection declares 8.
        let retrieval = pipeline(index, None);
        let err = retrieval
            .run("docs", "query", RetrievalMode::RetrieveOnly, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: 8,
                actual: 16,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn synthesize_without_backend_is_an_error() {
        let index = Arc::new(MemoryIndex::new());
        index
            .create_collection("docs", 16, DistanceMetric::Cosine)
            .await
            .unwrap();
        let retrieval = pipeline(index, None);
        let err = retrieval
            .run("docs", "query", RetrievalMode::RetrieveAndSynthesize, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Synthesis(_)));
    }

    #[tokio::test]
    async fn synthesis_attaches_answer_alongside_hits() {
        let index = Arc::new(MemoryIndex::new());
        let embedder = provider_from(&EmbeddingSettings {
            dimension: 16,
            ..Default::default()
        })
        .unwrap();
        let ingestion = crate::ingest::IngestionPipeline::new(
            index.clone(),
            embedder,
            IngestSettings {
                archive_dir: tempfile::tempdir().unwrap().keep(),
                ..Default::default()
            },
        );
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), "alpha fund invests in devtools").unwrap();
        ingestion.run(source.path(), "docs").await.unwrap();

        let retrieval = pipeline(index, Some(Arc::new(CannedSynthesizer)));
        let outcome = retrieval
            .run(
                "docs",
                "who invests in devtools",
                RetrievalMode::RetrieveAndSynthesize,
                None,
            )
            .await
            .unwrap();
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(
            outcome.answer.as_deref(),
            Some("1 docs about: who invests in devtools")
        );
    }

    #[test]
    fn mode_serde_uses_kebab_case() {
        assert_eq!(
            serde_json::from_str::<RetrievalMode>("\"retrieve-and-synthesize\"").unwrap(),
            RetrievalMode::RetrieveAndSynthesize
        );
        assert_eq!(
            serde_json::to_string(&RetrievalMode::RetrieveOnly).unwrap(),
            "\"retrieve-only\""
        );
    }
}
