use std::sync::Arc;

use crate::config::AppConfig;
use crate::embed::EmbeddingProvider;
use crate::ingest::IngestionPipeline;
use crate::retrieve::RetrievalPipeline;
use crate::store::VectorIndex;
use crate::synthesis::Synthesizer;

/// Shared application state: config plus the two pipelines, both holding
/// the process-wide index and embedder handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ingestion: IngestionPipeline,
    pub retrieval: RetrievalPipeline,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        synthesizer: Option<Arc<dyn Synthesizer>>,
    ) -> Self {
        let ingestion =
            IngestionPipeline::new(index.clone(), embedder.clone(), config.ingest.clone());
        let retrieval = RetrievalPipeline::new(
            index,
            embedder,
            synthesizer,
            config.retrieval.clone(),
        );
        Self {
            config: Arc::new(config),
            ingestion,
            retrieval,
        }
    }
}
