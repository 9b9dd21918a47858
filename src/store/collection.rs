use std::sync::Arc;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::store::{CollectionInfo, DistanceMetric, VectorIndex};

/// Guarantees a named collection exists with the declared schema before any
/// vector operation touches it.
#[derive(Clone)]
pub struct CollectionManager {
    index: Arc<dyn VectorIndex>,
}

impl CollectionManager {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Whether `name` exists. A transport failure propagates as
    /// `ServiceUnavailable` and is never read as "does not exist".
    pub async fn exists(&self, name: &str) -> Result<bool, PipelineError> {
        self.index.collection_exists(name).await
    }

    pub async fn describe(&self, name: &str) -> Result<Option<CollectionInfo>, PipelineError> {
        self.index.describe_collection(name).await
    }

    /// Create `name`. Fails with `CollectionAlreadyExists` when it is
    /// already there, unless `recreate` is passed; recreation drops every
    /// stored vector and is therefore opt-in.
    pub async fn create(
        &self,
        name: &str,
        dimension: u64,
        metric: DistanceMetric,
        recreate: bool,
    ) -> Result<(), PipelineError> {
        if self.index.collection_exists(name).await? {
            if !recreate {
                return Err(PipelineError::CollectionAlreadyExists(name.to_string()));
            }
            info!(collection = name, "recreating collection, existing vectors dropped");
            self.index.delete_collection(name).await?;
        }
        self.index.create_collection(name, dimension, metric).await
    }

    /// Ensure `name` exists, creating it when absent. Safe under concurrent
    /// callers racing on the same new name: when our create attempt fails
    /// but the collection turns out to exist, a racing creator won and that
    /// is success.
    pub async fn ensure(
        &self,
        name: &str,
        dimension: u64,
        metric: DistanceMetric,
    ) -> Result<(), PipelineError> {
        if self.index.collection_exists(name).await? {
            debug!(collection = name, "collection present");
            return Ok(());
        }

        match self.index.create_collection(name, dimension, metric).await {
            Ok(()) => {
                info!(collection = name, %metric, dimension, "collection created");
                Ok(())
            }
            Err(err) => {
                if self.index.collection_exists(name).await? {
                    debug!(collection = name, "lost creation race, collection present");
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryIndex;

    fn manager() -> (Arc<MemoryIndex>, CollectionManager) {
        let index = Arc::new(MemoryIndex::new());
        let manager = CollectionManager::new(index.clone());
        (index, manager)
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let (_, manager) = manager();
        manager
            .ensure("docs", 4, DistanceMetric::Cosine)
            .await
            .unwrap();
        // Second call observes existence and never raises.
        manager
            .ensure("docs", 4, DistanceMetric::Cosine)
            .await
            .unwrap();
        assert!(manager.exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn create_refuses_existing_without_recreate() {
        let (_, manager) = manager();
        manager
            .create("docs", 4, DistanceMetric::Cosine, false)
            .await
            .unwrap();
        let err = manager
            .create("docs", 4, DistanceMetric::Cosine, false)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::CollectionAlreadyExists(_)));
    }

    #[tokio::test]
    async fn create_with_recreate_replaces_schema() {
        let (_, manager) = manager();
        manager
            .create("docs", 4, DistanceMetric::Cosine, false)
            .await
            .unwrap();
        manager
            .create("docs", 8, DistanceMetric::Dot, true)
            .await
            .unwrap();
        let info = manager.describe("docs").await.unwrap().unwrap();
        assert_eq!(info.dimension, 8);
        assert_eq!(info.metric, DistanceMetric::Dot);
    }

    #[tokio::test]
    async fn connectivity_failure_is_not_absence() {
        let (index, manager) = manager();
        index.set_unavailable(true);
        let err = manager.exists("docs").await.unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable(_)));
    }
}
