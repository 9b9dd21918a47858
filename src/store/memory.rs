//! In-process vector index used by tests and local development.
//!
//! Ranking mirrors the production backend: cosine and dot report similarity
//! and sort descending, euclidean reports distance and sorts ascending.
//! Ties keep insertion order (stable sort).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::store::{
    CollectionInfo, DistanceMetric, PointRecord, ScoredHit, VectorIndex,
};

struct MemCollection {
    info: CollectionInfo,
    /// Insertion-ordered; upsert replaces in place.
    points: Vec<PointRecord>,
}

#[derive(Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, MemCollection>>,
    /// Failure injection: when set, every call answers `ServiceUnavailable`,
    /// simulating an unreachable index service.
    unavailable: AtomicBool,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), PipelineError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PipelineError::ServiceUnavailable(
                "memory index marked unavailable".into(),
            ))
        } else {
            Ok(())
        }
    }

    /// Number of stored points, for test assertions.
    pub fn point_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .expect("lock poisoned")
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }
}

fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Dot => dot(a, b),
        DistanceMetric::Cosine => {
            let denom = norm(a) * norm(b);
            if denom == 0.0 {
                0.0
            } else {
                dot(a, b) / denom
            }
        }
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool, PipelineError> {
        self.check_available()?;
        Ok(self
            .collections
            .read()
            .expect("lock poisoned")
            .contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        dimension: u64,
        metric: DistanceMetric,
    ) -> Result<(), PipelineError> {
        self.check_available()?;
        let mut collections = self.collections.write().expect("lock poisoned");
        if collections.contains_key(name) {
            return Err(PipelineError::CollectionAlreadyExists(name.to_string()));
        }
        collections.insert(
            name.to_string(),
            MemCollection {
                info: CollectionInfo { dimension, metric },
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), PipelineError> {
        self.check_available()?;
        self.collections
            .write()
            .expect("lock poisoned")
            .remove(name);
        Ok(())
    }

    async fn describe_collection(
        &self,
        name: &str,
    ) -> Result<Option<CollectionInfo>, PipelineError> {
        self.check_available()?;
        Ok(self
            .collections
            .read()
            .expect("lock poisoned")
            .get(name)
            .map(|c| c.info))
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<PointRecord>,
    ) -> Result<(), PipelineError> {
        self.check_available()?;
        let mut collections = self.collections.write().expect("lock poisoned");
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| PipelineError::CollectionNotFound(collection.to_string()))?;

        for point in points {
            let actual = point.vector.len() as u64;
            if actual != entry.info.dimension {
                return Err(PipelineError::DimensionMismatch {
                    collection: collection.to_string(),
                    expected: entry.info.dimension,
                    actual,
                });
            }
            match entry.points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => entry.points.push(point),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<ScoredHit>, PipelineError> {
        self.check_available()?;
        let collections = self.collections.read().expect("lock poisoned");
        let entry = collections
            .get(collection)
            .ok_or_else(|| PipelineError::CollectionNotFound(collection.to_string()))?;

        if vector.len() as u64 != entry.info.dimension {
            return Err(PipelineError::DimensionMismatch {
                collection: collection.to_string(),
                expected: entry.info.dimension,
                actual: vector.len() as u64,
            });
        }

        let mut hits: Vec<ScoredHit> = entry
            .points
            .iter()
            .map(|p| ScoredHit {
                id: p.id.clone(),
                score: score(entry.info.metric, &vector, &p.vector),
                text: p.text.clone(),
                metadata: p.metadata.clone(),
            })
            .collect();

        match entry.info.metric {
            DistanceMetric::Euclidean => {
                hits.sort_by(|a, b| a.score.total_cmp(&b.score));
            }
            DistanceMetric::Cosine | DistanceMetric::Dot => {
                hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            }
        }
        hits.truncate(top_k as usize);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, vector: Vec<f32>) -> PointRecord {
        PointRecord {
            id: id.to_string(),
            vector,
            text: format!("text of {id}"),
            metadata: HashMap::new(),
        }
    }

    async fn seeded(metric: DistanceMetric) -> MemoryIndex {
        let index = MemoryIndex::new();
        index.create_collection("docs", 2, metric).await.unwrap();
        index
            .upsert(
                "docs",
                vec![
                    point("a", vec![1.0, 0.0]),
                    point("b", vec![0.0, 1.0]),
                    point("c", vec![0.7, 0.7]),
                ],
            )
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn cosine_ranks_closest_first() {
        let index = seeded(DistanceMetric::Cosine).await;
        let hits = index.search("docs", vec![1.0, 0.1], 10).await.unwrap();
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn euclidean_ranks_smallest_distance_first() {
        let index = seeded(DistanceMetric::Euclidean).await;
        let hits = index.search("docs", vec![0.0, 1.0], 2).await.unwrap();
        assert_eq!(hits[0].id, "b");
        assert_eq!(hits[0].score, 0.0);
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let index = seeded(DistanceMetric::Dot).await;
        index
            .upsert("docs", vec![point("a", vec![0.0, 2.0])])
            .await
            .unwrap();
        assert_eq!(index.point_count("docs"), 3);
        let hits = index.search("docs", vec![0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn upsert_enforces_dimension() {
        let index = seeded(DistanceMetric::Cosine).await;
        let err = index
            .upsert("docs", vec![point("d", vec![1.0, 2.0, 3.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn search_on_missing_collection_is_not_found() {
        let index = MemoryIndex::new();
        let err = index.search("ghost", vec![1.0], 5).await.unwrap_err();
        assert!(matches!(err, PipelineError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn unavailable_flag_poisons_every_call() {
        let index = seeded(DistanceMetric::Cosine).await;
        index.set_unavailable(true);
        let err = index.collection_exists("docs").await.unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable(_)));
        index.set_unavailable(false);
        assert!(index.collection_exists("docs").await.unwrap());
    }

    #[tokio::test]
    async fn ranking_is_deterministic_across_calls() {
        let index = seeded(DistanceMetric::Cosine).await;
        let first = index.search("docs", vec![0.5, 0.5], 10).await.unwrap();
        let second = index.search("docs", vec![0.5, 0.5], 10).await.unwrap();
        let ids: Vec<_> = first.iter().map(|h| h.id.as_str()).collect();
        let ids2: Vec<_> = second.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ids2);
    }
}
