//! Production backend over the qdrant gRPC API.
//!
//! One client per process, built at startup and shared through
//! `Arc<dyn VectorIndex>`. Every call runs under the configured deadline;
//! transport errors map to `ServiceUnavailable`, expiry to `Timeout`.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::config::QdrantConfig;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::{
    CreateCollection, Distance, PointStruct, SearchPoints, UpsertPoints, Vector, VectorParams,
    Vectors, VectorsConfig, WithPayloadSelector,
};
use qdrant_client::{Qdrant, QdrantError};
use tokio::time::timeout;
use tracing::warn;

use crate::config::QdrantSettings;
use crate::error::PipelineError;
use crate::store::{
    CollectionInfo, DistanceMetric, PointRecord, ScoredHit, VectorIndex,
};

const TEXT_KEY: &str = "text";

pub struct QdrantIndex {
    client: Qdrant,
    deadline: Duration,
}

impl QdrantIndex {
    pub fn connect(settings: &QdrantSettings) -> Result<Self, PipelineError> {
        let mut config = QdrantConfig::from_url(&settings.url);
        if let Some(key) = &settings.api_key {
            config = config.api_key(key.clone());
        }
        let client = config
            .build()
            .map_err(|e| PipelineError::ServiceUnavailable(format!("qdrant client: {e}")))?;
        Ok(Self {
            client,
            deadline: settings.timeout(),
        })
    }

    async fn with_deadline<T, F>(&self, op: &str, fut: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, QdrantError>>,
    {
        match timeout(self.deadline, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(op, error = %err, "qdrant call failed");
                Err(PipelineError::ServiceUnavailable(format!("{op}: {err}")))
            }
            Err(_) => Err(PipelineError::Timeout(format!(
                "qdrant {op} exceeded {}s",
                self.deadline.as_secs()
            ))),
        }
    }
}

fn to_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Euclidean => Distance::Euclid,
        DistanceMetric::Dot => Distance::Dot,
    }
}

fn from_distance(raw: i32) -> Option<DistanceMetric> {
    match Distance::try_from(raw).ok()? {
        Distance::Cosine => Some(DistanceMetric::Cosine),
        Distance::Euclid => Some(DistanceMetric::Euclidean),
        Distance::Dot => Some(DistanceMetric::Dot),
        _ => None,
    }
}

fn to_point(record: PointRecord) -> PointStruct {
    let mut payload = HashMap::with_capacity(record.metadata.len() + 1);
    payload.insert(TEXT_KEY.to_string(), record.text.into());
    for (key, value) in record.metadata {
        payload.insert(key, value.into());
    }

    PointStruct {
        id: Some(record.id.into()),
        vectors: Some(Vectors {
            vectors_options: Some(qdrant_client::qdrant::vectors::VectorsOptions::Vector(
                Vector {
                    data: record.vector,
                    ..Default::default()
                },
            )),
        }),
        payload,
    }
}

fn point_id_string(id: Option<qdrant_client::qdrant::PointId>) -> String {
    match id.and_then(|p| p.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool, PipelineError> {
        self.with_deadline("collection_exists", self.client.collection_exists(name))
            .await
    }

    async fn create_collection(
        &self,
        name: &str,
        dimension: u64,
        metric: DistanceMetric,
    ) -> Result<(), PipelineError> {
        let request = CreateCollection {
            collection_name: name.to_string(),
            vectors_config: Some(VectorsConfig {
                config: Some(Config::Params(VectorParams {
                    size: dimension,
                    distance: to_distance(metric).into(),
                    ..Default::default()
                })),
            }),
            ..Default::default()
        };
        self.with_deadline("create_collection", self.client.create_collection(request))
            .await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), PipelineError> {
        self.with_deadline("delete_collection", self.client.delete_collection(name))
            .await?;
        Ok(())
    }

    async fn describe_collection(
        &self,
        name: &str,
    ) -> Result<Option<CollectionInfo>, PipelineError> {
        if !self.collection_exists(name).await? {
            return Ok(None);
        }

        let response = self
            .with_deadline("collection_info", self.client.collection_info(name))
            .await?;

        let params = response
            .result
            .and_then(|info| info.config)
            .and_then(|config| config.params)
            .and_then(|params| params.vectors_config)
            .and_then(|vectors| vectors.config)
            .and_then(|config| match config {
                Config::Params(params) => Some(params),
                _ => None,
            })
            .ok_or_else(|| {
                PipelineError::ServiceUnavailable(format!(
                    "collection_info for `{name}` returned no vector params"
                ))
            })?;

        let metric = from_distance(params.distance).ok_or_else(|| {
            PipelineError::ServiceUnavailable(format!(
                "collection `{name}` uses an unsupported distance"
            ))
        })?;

        Ok(Some(CollectionInfo {
            dimension: params.size,
            metric,
        }))
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<PointRecord>,
    ) -> Result<(), PipelineError> {
        let request = UpsertPoints {
            collection_name: collection.to_string(),
            points: points.into_iter().map(to_point).collect(),
            wait: Some(true),
            ..Default::default()
        };
        self.with_deadline("upsert_points", self.client.upsert_points(request))
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<ScoredHit>, PipelineError> {
        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector,
            vector_name: None,
            limit: top_k,
            score_threshold: None,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(
                    qdrant_client::qdrant::with_payload_selector::SelectorOptions::Enable(true),
                ),
            }),
            filter: None,
            params: None,
            offset: None,
            with_vectors: None,
            read_consistency: None,
            shard_key_selector: None,
            sparse_indices: None,
            timeout: None,
        };

        let response = self
            .with_deadline("search_points", self.client.search_points(request))
            .await?;

        // Qdrant returns hits ranked best-first; keep its order untouched.
        let hits = response
            .result
            .into_iter()
            .map(|scored| {
                let mut metadata = HashMap::new();
                let mut text = String::new();
                for (key, value) in &scored.payload {
                    let Some(s) = value.as_str() else { continue };
                    if key == TEXT_KEY {
                        text = s.to_string();
                    } else {
                        metadata.insert(key.clone(), s.to_string());
                    }
                }
                ScoredHit {
                    id: point_id_string(scored.id),
                    score: scored.score,
                    text,
                    metadata,
                }
            })
            .collect();

        Ok(hits)
    }
}
