use std::path::PathBuf;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ingest::IngestionSummary;
use crate::retrieve::RetrievalMode;
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::store::ScoredHit;

/// Request to ingest a directory of scraped documents into a collection.
#[derive(Debug, Deserialize)]
pub struct ProcessDocumentsRequest {
    /// Directory to read from; falls back to the configured source dir.
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    #[serde(default = "default_collection")]
    pub collection: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessDocumentsResponse {
    /// "success", "partial" (some documents failed), or "empty"
    /// (nothing to do).
    pub status: String,
    pub collection: String,
    #[serde(flatten)]
    pub summary: IngestionSummary,
}

/// Request to query a collection.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default = "default_collection")]
    pub collection: String,

    pub query: String,

    #[serde(default)]
    pub top_k: Option<u64>,

    #[serde(default)]
    pub mode: RetrievalMode,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub collection: String,
    pub hits: Vec<ScoredHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

fn default_collection() -> String {
    "default".to_string()
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /documents/process` — run one ingestion batch.
pub async fn process_documents(
    State(state): State<AppState>,
    Json(request): Json<ProcessDocumentsRequest>,
) -> ApiResult<impl IntoResponse> {
    let source_dir = request
        .source_dir
        .unwrap_or_else(|| state.config.ingest.source_dir.clone());

    let summary = state.ingestion.run(&source_dir, &request.collection).await?;

    let status = if summary.succeeded == 0 && summary.failed == 0 {
        "empty"
    } else if summary.failed > 0 {
        "partial"
    } else {
        "success"
    };

    Ok(Json(ProcessDocumentsResponse {
        status: status.to_string(),
        collection: request.collection,
        summary,
    }))
}

/// `POST /search` — retrieve (and optionally synthesize) against a
/// collection.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }

    let outcome = state
        .retrieval
        .run(
            &request.collection,
            &request.query,
            request.mode,
            request.top_k,
        )
        .await?;

    Ok(Json(SearchResponse {
        collection: request.collection,
        hits: outcome.hits,
        answer: outcome.answer,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_request_defaults() {
        let request: ProcessDocumentsRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.collection, "default");
        assert!(request.source_dir.is_none());
    }

    #[test]
    fn search_request_defaults() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "who invests in fintech?"}"#).unwrap();
        assert_eq!(request.collection, "default");
        assert_eq!(request.mode, RetrievalMode::RetrieveOnly);
        assert!(request.top_k.is_none());
    }

    #[test]
    fn search_request_accepts_synthesize_mode() {
        let request: SearchRequest = serde_json::from_str(
            r#"{"query": "q", "collection": "techdocs", "mode": "retrieve-and-synthesize", "top_k": 3}"#,
        )
        .unwrap();
        assert_eq!(request.mode, RetrievalMode::RetrieveAndSynthesize);
        assert_eq!(request.top_k, Some(3));
        assert_eq!(request.collection, "techdocs");
    }
}
