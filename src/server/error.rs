use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(err) => match err {
                PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                PipelineError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
                PipelineError::CollectionAlreadyExists(_) => StatusCode::CONFLICT,
                PipelineError::DimensionMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                PipelineError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                PipelineError::EmbeddingBackend(_) | PipelineError::Synthesis(_) => {
                    StatusCode::BAD_GATEWAY
                }
                PipelineError::UnsupportedBackend(_)
                | PipelineError::ArchiveRelocation { .. }
                | PipelineError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Pipeline(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                PipelineError::CollectionNotFound("x".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                PipelineError::ServiceUnavailable("down".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PipelineError::Timeout("slow".into()).into(),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                PipelineError::InvalidInput("empty".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::DimensionMismatch {
                    collection: "x".into(),
                    expected: 1,
                    actual: 2,
                }
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::BadRequest("nope".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn envelope_carries_machine_readable_code() {
        let err: ApiError = PipelineError::CollectionNotFound("vc".into()).into();
        assert_eq!(err.code(), "COLLECTION_NOT_FOUND");
    }
}
