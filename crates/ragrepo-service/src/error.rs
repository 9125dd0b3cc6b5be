//! Maps `ragrepo_core::RagError` onto HTTP responses (spec §7, SPEC_FULL §7 table).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ragrepo_core::RagError;
use serde_json::json;

/// Newtype so `IntoResponse` can be implemented for a foreign error type
/// (orphan-rule workaround, not a behavioral wrapper).
pub struct AppError(pub RagError);

impl From<RagError> for AppError {
    fn from(e: RagError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, hint) = match &self.0 {
            RagError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            RagError::ForgeUnavailable(_) => (StatusCode::BAD_GATEWAY, None),
            RagError::VectorStoreCapacity(_) => (
                StatusCode::INSUFFICIENT_STORAGE,
                Some("the vector store is at its configured collection limit; raise PINECONE_MAX_INDEXES or free capacity"),
            ),
            RagError::ModelUnavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            RagError::OriginNotAllowed(_) => (StatusCode::FORBIDDEN, None),
            RagError::VectorStore(_) | RagError::Internal(_) | RagError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        tracing::warn!(error = %self.0, status = %status, "request failed");

        let mut body = json!({ "error": self.0.to_string() });
        if let Some(hint) = hint {
            body["hint"] = json!(hint);
        }

        (status, Json(body)).into_response()
    }
}
