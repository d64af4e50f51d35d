//! Caller-visible error kinds for the HTTP API.
//!
//! Only two conditions in the core are surfaced as failures: a missing
//! entity (profile or question) and a rejected write (question invariants).
//! AI unavailability and malformed model output are NOT errors; those paths
//! degrade to documented fallback values inside `logic`.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested profile/question does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request was well-formed JSON but violates a domain invariant.
    #[error("{0}")]
    ValidationFailed(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(ApiError::NotFound("question").to_string(), "question not found");
        let e = ApiError::ValidationFailed("Correct answer must be one of the options".into());
        assert_eq!(e.to_string(), "Correct answer must be one of the options");
    }
}
