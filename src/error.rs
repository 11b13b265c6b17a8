use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// A required raw field is absent or unparseable
    #[error("Missing feature: {0}")]
    MissingFeature(String),

    /// A canonical row does not carry a column the fitted transform expects
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Fitted-model or catalog artifact is absent, unreadable or inconsistent
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The external track source failed (not found, rate limited, network)
    #[error("Track source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::SourceUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MissingFeature(_) | AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::SchemaMismatch(_)
            | AppError::DimensionMismatch { .. }
            | AppError::CorruptArtifact(_)
            | AppError::Cache(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
