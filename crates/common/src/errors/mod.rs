//! Error types for CiteRank services
//!
//! Every failure maps to:
//! - a stable machine-readable [`ErrorCode`] with a numeric code
//! - an HTTP status
//! - a JSON body `{"error": {code, numeric_code, message, field?}}`
//!
//! Expansion exhaustion, unknown paper references and empty citation graphs
//! have no variant here. They are normal outcomes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error identifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request errors (1xxx)
    ValidationError,

    // Collaborator errors (8xxx)
    UpstreamError,
    EmbeddingError,
    CollaboratorUnavailable,
    CollaboratorTimeout,
    EmbeddingRejected,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::CollaboratorUnavailable => 8003,
            ErrorCode::CollaboratorTimeout => 8004,
            ErrorCode::EmbeddingRejected => 8005,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad request parameters
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    /// The embedding endpoint refused the request itself (bad key, bad model)
    #[error("Embedding request rejected with status {status}: {message}")]
    EmbeddingRejected { status: u16, message: String },

    /// Similarity search or citation source refused or failed the call
    #[error("{service} unavailable: {message}")]
    CollaboratorUnavailable { service: String, message: String },

    #[error("{service} timed out after {timeout_ms}ms")]
    CollaboratorTimeout { service: String, timeout_ms: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::EmbeddingRejected { .. } => ErrorCode::EmbeddingRejected,
            AppError::CollaboratorUnavailable { .. } => ErrorCode::CollaboratorUnavailable,
            AppError::CollaboratorTimeout { .. } => ErrorCode::CollaboratorTimeout,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } | AppError::Other(_) => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::UpstreamError | ErrorCode::EmbeddingError | ErrorCode::EmbeddingRejected => {
                StatusCode::BAD_GATEWAY
            }
            ErrorCode::CollaboratorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::CollaboratorTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::InternalError
            | ErrorCode::ConfigurationError
            | ErrorCode::SerializationError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Whether a retry against the same collaborator could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::CollaboratorUnavailable { .. }
                | AppError::CollaboratorTimeout { .. }
                | AppError::HttpClient(_)
                | AppError::EmbeddingError { .. }
        )
    }

    fn field(&self) -> Option<String> {
        match self {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub numeric_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(error = %message, code = ?code, status = status.as_u16(), "Server error");
        } else {
            tracing::warn!(error = %message, code = ?code, status = status.as_u16(), "Client error");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                numeric_code: code.as_code(),
                message,
                field: self.field(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal { message: err.to_string() }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_unavailable_mapping() {
        let err = AppError::CollaboratorUnavailable {
            service: "vector-store".into(),
            message: "connection refused".into(),
        };
        assert_eq!(err.code(), ErrorCode::CollaboratorUnavailable);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code().as_code(), 8003);
        assert!(err.is_transient());
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "query must not be empty".into(),
            field: Some("query".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());
        assert!(!err.is_transient());
        assert_eq!(err.field().as_deref(), Some("query"));
    }

    #[test]
    fn test_timeout_is_transient_server_error() {
        let err = AppError::CollaboratorTimeout {
            service: "vector-store".into(),
            timeout_ms: 5000,
        };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.is_server_error());
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "vector-store timed out after 5000ms");
    }

    #[test]
    fn test_rejected_embedding_is_permanent() {
        let err = AppError::EmbeddingRejected { status: 401, message: "invalid api key".into() };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code().as_code(), 8005);
        assert!(!err.is_transient());

        let err = AppError::EmbeddingError { message: "API error 503".into() };
        assert!(err.is_transient());
    }

    #[test]
    fn test_internal_errors_are_not_retried() {
        let err = AppError::Internal { message: "index corrupt".into() };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_transient());

        let err = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_error_codes_are_stable() {
        let code = serde_json::to_value(ErrorCode::CollaboratorTimeout).unwrap();
        assert_eq!(code, "COLLABORATOR_TIMEOUT");
    }

    #[tokio::test]
    async fn test_response_body() {
        let response = AppError::Validation {
            message: "bad mode".into(),
            field: Some("mode".into()),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, ErrorCode::ValidationError);
        assert_eq!(body.error.numeric_code, 1001);
        assert_eq!(body.error.field.as_deref(), Some("mode"));
    }
}
