//! Error types for the document management module

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for document management operations
pub type EdmsResult<T> = Result<T, EdmsError>;

/// Document management error types
#[derive(Debug, Error)]
pub enum EdmsError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Revision not found: {0}")]
    RevisionNotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Resource not found: {resource_type} {resource_id}")]
    ResourceNotFound {
        resource_type: String,
        resource_id: String,
    },

    /// The revision exists but the caller may not act on it at this step.
    /// Rendered as a 404 so the review's existence is not disclosed.
    #[error("No review available for {document_key}")]
    ReviewNotAvailable { document_key: String },

    #[error("Revision is not under review")]
    NotUnderReview,

    #[error("Review already started on revision {revision_id}")]
    ReviewAlreadyStarted { revision_id: i64 },

    #[error("Review of revision {revision_id} is closed")]
    ReviewClosed { revision_id: i64 },

    #[error("Review sequence error: {0}")]
    ReviewSequence(String),

    #[error("Document already exists: {0}")]
    DocumentExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("No revisions provided for the transmittal")]
    MissingRevisions,

    #[error("Invalid revisions for the transmittal: {0}")]
    InvalidRevisions(String),

    #[error("Invalid CSV data: {0}")]
    InvalidCsv(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Search index error: {0}")]
    SearchIndex(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for EdmsError {
    fn from(err: sqlx::Error) -> Self {
        EdmsError::Database(err.to_string())
    }
}

impl From<std::io::Error> for EdmsError {
    fn from(err: std::io::Error) -> Self {
        EdmsError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EdmsError {
    fn from(err: serde_json::Error) -> Self {
        EdmsError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for EdmsError {
    fn from(err: csv::Error) -> Self {
        EdmsError::InvalidCsv(err.to_string())
    }
}

impl From<reqwest::Error> for EdmsError {
    fn from(err: reqwest::Error) -> Self {
        EdmsError::SearchIndex(err.to_string())
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EdmsError {
    /// Convert to API error code
    pub fn code(&self) -> &'static str {
        match self {
            EdmsError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            EdmsError::RevisionNotFound(_) => "REVISION_NOT_FOUND",
            EdmsError::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            EdmsError::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            EdmsError::ReviewNotAvailable { .. } => "REVIEW_NOT_AVAILABLE",
            EdmsError::NotUnderReview => "NOT_UNDER_REVIEW",
            EdmsError::ReviewAlreadyStarted { .. } => "REVIEW_ALREADY_STARTED",
            EdmsError::ReviewClosed { .. } => "REVIEW_CLOSED",
            EdmsError::ReviewSequence(_) => "REVIEW_SEQUENCE_ERROR",
            EdmsError::DocumentExists(_) => "DOCUMENT_EXISTS",
            EdmsError::Conflict(_) => "CONFLICT",
            EdmsError::MissingRevisions => "MISSING_REVISIONS",
            EdmsError::InvalidRevisions(_) => "INVALID_REVISIONS",
            EdmsError::InvalidCsv(_) => "INVALID_CSV",
            EdmsError::Validation(_) => "VALIDATION_ERROR",
            EdmsError::SearchIndex(_) => "SEARCH_INDEX_ERROR",
            EdmsError::Database(_) => "DATABASE_ERROR",
            EdmsError::Io(_) => "IO_ERROR",
            EdmsError::Serialization(_) => "SERIALIZATION_ERROR",
            EdmsError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            EdmsError::DocumentNotFound(_)
            | EdmsError::RevisionNotFound(_)
            | EdmsError::CategoryNotFound(_)
            | EdmsError::ResourceNotFound { .. }
            | EdmsError::ReviewNotAvailable { .. }
            | EdmsError::NotUnderReview => StatusCode::NOT_FOUND,

            EdmsError::ReviewAlreadyStarted { .. }
            | EdmsError::ReviewClosed { .. }
            | EdmsError::ReviewSequence(_)
            | EdmsError::DocumentExists(_)
            | EdmsError::Conflict(_) => StatusCode::CONFLICT,

            EdmsError::MissingRevisions
            | EdmsError::InvalidRevisions(_)
            | EdmsError::InvalidCsv(_)
            | EdmsError::Validation(_) => StatusCode::BAD_REQUEST,

            EdmsError::SearchIndex(_)
            | EdmsError::Database(_)
            | EdmsError::Io(_)
            | EdmsError::Serialization(_)
            | EdmsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EdmsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        }
        let body = ApiError {
            code: self.code().to_string(),
            message: self.to_string(),
            details: None,
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_access_errors_are_not_found() {
        let err = EdmsError::ReviewNotAvailable {
            document_key: "FAC09001-FWF-000-HSE-REP-0004".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(EdmsError::NotUnderReview.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_sequence_errors_conflict() {
        let err = EdmsError::ReviewSequence("leader step before reviewers step".to_string());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "REVIEW_SEQUENCE_ERROR");
    }

    #[test]
    fn test_transmittal_validation_is_bad_request() {
        assert_eq!(
            EdmsError::MissingRevisions.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EdmsError::InvalidRevisions("42".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
