use std::fmt::Display;

use http::StatusCode;
use thiserror::Error;

use crate::core::schema::{SchemaError, SchemaErrors};

/// Result alias used by routing, hooks and verb operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Every way a request can fail inside the router and the dispatch contract.
///
/// Errors propagate untouched up to [`ApiResponse::from_result`](crate::core::ApiResponse::from_result),
/// which is the single place that maps a kind to a status code and body.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// A path segment matched no child node and no parameter was pending.
    #[error("404 - {segment} not found in {path}")]
    NotFound { segment: String, path: String },

    /// The path resolved but no node along it has a registered handler.
    #[error("404 - no handler serves {path}")]
    NoHandler { path: String },

    /// The terminal handler has no operation for the dispatch method.
    #[error("Not implemented - {method}")]
    NotImplemented { method: String },

    /// The request body failed the endpoint's schema.
    #[error("Invalid request body")]
    Validation(SchemaErrors),

    /// The request body is not a JSON object.
    #[error("Malformed JSON body: {0}")]
    MalformedBody(String),

    /// An error raised by handler logic with an explicit status code.
    #[error("{message}")]
    Application { status: StatusCode, message: String },

    /// Anything else. The message is logged, never sent to the client.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Handler-raised error carrying its own status code.
    pub fn application(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Application {
            status,
            message: message.into(),
        }
    }

    pub fn internal(err: impl Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } | ApiError::NoHandler { .. } => StatusCode::NOT_FOUND,
            ApiError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Application { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the original message may be shown to the client: everything
    /// except server errors, and "not implemented" is shown too.
    pub fn is_exposed(&self) -> bool {
        let status = self.status();
        !status.is_server_error() || status == StatusCode::NOT_IMPLEMENTED
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::NotFound {
            segment: "404".into(),
            path: "/api/404".into(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "404 - 404 not found in /api/404");

        let not_implemented = ApiError::NotImplemented {
            method: "PATCH".into(),
        };
        assert_eq!(not_implemented.status(), StatusCode::NOT_IMPLEMENTED);
        assert!(not_implemented.is_exposed());

        assert_eq!(
            ApiError::Validation(SchemaErrors::default()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_exposure_rules() {
        assert!(ApiError::application(StatusCode::CONFLICT, "taken").is_exposed());
        assert!(ApiError::application(StatusCode::ACCEPTED, "queued").is_exposed());
        assert!(ApiError::application(StatusCode::SEE_OTHER, "moved").is_exposed());
        assert!(!ApiError::application(StatusCode::SERVICE_UNAVAILABLE, "db down").is_exposed());
        assert!(!ApiError::internal("boom").is_exposed());
    }

    #[test]
    fn test_schema_fault_is_internal() {
        let err: ApiError = SchemaError::UnknownType("na".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
