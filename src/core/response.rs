//! Mapping of dispatch outcomes to HTTP status codes and JSON bodies.
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::core::{
    error::{ApiError, ApiResult},
    schema::SchemaErrors,
};

pub const JSON_CONTENT_TYPE: &str = "application/json";

const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// Error body sent to clients.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    msg: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a SchemaErrors>,
}

/// A serialized API response. The content type is always JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn from_result(result: ApiResult<Value>) -> Self {
        match result {
            Ok(value) => Self::from_value(value),
            Err(err) => Self::from_error(&err),
        }
    }

    /// A string result is sent as-is; anything else is encoded as JSON text.
    pub fn from_value(value: Value) -> Self {
        let body = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn from_error(err: &ApiError) -> Self {
        let status = err.status();
        let message = err.to_string();

        if err.is_exposed() {
            tracing::info!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        }

        let body = ErrorBody {
            msg: if err.is_exposed() {
                &message
            } else {
                INTERNAL_MESSAGE
            },
            errors: match err {
                ApiError::Validation(errors) => Some(errors),
                _ => None,
            },
        };

        Self {
            status,
            body: serde_json::to_string(&body).unwrap_or_else(|_| {
                format!(r#"{{"msg":"{INTERNAL_MESSAGE}"}}"#)
            }),
        }
    }

    pub fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(response: &ApiResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[test]
    fn test_string_passes_through() {
        let response = ApiResponse::from_result(Ok(Value::from("List Houses")));
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "List Houses");
        assert_eq!(response.content_type(), "application/json");
    }

    #[test]
    fn test_value_is_encoded() {
        let response = ApiResponse::from_result(Ok(json!({"id": 1, "city": null})));
        assert_eq!(body(&response), json!({"id": 1, "city": null}));
    }

    #[test]
    fn test_validation_error_body() {
        let errors = SchemaErrors {
            missing: vec!["street".into()],
            invalid: vec![],
        };
        let response = ApiResponse::from_error(&ApiError::Validation(errors));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&response),
            json!({"msg": "Invalid request body", "errors": {"missing": ["street"]}})
        );
    }

    #[test]
    fn test_application_error_keeps_status() {
        let response = ApiResponse::from_error(&ApiError::application(
            StatusCode::NOT_FOUND,
            "House 12 not found",
        ));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(body(&response), json!({"msg": "House 12 not found"}));
    }

    #[test]
    fn test_non_error_application_status_keeps_message() {
        let response = ApiResponse::from_error(&ApiError::application(
            StatusCode::ACCEPTED,
            "moved elsewhere",
        ));
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(body(&response), json!({"msg": "moved elsewhere"}));

        let response = ApiResponse::from_error(&ApiError::application(
            StatusCode::MOVED_PERMANENTLY,
            "see /api/v2",
        ));
        assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(body(&response), json!({"msg": "see /api/v2"}));
    }

    #[test]
    fn test_not_implemented_message_is_exposed() {
        let response = ApiResponse::from_error(&ApiError::NotImplemented {
            method: "PATCH".into(),
        });
        assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body(&response), json!({"msg": "Not implemented - PATCH"}));
    }

    #[test]
    fn test_server_errors_are_masked() {
        let response = ApiResponse::from_error(&ApiError::internal("connection refused"));
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&response), json!({"msg": "Internal Server Error"}));

        let response = ApiResponse::from_error(&ApiError::application(
            StatusCode::BAD_GATEWAY,
            "upstream said no",
        ));
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(body(&response), json!({"msg": "Internal Server Error"}));
    }
}
