//! API error handling.

use crate::audio::ProxyError;
use crate::content::ContentError;
use crate::feed::{AggregateError, RegistryError};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Not found (404).
    NotFound,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

/// Error returned by every handler, rendered as
/// `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidUrl(_) | RegistryError::Duplicate(_) => {
                ApiError::bad_request(err.to_string())
            }
            RegistryError::Io(_) | RegistryError::Json(_) => {
                tracing::error!(error = %err, "Failed to save feed registry");
                ApiError::internal("Failed to save feeds")
            }
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match &err {
            ContentError::InvalidUrl(_) => ApiError::bad_request(err.to_string()),
            ContentError::Extraction => {
                tracing::warn!(error = %err, "Article extraction failed");
                ApiError::internal("Failed to parse article content")
            }
            _ => {
                tracing::warn!(error = %err, "Article fetch failed");
                ApiError::internal("Failed to fetch article")
            }
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        if err.is_client_error() {
            ApiError::bad_request(err.to_string())
        } else {
            ApiError::internal("Error proxying audio")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::bad_request("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": {"code": "BAD_REQUEST", "message": "nope"}})
        );
    }

    #[test]
    fn test_content_error_messages() {
        let err = ApiError::from(ContentError::Extraction);
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "Failed to parse article content");

        let err = ApiError::from(ContentError::Upstream(404));
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "Failed to fetch article");

        let err = ApiError::from(ContentError::InvalidUrl("x".into()));
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn test_proxy_error_mapping() {
        assert_eq!(
            ApiError::from(ProxyError::MissingUrl).code(),
            ErrorCode::BadRequest
        );
        assert_eq!(
            ApiError::from(ProxyError::InvalidEncoding).code(),
            ErrorCode::BadRequest
        );
    }

    #[test]
    fn test_registry_error_mapping() {
        let err = ApiError::from(RegistryError::Duplicate("https://a".into()));
        assert_eq!(err.code(), ErrorCode::BadRequest);

        let err = ApiError::from(RegistryError::Io(std::io::Error::other("disk")));
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.message(), "Failed to save feeds");
    }
}
