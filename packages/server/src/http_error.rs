//! HTTP error handling
//!
//! Every failed request answers with the same JSON body:
//! `{ "message": ..., "code": ..., "details"?: ... }`. The status is derived
//! from the machine-readable code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use numtree_core::NodeServiceError;
use serde::{Deserialize, Serialize};

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a new HTTP error with details
    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message, "UNAUTHORIZED")
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NODE_NOT_FOUND" | "PARENT_NOT_FOUND" | "TREE_NOT_FOUND" | "USER_NOT_FOUND" => {
                StatusCode::NOT_FOUND
            }
            "INVALID_OPERATION" | "VALIDATION_ERROR" | "INVALID_USERNAME" => {
                StatusCode::BAD_REQUEST
            }
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "USERNAME_TAKEN" => StatusCode::CONFLICT,
            "STORAGE_ERROR" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<NodeServiceError> for HttpError {
    fn from(err: NodeServiceError) -> Self {
        let code = match &err {
            NodeServiceError::InvalidOperation(_) => "INVALID_OPERATION",
            NodeServiceError::InvalidValue(_) => "VALIDATION_ERROR",
            NodeServiceError::ParentNotFound { .. } => "PARENT_NOT_FOUND",
            NodeServiceError::NodeNotFound { .. } => "NODE_NOT_FOUND",
            NodeServiceError::TreeNotFound { .. } => "TREE_NOT_FOUND",
            NodeServiceError::UserNotFound(_) => "USER_NOT_FOUND",
            NodeServiceError::UsernameTaken(_) => "USERNAME_TAKEN",
            NodeServiceError::InvalidUsername(_) => "INVALID_USERNAME",
            NodeServiceError::InvalidPassword(_) => "VALIDATION_ERROR",
            NodeServiceError::InvalidCredentials => "UNAUTHORIZED",
            NodeServiceError::PasswordHash(e) => {
                tracing::error!("❌ Password hashing failed: {}", e);
                return HttpError::new("Failed to process credentials", "INTERNAL_ERROR");
            }
            NodeServiceError::StorageError(e) => {
                tracing::error!("❌ Storage failure: {:?}", e);
                return HttpError::with_details(
                    "Storage is unavailable",
                    "STORAGE_ERROR",
                    e.to_string(),
                );
            }
        };

        HttpError::new(err.to_string(), code)
    }
}

/// Malformed or incomplete JSON bodies
impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::with_details(
            "Invalid request body",
            "VALIDATION_ERROR",
            rejection.body_text(),
        )
    }
}
