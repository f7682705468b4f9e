//! HTTP error mapping for API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keyvault_core::{AppError, StoreErrorCode};
use serde_json::json;

/// Error response carrying a status and a `{"code", "message"}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error whose code is one of the document-store codes.
    pub fn store(code: StoreErrorCode, message: impl Into<String>) -> Self {
        let status = match code {
            StoreErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            StoreErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            StoreErrorCode::NotFound => StatusCode::NOT_FOUND,
            StoreErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            StoreErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            StoreErrorCode::Internal | StoreErrorCode::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, code.as_str(), message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::store(StoreErrorCode::InvalidArgument, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::store(StoreErrorCode::PermissionDenied, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::store(StoreErrorCode::NotFound, message)
    }
}

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => Self::invalid_argument(msg),
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                Self::store(StoreErrorCode::Unavailable, "Database unavailable")
            }
            other => {
                tracing::error!("Internal error: {:?}", other);
                Self::store(StoreErrorCode::Internal, "Internal server error")
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "code": self.code, "message": self.message }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::HttpError;
    use axum::http::StatusCode;
    use keyvault_core::AppError;

    #[test]
    fn app_errors_map_to_store_codes() {
        let cases = [
            (
                AppError::BadRequest("bad".to_string()),
                StatusCode::BAD_REQUEST,
                "invalid-argument",
            ),
            (
                AppError::StorageMessage("disk".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];
        for (err, status, code) in cases {
            let mapped = HttpError::from(err);
            assert_eq!(mapped.status, status);
            assert_eq!(mapped.code, code);
        }
    }
}
