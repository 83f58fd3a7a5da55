//! HTTP response handling for errors

use super::types::WebhookError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

impl WebhookError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            WebhookError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            WebhookError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            WebhookError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            WebhookError::Jwt(_) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR"),
            WebhookError::Database(_) | WebhookError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            WebhookError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).json(self.error_body(None))
    }
}

impl WebhookError {
    /// JSON body sent to the client, tagged with the request it answers
    pub fn error_body(&self, request_id: Option<String>) -> ErrorResponse {
        let (_, error_code) = self.status_and_code();
        let message = match self {
            WebhookError::Database(_) | WebhookError::Storage(_) => {
                "Database operation failed".to_string()
            }
            WebhookError::Validation(_)
            | WebhookError::NotFound(_)
            | WebhookError::Unauthorized(_)
            | WebhookError::Jwt(_)
            | WebhookError::Config(_) => self.to_string(),
            _ => "An internal error occurred".to_string(),
        };

        ErrorResponse {
            error: ErrorDetail {
                code: error_code.to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp(),
                request_id,
            },
        }
    }
}

/// Standard error response format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: i64,
    pub request_id: Option<String>,
}
