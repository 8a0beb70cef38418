// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::manager::DatabaseError;
use crate::database::models::UnknownVariant;
use crate::integrations::{identity::IdentityError, payment::PaymentError, storage::StorageError, email::EmailError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 422 Unprocessable Entity
    UnprocessableEntity(String),

    // 500 Internal Server Error; detail is only shown outside production
    InternalServerError {
        message: String,
        detail: Option<String>,
    },

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self, expose_detail: bool) -> Value {
        let mut body = json!({ "error": self.message() });

        if let ApiError::InternalServerError { detail: Some(detail), .. } = self {
            if expose_detail {
                body["message"] = json!(detail);
            }
        }

        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: None,
        }
    }

    pub fn internal_with_detail(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::InvalidInput(msg) => ApiError::bad_request(msg),
            DatabaseError::Sqlx(sqlx::Error::RowNotFound) => ApiError::not_found("Record not found"),
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::error!("Database pool timed out");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_with_detail("Database error occurred", sqlx_err)
            }
            DatabaseError::QueryError(msg) => {
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_with_detail("An error occurred while processing your request", msg)
            }
            DatabaseError::MigrationError(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

impl From<UnknownVariant> for ApiError {
    fn from(err: UnknownVariant) -> Self {
        ApiError::bad_request(format!("Invalid {}", err.kind))
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected { message, .. } => ApiError::bad_request(message),
            IdentityError::NotConfigured(what) => {
                tracing::error!("Identity provider not configured: {}", what);
                ApiError::service_unavailable("Authentication service unavailable")
            }
            other => {
                tracing::error!("Identity provider error: {}", other);
                ApiError::bad_gateway("Authentication service error")
            }
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Signature(reason) => {
                tracing::warn!("Webhook signature rejected: {}", reason);
                ApiError::bad_request("Webhook processing failed")
            }
            PaymentError::NotConfigured(what) => {
                tracing::error!("Payment processor not configured: {}", what);
                ApiError::service_unavailable("Payment service unavailable")
            }
            other => {
                tracing::error!("Payment processor error: {}", other);
                ApiError::bad_gateway("Payment service error")
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!("Object storage error: {}", err);
        match err {
            StorageError::NotConfigured(_) => ApiError::service_unavailable("Storage service unavailable"),
            other => ApiError::internal_with_detail("Failed to prepare download", other),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        tracing::error!("Email delivery error: {}", err);
        ApiError::bad_gateway("Email service error")
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        // Bodies over the configured limit surface here as a buffering failure
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge("Request body too large".to_string());
        }
        ApiError::unprocessable(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let expose_detail = !crate::is_production!();
        (self.status_code(), Json(self.to_json(expose_detail))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_error_string() {
        let err = ApiError::not_found("Template not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_json(true), json!({ "error": "Template not found" }));
    }

    #[test]
    fn internal_detail_only_when_exposed() {
        let err = ApiError::internal_with_detail("Failed to list templates", "relation does not exist");
        assert_eq!(err.to_json(false), json!({ "error": "Failed to list templates" }));
        assert_eq!(
            err.to_json(true),
            json!({ "error": "Failed to list templates", "message": "relation does not exist" })
        );
    }

    #[test]
    fn database_errors_map_to_statuses() {
        let not_found: ApiError = DatabaseError::NotFound("User not found".into()).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let conflict: ApiError = DatabaseError::Conflict("Category already exists".into()).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let missing_row: ApiError = DatabaseError::Sqlx(sqlx::Error::RowNotFound).into();
        assert_eq!(missing_row.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn bad_signature_is_bad_request() {
        let err: ApiError = PaymentError::Signature("no v1 entry".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Webhook processing failed");
    }
}
