use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

static EXPOSE_INTERNAL_ERRORS: OnceCell<bool> = OnceCell::new();

/// Sets whether 500 responses carry the underlying error text. Called once at startup;
/// later calls are ignored.
pub fn set_expose_internal_errors(expose: bool) {
    let _ = EXPOSE_INTERNAL_ERRORS.set(expose);
}

fn expose_internal_errors() -> bool {
    EXPOSE_INTERNAL_ERRORS.get().copied().unwrap_or(false)
}

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    /// HTTP status category
    pub error: String,
    /// Stable machine-readable error code
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Field-level validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation failed")]
    InvalidFields(Vec<String>),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication required")]
    MissingToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Document error: {0}")]
    DocumentError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidFields(field_messages(&err))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::StorageError(err.to_string())
    }
}

/// Flattens validator output into `field: message` strings.
pub fn field_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value ({})", error.code));
                format!("{}: {}", field, message)
            })
        })
        .collect();
    messages.sort();
    messages
}

impl ServiceError {
    /// Maps a unique-index violation to `Conflict`, everything else to `DatabaseError`.
    pub fn from_db_conflict(err: DbErr, conflict_message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                ServiceError::Conflict(conflict_message.into())
            }
            _ => ServiceError::DatabaseError(err),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidFields(_)
            | Self::InvalidStatus(_)
            | Self::InvalidOperation(_)
            | Self::BadRequest(_)
            | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::MissingToken | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidToken(_) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::StorageError(_)
            | Self::DocumentError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code clients can branch on.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) | Self::InvalidFields(_) => "validation_error",
            Self::InvalidStatus(_) | Self::InvalidOperation(_) => "invalid_state",
            Self::BadRequest(_) => "bad_request",
            Self::Conflict(_) => "conflict",
            Self::MissingToken => "auth_missing",
            Self::Unauthorized(_) => "auth_invalid_credentials",
            Self::InvalidToken(_) => "auth_invalid_token",
            Self::Forbidden(_) => "forbidden",
            Self::RateLimitExceeded => "rate_limited",
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::StorageError(_)
            | Self::DocumentError(_)
            | Self::InternalError(_)
            | Self::Other(_) => "internal_error",
        }
    }

    /// Message suitable for HTTP responses. Server-side failures are generic unless the
    /// process runs in development.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::StorageError(_)
            | Self::DocumentError(_)
            | Self::InternalError(_)
            | Self::Other(_) => {
                if expose_internal_errors() {
                    self.to_string()
                } else {
                    "Internal server error".to_string()
                }
            }
            Self::NotFound(msg)
            | Self::ValidationError(msg)
            | Self::InvalidStatus(msg)
            | Self::InvalidOperation(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::Unauthorized(msg)
            | Self::InvalidToken(msg)
            | Self::Forbidden(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let errors = match &self {
            Self::InvalidFields(fields) => Some(fields.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.error_code().to_string(),
            message: self.response_message(),
            errors,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("Booking 42 not found".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.code, "not_found");
        assert_eq!(payload.message, "Booking 42 not found");
        assert!(!payload.success);
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::MissingToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::InvalidToken("expired".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::RateLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ServiceError::StorageError("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_stay_hidden_by_default() {
        assert_eq!(
            ServiceError::HashError("argon2 params".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::ValidationError("phone is invalid".into()).response_message(),
            "phone is invalid"
        );
    }

    #[tokio::test]
    async fn field_errors_are_listed() {
        let response = ServiceError::InvalidFields(vec!["email: must be a valid email".into()])
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, "validation_error");
        assert_eq!(
            payload.errors,
            Some(vec!["email: must be a valid email".to_string()])
        );
    }
}
