//! Custom error types for the API service
//!
//! [`ApiError`] is the single place where failures become HTTP responses.
//! Every error body has the shape
//! `{"success": false, "error": {"code", "message", "field"?}}`.

use auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::DatabaseError;
use common::models::InvalidEmployeeId;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad input, optionally naming the offending field
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is locked, try again later")]
    AccountLocked,

    #[error("Authentication token is missing")]
    TokenMissing,

    #[error("Authentication token has expired")]
    TokenExpired,

    #[error("Authentication token has been revoked")]
    TokenRevoked,

    #[error("Authentication token is invalid")]
    TokenInvalid,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// A uniqueness or sequencing conflict
    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
        field: Option<String>,
    },

    #[error("Too many attempts, slow down")]
    RateLimited,

    /// Internal server error; the detail is logged, never returned
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>, field: Option<&str>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("Insufficient permissions".to_string())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::AccountLocked => "ACCOUNT_LOCKED",
            ApiError::TokenMissing => "TOKEN_MISSING",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::TokenRevoked => "TOKEN_REVOKED",
            ApiError::TokenInvalid => "TOKEN_INVALID",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict { code, .. } => *code,
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Internal(_) | ApiError::Database(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::AccountLocked
            | ApiError::TokenMissing
            | ApiError::TokenExpired
            | ApiError::TokenRevoked
            | ApiError::TokenInvalid => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn field(&self) -> Option<&str> {
        match self {
            ApiError::Validation { field, .. } | ApiError::Conflict { field, .. } => {
                field.as_deref()
            }
            _ => None,
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict { field } => ApiError::Conflict {
                code: "CONFLICT",
                message: format!("A record with this {} already exists", field.replace('_', " ")),
                field: Some(field),
            },
            other => ApiError::Database(other),
        }
    }
}

impl From<InvalidEmployeeId> for ApiError {
    fn from(err: InvalidEmployeeId) -> Self {
        ApiError::invalid_field("employee_id", err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::AccountLocked => ApiError::AccountLocked,
            AuthError::TokenExpired => ApiError::TokenExpired,
            AuthError::TokenRevoked => ApiError::TokenRevoked,
            AuthError::TokenInvalid => ApiError::TokenInvalid,
            AuthError::RateLimited => ApiError::RateLimited,
            AuthError::Validation { field, message } => ApiError::invalid_field(field, message),
            AuthError::AccountNotFound => ApiError::not_found("Account"),
            AuthError::Database(db) => db.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "code": self.code(),
            "message": message,
        });
        if let Some(field) = self.field() {
            body["field"] = json!(field);
        }

        (status, Json(json!({ "success": false, "error": body }))).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_conflict_carries_field() {
        let (status, body) = body_of(DatabaseError::conflict("email").into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["field"], "email");
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let err: ApiError = DatabaseError::Decode("column role has bad value".into()).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_auth_errors_map_to_401_codes() {
        for (err, code) in [
            (AuthError::InvalidCredentials, "INVALID_CREDENTIALS"),
            (AuthError::AccountLocked, "ACCOUNT_LOCKED"),
            (AuthError::TokenExpired, "TOKEN_EXPIRED"),
            (AuthError::TokenRevoked, "TOKEN_REVOKED"),
            (AuthError::TokenInvalid, "TOKEN_INVALID"),
        ] {
            let (status, body) = body_of(err.into()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"]["code"], code);
        }

        let (status, _) = body_of(AuthError::RateLimited.into()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_validation_field_is_optional() {
        let (status, body) = body_of(ApiError::validation("bad date range")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].get("field").is_none());

        let (_, body) = body_of(ApiError::invalid_field("email", "Invalid email format")).await;
        assert_eq!(body["error"]["field"], "email");
    }
}
