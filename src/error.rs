/// Application Error Handling
///
/// One error type per concern, folded into a single `AppError` that every
/// handler and session operation returns:
/// 1. Domain-specific error types (validation, database, auth, config)
/// 2. A unified `AppError` used for control flow
/// 3. HTTP response mapping with structured logging
/// 4. Per-operation error context

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

use crate::auth::{EntropyError, PasswordError, TokenError};

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(String),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(String, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(String, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(String),
    #[error("{0} contains suspicious content")]
    SuspiciousContent(String),
}

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Duplicate entry: {0}")]
    UniqueConstraintViolation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database connection error: {0}")]
    ConnectionPool(String),
    #[error("Database error: {0}")]
    UnexpectedError(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("record".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                DatabaseError::UniqueConstraintViolation(db_err.message().to_string())
            }
            pool @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
                DatabaseError::ConnectionPool(pool.to_string())
            }
            other => DatabaseError::UnexpectedError(other.to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Authentication and authorization errors
///
/// Every variant except `Forbidden` is reported to the client as the same
/// 401 body. The variant only shows up in server logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid token")]
    TokenInvalid,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Refresh token is unknown, expired or revoked")]
    RefreshTokenRejected,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Subject does not own the resource")]
    Forbidden,
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.into())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::EmptyInput => {
                AppError::Validation(ValidationError::EmptyField("password".to_string()))
            }
            PasswordError::TooLong(max) => {
                AppError::Validation(ValidationError::TooLong("password".to_string(), max))
            }
            PasswordError::Mismatch => AppError::Auth(AuthError::InvalidCredentials),
            PasswordError::Hashing(msg) => AppError::Internal(format!("password hashing: {}", msg)),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Auth(AuthError::TokenExpired),
            TokenError::BadSignature | TokenError::WrongAlgorithm | TokenError::Malformed(_) => {
                AppError::Auth(AuthError::TokenInvalid)
            }
            TokenError::MissingKey => {
                AppError::Config(ConfigError::MissingRequired("jwt.secret".to_string()))
            }
            TokenError::Signing(msg) => AppError::Internal(format!("token signing: {}", msg)),
        }
    }
}

impl From<EntropyError> for AppError {
    fn from(err: EntropyError) -> Self {
        AppError::Internal(err.to_string())
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (code, message) = match self {
            AppError::Validation(e) => ("VALIDATION_ERROR", e.to_string()),

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => {
                    ("DUPLICATE_ENTRY", "Resource already exists".to_string())
                }
                DatabaseError::NotFound(what) => ("NOT_FOUND", format!("{} not found", what)),
                DatabaseError::ConnectionPool(_) => (
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                ),
                DatabaseError::UnexpectedError(_) => {
                    ("DATABASE_ERROR", "Something went wrong".to_string())
                }
            },

            AppError::Auth(AuthError::Forbidden) => ("FORBIDDEN", "Forbidden".to_string()),
            AppError::Auth(_) => ("UNAUTHORIZED", "Unauthorized".to_string()),

            AppError::Config(_) => ("CONFIG_ERROR", "Something went wrong".to_string()),
            AppError::Internal(_) => ("INTERNAL_ERROR", "Something went wrong".to_string()),
        };

        let status = self.status_code();
        let body = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, body)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Database(e @ DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::warn!(request_id = request_id, error = %e, "Duplicate entry attempt");
            }
            AppError::Database(e @ DatabaseError::NotFound(_)) => {
                tracing::info!(request_id = request_id, error = %e, "Record not found");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, body) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
                DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
                DatabaseError::ConnectionPool(_) => StatusCode::SERVICE_UNAVAILABLE,
                DatabaseError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl ToString) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Log the error with this context attached, then hand it back for `?`.
    pub fn record(&self, error: AppError) -> AppError {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match &error {
            AppError::Validation(_) | AppError::Auth(_) => {
                tracing::warn!(error = %error, context = %context, "Operation rejected");
            }
            AppError::Database(DatabaseError::NotFound(_))
            | AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::info!(error = %error, context = %context, "Operation rejected");
            }
            _ => {
                tracing::error!(error = %error, context = %context, "Operation failed");
            }
        }

        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_every_unauthorized_cause_has_the_same_body() {
        let causes = [
            AuthError::InvalidCredentials,
            AuthError::MissingToken,
            AuthError::TokenInvalid,
            AuthError::TokenExpired,
            AuthError::RefreshTokenRejected,
            AuthError::InvalidApiKey,
        ];

        for cause in causes {
            let err = AppError::Auth(cause);
            let (status, body) = <AppError as ErrorHandler>::error_response(&err, "req-1");
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body.message, "Unauthorized");
            assert_eq!(body.code, "UNAUTHORIZED");
        }
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        let err = AppError::Auth(AuthError::Forbidden);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_missing_row_names_the_record_once() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        let (status, body) = <AppError as ErrorHandler>::error_response(&err, "req-1");

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "record not found");
    }

    #[test]
    fn test_password_error_conversion() {
        let err: AppError = PasswordError::EmptyInput.into();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyField(_))));

        let err: AppError = PasswordError::Mismatch.into();
        assert!(matches!(err, AppError::Auth(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_token_error_conversion() {
        let err: AppError = TokenError::Expired.into();
        assert!(matches!(err, AppError::Auth(AuthError::TokenExpired)));

        let err: AppError = TokenError::WrongAlgorithm.into();
        assert!(matches!(err, AppError::Auth(AuthError::TokenInvalid)));
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AppError::Internal("secret detail".to_string());
        let (status, body) = <AppError as ErrorHandler>::error_response(&err, "req-2");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("secret"));
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("test_operation");
        assert_eq!(ctx.operation, "test_operation");
        assert!(ctx.user_id.is_none());

        let ctx_with_user = ctx.with_user_id("user-123");
        assert_eq!(ctx_with_user.user_id, Some("user-123".to_string()));
    }
}
