use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or unverifiable caller identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Payment gateway declined or failed the charge
    #[error("Payment error: {0}")]
    Payment(String),

    /// Caller can see the project but lacks the role for the action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (or hidden from the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate creation or concurrent modification
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Valid input at the wrong lifecycle stage, or a policy violation
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// External collaborator unreachable or failing
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Tag carried by every [`AppError`]; callers branch on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Payment,
    Forbidden,
    NotFound,
    Conflict,
    BusinessRule,
    RateLimitExceeded,
    ServiceUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Payment => "payment",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::BusinessRule => "business_rule",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Internal => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Payment => StatusCode::PAYMENT_REQUIRED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::BusinessRule => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map an HTTP status returned by a peer service back to a kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::Validation,
            401 => Self::Unauthorized,
            402 => Self::Payment,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 => Self::BusinessRule,
            429 => Self::RateLimitExceeded,
            502..=504 => Self::ServiceUnavailable,
            _ => Self::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let kind = self.kind();
        let status_code = kind.status_code();

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "code": status_code.as_u16(),
                "kind": kind,
                "message": self.message(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Payment(_) => ErrorKind::Payment,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::BusinessRule(_) => ErrorKind::BusinessRule,
            AppError::RateLimitExceeded(_) => ErrorKind::RateLimitExceeded,
            AppError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            AppError::Database(_)
            | AppError::Configuration(_)
            | AppError::Json(_)
            | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// User-facing message without the kind prefix. Internal details are not exposed.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(m)
            | AppError::Unauthorized(m)
            | AppError::Payment(m)
            | AppError::Forbidden(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m)
            | AppError::BusinessRule(m)
            | AppError::RateLimitExceeded(m)
            | AppError::ServiceUnavailable(m) => m.clone(),
            AppError::Database(_)
            | AppError::Configuration(_)
            | AppError::Json(_)
            | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Rebuild an error from a kind and message, e.g. when decoding a peer service's error body.
    pub fn from_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match kind {
            ErrorKind::Validation => AppError::Validation(msg),
            ErrorKind::Unauthorized => AppError::Unauthorized(msg),
            ErrorKind::Payment => AppError::Payment(msg),
            ErrorKind::Forbidden => AppError::Forbidden(msg),
            ErrorKind::NotFound => AppError::NotFound(msg),
            ErrorKind::Conflict => AppError::Conflict(msg),
            ErrorKind::BusinessRule => AppError::BusinessRule(msg),
            ErrorKind::RateLimitExceeded => AppError::RateLimitExceeded(msg),
            ErrorKind::ServiceUnavailable => AppError::ServiceUnavailable(msg),
            ErrorKind::Internal => AppError::Internal(msg),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn business_rule(msg: impl Into<String>) -> Self {
        AppError::BusinessRule(msg.into())
    }

    pub fn payment(msg: impl Into<String>) -> Self {
        AppError::Payment(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        AppError::ServiceUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Translate a transport-level failure from an outbound HTTP call.
    pub fn from_transport(service: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::ServiceUnavailable(format!("{} timed out", service))
        } else if err.is_connect() {
            AppError::ServiceUnavailable(format!("{} is unreachable", service))
        } else if err.is_decode() {
            AppError::ServiceUnavailable(format!("{} returned an unreadable response", service))
        } else {
            AppError::ServiceUnavailable(format!("{} request failed", service))
        }
    }
}
