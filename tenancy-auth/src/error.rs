//! Error types for authentication operations

use thiserror::Error;

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// JWT token has expired
    #[error("Token has expired")]
    TokenExpired,

    /// JWT token is invalid (malformed, bad signature, wrong issuer, etc.)
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token is missing a required claim or carries an unusable one
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Rejected tokens are expected and are not server errors.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AuthError::Internal(_) | AuthError::ConfigError(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::TokenExpired | AuthError::InvalidToken(_) | AuthError::MissingClaim(_) => {
                401
            }
            AuthError::ConfigError(_) | AuthError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::MissingClaim(_) => "MISSING_CLAIM",
            AuthError::ConfigError(_) => "CONFIG_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
