//! Error types for tenancy operations
//!
//! [`OrgError`] is the single error surfaced by the lifecycles and the
//! [`crate::TenancyService`]. A caller that is not a member of an organization
//! and a caller asking about an organization that does not exist both get
//! [`OrgError::Unauthorized`], so organization ids cannot be probed.

use tenancy_rbac::AuthzError;
use thiserror::Error;

use crate::store::StoreError;

/// Tenancy error types.
#[derive(Debug, Error)]
pub enum OrgError {
    /// No caller could be resolved from the request
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Caller is not a member of the organization, or it does not exist
    #[error("Unauthorized for this organization")]
    Unauthorized,

    /// Team, invitation or member id could not be resolved
    #[error("{0}")]
    NotFound(String),

    /// Duplicate member, invitation, or slug
    #[error("{0}")]
    AlreadyExists(String),

    /// Denied by policy, or a cross-organization reference
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation not allowed in the current state
    #[error("{0}")]
    InvalidState(String),

    /// A configured limit would be exceeded
    #[error("{resource} limit reached (max {limit})")]
    LimitExceeded {
        /// What is limited
        resource: &'static str,
        /// Configured maximum
        limit: usize,
    },

    /// A before-hook aborted the operation
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entity store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Policy engine failure other than a denial
    #[error(transparent)]
    Authorization(AuthzError),
}

/// Result type for tenancy operations.
pub type OrgResult<T> = Result<T, OrgError>;

impl From<AuthzError> for OrgError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Denied { permission, .. } => {
                OrgError::Forbidden(format!("missing permission {permission}"))
            }
            other => OrgError::Authorization(other),
        }
    }
}

impl OrgError {
    pub(crate) fn not_found(what: &str) -> Self {
        OrgError::NotFound(format!("{what} not found"))
    }

    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, OrgError::Store(_) | OrgError::Authorization(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            OrgError::NotAuthenticated => 401,
            OrgError::Unauthorized | OrgError::Forbidden(_) => 403,
            OrgError::NotFound(_) => 404,
            OrgError::AlreadyExists(_) | OrgError::InvalidState(_) => 409,
            OrgError::LimitExceeded { .. } => 422,
            OrgError::Rejected(_) | OrgError::InvalidInput(_) => 400,
            OrgError::Store(_) => 500,
            OrgError::Authorization(e) => e.status_code(),
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            OrgError::NotAuthenticated => "NOT_AUTHENTICATED",
            OrgError::Unauthorized => "UNAUTHORIZED",
            OrgError::NotFound(_) => "NOT_FOUND",
            OrgError::AlreadyExists(_) => "ALREADY_EXISTS",
            OrgError::Forbidden(_) => "FORBIDDEN",
            OrgError::InvalidState(_) => "INVALID_STATE",
            OrgError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            OrgError::Rejected(_) => "REJECTED",
            OrgError::InvalidInput(_) => "INVALID_INPUT",
            OrgError::Store(_) => "STORE_ERROR",
            OrgError::Authorization(e) => e.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenancy_rbac::{Permission, Scope};
    use uuid::Uuid;

    #[test]
    fn test_denial_becomes_forbidden() {
        let err: OrgError = AuthzError::Denied {
            permission: Permission::parse("teams:create").unwrap(),
            scope: Scope::organization(Uuid::now_v7()),
        }
        .into();

        assert!(matches!(err, OrgError::Forbidden(_)));
        assert_eq!(err.error_code(), "FORBIDDEN");
        assert_eq!(err.to_string(), "Forbidden: missing permission teams:create");
    }

    #[test]
    fn test_backend_failure_is_server_error() {
        let err: OrgError = AuthzError::Backend("timeout".into()).into();
        assert!(err.is_server_error());
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_limit_message_names_limit() {
        let err = OrgError::LimitExceeded {
            resource: "member",
            limit: 5,
        };
        assert_eq!(err.to_string(), "member limit reached (max 5)");
        assert_eq!(err.status_code(), 422);
    }
}
