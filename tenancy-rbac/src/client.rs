//! Policy-engine contract
//!
//! [`AuthorizationClient`] is the boundary between tenancy state and the
//! authorization model. Role assignments, team relations, and direct permission
//! overrides are written through it, and every mutating tenancy operation
//! checks permissions through [`AuthorizationClient::can`] or
//! [`AuthorizationClient::require`].
//!
//! Role and relation writes are idempotent: assigning an already-held role or
//! removing a missing relation succeeds without effect, so a partially applied
//! operation can be re-driven safely.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditQuery};
use crate::permissions::{Permission, PermissionSet};
use crate::scope::Scope;

/// Authorization error types.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Permission check failed
    #[error("Permission denied: {permission} in {scope}")]
    Denied { permission: Permission, scope: Scope },

    /// Invalid argument (empty role name, malformed relation)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The policy engine could not be reached or failed internally
    #[error("Policy engine error: {0}")]
    Backend(String),
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

impl AuthzError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthzError::Denied { .. } => "FORBIDDEN",
            AuthzError::InvalidRequest(_) => "INVALID_REQUEST",
            AuthzError::Backend(_) => "POLICY_ENGINE_ERROR",
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthzError::Denied { .. } => 403,
            AuthzError::InvalidRequest(_) => 400,
            AuthzError::Backend(_) => 502,
        }
    }
}

/// Effect of a direct permission override.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    Deny,
}

/// A direct grant or denial that bypasses role resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionOverride {
    pub user_id: Uuid,
    pub permission: Permission,
    pub scope: Scope,
    pub effect: Effect,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PermissionOverride {
    /// Whether the override is still in force at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// Optional fields for [`AuthorizationClient::grant_permission`] and
/// [`AuthorizationClient::deny_permission`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideOptions {
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The external policy engine.
#[async_trait]
pub trait AuthorizationClient: Send + Sync {
    /// Assign `role` to `user_id` within `scope`.
    async fn assign_role(&self, user_id: Uuid, role: &str, scope: Scope) -> AuthzResult<()>;

    /// Revoke `role` from `user_id` within `scope`.
    async fn revoke_role(&self, user_id: Uuid, role: &str, scope: Scope) -> AuthzResult<()>;

    /// Record that `user_id` has `relation` to the object (`member` of a team).
    async fn add_relation(
        &self,
        user_id: Uuid,
        relation: &str,
        object: Scope,
    ) -> AuthzResult<()>;

    /// Remove a relation previously added with [`AuthorizationClient::add_relation`].
    async fn remove_relation(
        &self,
        user_id: Uuid,
        relation: &str,
        object: Scope,
    ) -> AuthzResult<()>;

    /// Directly grant a permission in a scope.
    async fn grant_permission(
        &self,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        options: OverrideOptions,
    ) -> AuthzResult<()>;

    /// Directly deny a permission in a scope. Denials win over grants and roles.
    async fn deny_permission(
        &self,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        options: OverrideOptions,
    ) -> AuthzResult<()>;

    /// Remove direct overrides recorded in `scope` or any scope inside it,
    /// for one user or, with `None`, for everyone. Returns how many were removed.
    async fn clear_overrides(&self, user_id: Option<Uuid>, scope: Scope) -> AuthzResult<usize>;

    /// Whether `user_id` holds `permission` in `scope`.
    async fn can(&self, user_id: Uuid, permission: &Permission, scope: Scope)
        -> AuthzResult<bool>;

    /// Like [`AuthorizationClient::can`] but fails with [`AuthzError::Denied`].
    async fn require(
        &self,
        user_id: Uuid,
        permission: &Permission,
        scope: Scope,
    ) -> AuthzResult<()> {
        if self.can(user_id, permission, scope).await? {
            Ok(())
        } else {
            Err(AuthzError::Denied {
                permission: permission.clone(),
                scope,
            })
        }
    }

    /// Effective permissions from roles and active grants, minus active denials.
    async fn get_user_permissions(&self, user_id: Uuid, scope: Scope)
        -> AuthzResult<PermissionSet>;

    /// Roles held directly in `scope`.
    async fn get_user_roles(&self, user_id: Uuid, scope: Scope) -> AuthzResult<Vec<String>>;

    /// Audit entries for one organization, newest first.
    async fn get_audit_log(&self, query: &AuditQuery) -> AuthzResult<Vec<AuditEntry>>;
}
