//! Authorization audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permissions::Permission;
use crate::scope::Scope;

/// Default page size for audit queries.
pub const DEFAULT_AUDIT_LIMIT: usize = 50;
/// Upper bound for audit query page size.
pub const MAX_AUDIT_LIMIT: usize = 500;

/// What changed in the authorization model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RoleAssigned,
    RoleRevoked,
    RelationAdded,
    RelationRemoved,
    PermissionGranted,
    PermissionDenied,
    OverrideRemoved,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RoleAssigned => "role_assigned",
            AuditAction::RoleRevoked => "role_revoked",
            AuditAction::RelationAdded => "relation_added",
            AuditAction::RelationRemoved => "relation_removed",
            AuditAction::PermissionGranted => "permission_granted",
            AuditAction::PermissionDenied => "permission_denied",
            AuditAction::OverrideRemoved => "override_removed",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// Subject whose authorization state changed
    pub user_id: Uuid,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
    /// Relation as `relation:object_type:object_id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEntry {
    /// New entry stamped with the current time.
    pub fn new(action: AuditAction, user_id: Uuid, scope: Scope) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            action,
            user_id,
            scope,
            role: None,
            permission: None,
            relation: None,
            reason: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Human-readable single line, e.g.
    /// `[2024-01-15 14:32:05] role_assigned owner to 0190... in organization:0190...`
    pub fn formatted(&self) -> String {
        let subject = self
            .role
            .clone()
            .or_else(|| self.permission.as_ref().map(|p| p.to_string()))
            .or_else(|| self.relation.clone())
            .unwrap_or_default();

        format!(
            "[{}] {} {} to {} in {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.action,
            subject,
            self.user_id,
            self.scope
        )
    }
}

/// Filter for [`crate::AuthorizationClient::get_audit_log`].
///
/// The organization is mandatory; entries are always tenant-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    /// Maximum number of entries (default 50, max 500)
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn for_organization(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            user_id: None,
            action: None,
            limit: None,
        }
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Get the limit, clamped to a valid range.
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT)
    }

    /// Whether `entry` passes this filter.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        entry.scope.organization_id() == self.organization_id
            && self.user_id.map_or(true, |u| u == entry.user_id)
            && self.action.map_or(true, |a| a == entry.action)
    }
}
