//! Tenancy configuration.
//!
//! Role names, invitation lifetime, optional limits, and the
//! operation -> permission map consulted before every gated operation.
//! Loaded from environment variables with defaults suitable for development.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tenancy_rbac::{Action, Permission, ResourceType};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Gated operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    UpdateOrganization,
    DeleteOrganization,
    AddMember,
    RemoveMember,
    UpdateMemberRole,
    SuspendMember,
    CreateTeam,
    UpdateTeam,
    DeleteTeam,
    AddTeamMember,
    RemoveTeamMember,
    UpdateTeamMemberRole,
    CreateInvitation,
    ResendInvitation,
    CancelInvitation,
    ListInvitations,
    ManagePermissions,
    ReadAuditLog,
}

impl Operation {
    /// Permission required when no override is configured.
    pub fn default_permission(&self) -> Permission {
        use Action::*;
        use ResourceType::*;

        let (resource, action) = match self {
            Operation::UpdateOrganization => (Organizations, Update),
            Operation::DeleteOrganization => (Organizations, Delete),
            Operation::AddMember => (Members, Add),
            Operation::RemoveMember => (Members, Remove),
            Operation::UpdateMemberRole => (Members, Update),
            Operation::SuspendMember => (Members, Suspend),
            Operation::CreateTeam => (Teams, Create),
            Operation::UpdateTeam => (Teams, Update),
            Operation::DeleteTeam => (Teams, Delete),
            Operation::AddTeamMember => (TeamMembers, Add),
            Operation::RemoveTeamMember => (TeamMembers, Remove),
            Operation::UpdateTeamMemberRole => (TeamMembers, Update),
            Operation::CreateInvitation | Operation::ResendInvitation => (Invitations, Create),
            Operation::CancelInvitation => (Invitations, Cancel),
            Operation::ListInvitations => (Invitations, Read),
            Operation::ManagePermissions => (Permissions, Manage),
            Operation::ReadAuditLog => (Audit, Read),
        };
        Permission::new(resource, action)
    }
}

/// Operation -> permission map with per-operation overrides.
///
/// ```
/// use tenancy_org::{Operation, PermissionMap};
///
/// let mut map = PermissionMap::default();
/// assert_eq!(map.permission_for(Operation::CreateTeam).to_string(), "teams:create");
///
/// map.set(Operation::CreateTeam, "teams:manage".parse().unwrap());
/// assert_eq!(map.permission_for(Operation::CreateTeam).to_string(), "teams:manage");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionMap {
    #[serde(default)]
    overrides: HashMap<Operation, Permission>,
}

impl PermissionMap {
    /// Permission checked for `operation`.
    pub fn permission_for(&self, operation: Operation) -> Permission {
        self.overrides
            .get(&operation)
            .cloned()
            .unwrap_or_else(|| operation.default_permission())
    }

    /// Override the permission for one operation.
    pub fn set(&mut self, operation: Operation, permission: Permission) {
        self.overrides.insert(operation, permission);
    }
}

/// Optional pre-write limits. `None` means unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Limits {
    /// Organizations a single user may own
    pub max_organizations_per_user: Option<usize>,
    /// Members (any status) per organization
    pub max_members_per_organization: Option<usize>,
    /// Teams per organization
    pub max_teams_per_organization: Option<usize>,
}

/// Tenancy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Role granted to whoever creates an organization.
    pub creator_role: String,

    /// Role used for self-service joins.
    pub default_member_role: String,

    /// Role the previous owner receives after an ownership transfer.
    pub transfer_fallback_role: String,

    /// Invitation lifetime in hours.
    pub invitation_ttl_hours: i64,

    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub permissions: PermissionMap,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            creator_role: tenancy_rbac::OWNER_ROLE.to_string(),
            default_member_role: tenancy_rbac::MEMBER_ROLE.to_string(),
            transfer_fallback_role: tenancy_rbac::ADMIN_ROLE.to_string(),
            invitation_ttl_hours: 48,
            limits: Limits::default(),
            permissions: PermissionMap::default(),
        }
    }
}

impl TenancyConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TENANCY_CREATOR_ROLE` (default: owner)
    /// - `TENANCY_DEFAULT_MEMBER_ROLE` (default: member)
    /// - `TENANCY_TRANSFER_FALLBACK_ROLE` (default: admin)
    /// - `TENANCY_INVITATION_TTL_HOURS` (default: 48)
    /// - `TENANCY_MAX_ORGANIZATIONS_PER_USER`
    /// - `TENANCY_MAX_MEMBERS_PER_ORGANIZATION`
    /// - `TENANCY_MAX_TEAMS_PER_ORGANIZATION`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let string = |key: &str, fallback: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };
        let number = |key: &str| -> Result<Option<i64>, ConfigError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| ConfigError::invalid(key, format!("not a number: {raw}"))),
                None => Ok(None),
            }
        };
        let limit = |key: &str| -> Result<Option<usize>, ConfigError> {
            match number(key)? {
                Some(n) if n > 0 => Ok(Some(n as usize)),
                Some(_) => Err(ConfigError::invalid(key, "must be positive")),
                None => Ok(None),
            }
        };

        let config = Self {
            creator_role: string("TENANCY_CREATOR_ROLE", default.creator_role),
            default_member_role: string("TENANCY_DEFAULT_MEMBER_ROLE", default.default_member_role),
            transfer_fallback_role: string(
                "TENANCY_TRANSFER_FALLBACK_ROLE",
                default.transfer_fallback_role,
            ),
            invitation_ttl_hours: number("TENANCY_INVITATION_TTL_HOURS")?
                .unwrap_or(default.invitation_ttl_hours),
            limits: Limits {
                max_organizations_per_user: limit("TENANCY_MAX_ORGANIZATIONS_PER_USER")?,
                max_members_per_organization: limit("TENANCY_MAX_MEMBERS_PER_ORGANIZATION")?,
                max_teams_per_organization: limit("TENANCY_MAX_TEAMS_PER_ORGANIZATION")?,
            },
            permissions: default.permissions,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, role) in [
            ("creator_role", &self.creator_role),
            ("default_member_role", &self.default_member_role),
            ("transfer_fallback_role", &self.transfer_fallback_role),
        ] {
            if role.trim().is_empty() {
                return Err(ConfigError::invalid(key, "role name must not be empty"));
            }
        }
        if self.transfer_fallback_role == self.creator_role {
            return Err(ConfigError::invalid(
                "transfer_fallback_role",
                "must differ from the creator role",
            ));
        }
        if self.invitation_ttl_hours <= 0 {
            return Err(ConfigError::invalid(
                "invitation_ttl_hours",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Invitation lifetime.
    pub fn invitation_ttl(&self) -> Duration {
        Duration::hours(self.invitation_ttl_hours)
    }

    /// Builder: override the permission for an operation.
    pub fn with_permission(mut self, operation: Operation, permission: Permission) -> Self {
        self.permissions.set(operation, permission);
        self
    }

    /// Builder: replace the limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_default_config() {
        let config = TenancyConfig::default();
        assert_eq!(config.creator_role, "owner");
        assert_eq!(config.default_member_role, "member");
        assert_eq!(config.transfer_fallback_role, "admin");
        assert_eq!(config.invitation_ttl(), Duration::hours(48));
        assert!(config.limits.max_members_per_organization.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = TenancyConfig::from_lookup(lookup(&[
            ("TENANCY_CREATOR_ROLE", "founder"),
            ("TENANCY_INVITATION_TTL_HOURS", "72"),
            ("TENANCY_MAX_TEAMS_PER_ORGANIZATION", "10"),
            ("TENANCY_DEFAULT_MEMBER_ROLE", "  "),
        ]))
        .unwrap();

        assert_eq!(config.creator_role, "founder");
        assert_eq!(config.default_member_role, "member");
        assert_eq!(config.invitation_ttl_hours, 72);
        assert_eq!(config.limits.max_teams_per_organization, Some(10));
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = TenancyConfig::from_lookup(lookup(&[("TENANCY_INVITATION_TTL_HOURS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("TENANCY_INVITATION_TTL_HOURS"));

        assert!(TenancyConfig::from_lookup(lookup(&[(
            "TENANCY_MAX_MEMBERS_PER_ORGANIZATION",
            "0"
        )]))
        .is_err());

        assert!(TenancyConfig::from_lookup(lookup(&[("TENANCY_TRANSFER_FALLBACK_ROLE", "owner")]))
            .is_err());
    }

    #[test]
    fn test_default_permission_map() {
        let map = PermissionMap::default();
        assert_eq!(
            map.permission_for(Operation::ResendInvitation).to_string(),
            "invitations:create"
        );
        assert_eq!(
            map.permission_for(Operation::ManagePermissions).to_string(),
            "permissions:manage"
        );
        assert_eq!(
            map.permission_for(Operation::SuspendMember).to_string(),
            "members:suspend"
        );
    }
}
