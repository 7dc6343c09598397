//! Role definitions
//!
//! Roles are free-form names resolved against a [`RoleRegistry`]. The
//! registry ships with three built-in roles:
//!
//! - **owner**: manage every resource, including deletion and direct grants
//! - **admin**: manage members, teams and invitations; update the organization
//! - **member**: read-only access to the organization, its members and teams
//!
//! Unknown role names resolve to an empty permission set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::actions::Action;
use crate::permissions::{Permission, PermissionSet};
use crate::resources::ResourceType;

/// Name of the built-in owner role.
pub const OWNER_ROLE: &str = "owner";
/// Name of the built-in admin role.
pub const ADMIN_ROLE: &str = "admin";
/// Name of the built-in member role.
pub const MEMBER_ROLE: &str = "member";

/// A named role with its permission set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name (case-insensitive key)
    pub name: String,

    /// Human-readable description
    pub description: Option<String>,

    /// Permissions granted by the role
    pub permissions: PermissionSet,
}

impl RoleDefinition {
    /// Creates a role from permission strings; malformed strings are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_rbac::RoleDefinition;
    ///
    /// let role = RoleDefinition::new("billing", &["organizations:update"]);
    /// assert_eq!(role.permissions.len(), 1);
    /// ```
    pub fn new(name: impl Into<String>, permissions: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: None,
            permissions: PermissionSet::from_strings(permissions),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Registry mapping role names to permission sets.
///
/// # Examples
///
/// ```
/// use tenancy_rbac::{Action, Permission, ResourceType, RoleRegistry};
///
/// let registry = RoleRegistry::default();
/// let add = Permission::new(ResourceType::Members, Action::Add);
///
/// assert!(registry.role_has("admin", &add));
/// assert!(!registry.role_has("member", &add));
/// assert!(!registry.role_has("nonexistent", &add));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRegistry {
    roles: HashMap<String, RoleDefinition>,
}

impl RoleRegistry {
    /// An empty registry with no roles at all.
    pub fn empty() -> Self {
        Self {
            roles: HashMap::new(),
        }
    }

    /// Insert or replace a role definition.
    pub fn define(&mut self, role: RoleDefinition) {
        self.roles.insert(role.name.to_lowercase(), role);
    }

    /// Builder form of [`RoleRegistry::define`].
    pub fn with_role(mut self, role: RoleDefinition) -> Self {
        self.define(role);
        self
    }

    /// Look up a role by name.
    pub fn get(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.get(&name.to_lowercase())
    }

    /// Permissions for a role; unknown roles yield an empty set.
    pub fn permissions_for(&self, name: &str) -> PermissionSet {
        self.get(name)
            .map(|role| role.permissions.clone())
            .unwrap_or_default()
    }

    /// Whether the named role grants `permission`.
    pub fn role_has(&self, name: &str, permission: &Permission) -> bool {
        self.get(name)
            .map(|role| role.permissions.has(permission))
            .unwrap_or(false)
    }

    /// Registered role names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roles.values().map(|r| r.name.clone()).collect();
        names.sort();
        names
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        let owner: PermissionSet = ResourceType::all()
            .into_iter()
            .map(|resource| Permission::new(resource, Action::Manage))
            .collect();

        Self::empty()
            .with_role(RoleDefinition {
                name: OWNER_ROLE.to_string(),
                description: Some("Full organization control".to_string()),
                permissions: owner,
            })
            .with_role(
                RoleDefinition::new(
                    ADMIN_ROLE,
                    &[
                        "organizations:update",
                        "members:manage",
                        "teams:manage",
                        "team_members:manage",
                        "invitations:manage",
                        "audit:read",
                    ],
                )
                .with_description("Manage members, teams and invitations"),
            )
            .with_role(
                RoleDefinition::new(
                    MEMBER_ROLE,
                    &[
                        "organizations:read",
                        "members:read",
                        "teams:read",
                        "team_members:read",
                    ],
                )
                .with_description("Read-only access"),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(s: &str) -> Permission {
        Permission::parse(s).unwrap()
    }

    #[test]
    fn test_owner_has_everything() {
        let registry = RoleRegistry::default();
        for resource in ResourceType::all() {
            for action in Action::all() {
                assert!(registry.role_has(OWNER_ROLE, &Permission::new(resource, action)));
            }
        }
    }

    #[test]
    fn test_admin_boundaries() {
        let registry = RoleRegistry::default();
        assert!(registry.role_has("admin", &perm("organizations:update")));
        assert!(registry.role_has("admin", &perm("members:suspend")));
        assert!(registry.role_has("ADMIN", &perm("invitations:cancel")));
        assert!(!registry.role_has("admin", &perm("organizations:delete")));
        assert!(!registry.role_has("admin", &perm("permissions:manage")));
    }

    #[test]
    fn test_member_is_read_only() {
        let registry = RoleRegistry::default();
        assert!(registry.role_has("member", &perm("teams:read")));
        assert!(!registry.role_has("member", &perm("teams:create")));
        assert!(!registry.role_has("member", &perm("invitations:read")));
    }

    #[test]
    fn test_custom_role() {
        let registry = RoleRegistry::default()
            .with_role(RoleDefinition::new("Recruiter", &["invitations:create"]));

        assert!(registry.role_has("recruiter", &perm("invitations:create")));
        assert!(registry.permissions_for("unknown").is_empty());
        assert_eq!(
            registry.names(),
            vec!["Recruiter", "admin", "member", "owner"]
        );
    }
}
