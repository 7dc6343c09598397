//! # Permissions
//!
//! A permission combines a resource type with an action, optionally narrowed
//! to a single resource instance: `members:add`, `teams:update:<team-id>`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::actions::Action;
use crate::resources::ResourceType;

/// A permission is a combination of resource type and action.
///
/// # Example
///
/// ```
/// use tenancy_rbac::{Action, Permission, ResourceType};
///
/// let perm = Permission::new(ResourceType::Members, Action::Add);
/// assert_eq!(perm.to_string(), "members:add");
///
/// let parsed: Permission = "teams:update:eng".parse().unwrap();
/// assert_eq!(parsed.resource_id.as_deref(), Some("eng"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// The resource type this permission applies to.
    pub resource: ResourceType,
    /// The action allowed on the resource.
    pub action: Action,
    /// Specific resource instance, `None` for every instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// Error returned when a permission string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission string: {0}")]
pub struct ParsePermissionError(pub String);

impl Permission {
    /// Create a permission covering every instance of `resource`.
    pub fn new(resource: ResourceType, action: Action) -> Self {
        Self {
            resource,
            action,
            resource_id: None,
        }
    }

    /// Create a permission for a specific resource instance.
    pub fn for_resource(
        resource: ResourceType,
        action: Action,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            resource,
            action,
            resource_id: Some(resource_id.into()),
        }
    }

    /// Parse `resource:action[:id]`, returning `None` when malformed.
    ///
    /// The id segment may itself contain colons.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, ':');
        let resource = ResourceType::parse(parts.next()?.trim())?;
        let action = Action::parse(parts.next()?.trim())?;
        let resource_id = parts
            .next()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Some(Self {
            resource,
            action,
            resource_id,
        })
    }

    /// Check if holding `self` satisfies a request for `other`.
    ///
    /// Resource types must be equal, the action must match or be implied,
    /// and a missing resource id on either side acts as a wildcard.
    pub fn matches(&self, other: &Permission) -> bool {
        if self.resource != other.resource {
            return false;
        }

        if self.action != other.action && !self.action.implies(other.action) {
            return false;
        }

        match (&self.resource_id, &other.resource_id) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => a == b,
        }
    }

    /// Whether the permission applies to every instance of the resource.
    pub fn is_global(&self) -> bool {
        self.resource_id.is_none()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_id {
            Some(id) => write!(f, "{}:{}:{}", self.resource, self.action, id),
            None => write!(f, "{}:{}", self.resource, self.action),
        }
    }
}

impl FromStr for Permission {
    type Err = ParsePermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::parse(s).ok_or_else(|| ParsePermissionError(s.to_string()))
    }
}

/// A set of permissions attached to a role or resolved for a user.
///
/// # Example
///
/// ```
/// use tenancy_rbac::{Action, Permission, PermissionSet, ResourceType};
///
/// let set = PermissionSet::from_strings(&["members:manage"]);
/// assert!(set.has(&Permission::new(ResourceType::Members, Action::Suspend)));
/// assert!(!set.has(&Permission::new(ResourceType::Teams, Action::Read)));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionSet {
    permissions: HashSet<Permission>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permission to the set.
    pub fn add(&mut self, permission: Permission) {
        self.permissions.insert(permission);
    }

    /// Remove a permission, returning whether it was present.
    pub fn remove(&mut self, permission: &Permission) -> bool {
        self.permissions.remove(permission)
    }

    /// Check if any permission in the set satisfies `permission`.
    pub fn has(&self, permission: &Permission) -> bool {
        self.permissions.iter().any(|held| held.matches(permission))
    }

    /// Merge another permission set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        self.permissions.extend(other.permissions.iter().cloned());
    }

    /// Build a set from permission strings, skipping malformed entries.
    pub fn from_strings(perms: &[&str]) -> Self {
        perms.iter().filter_map(|p| Permission::parse(p)).collect()
    }

    /// Iterate over the permissions in the set.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Sorted string form, used for stable API output.
    pub fn to_strings(&self) -> Vec<String> {
        let mut out: Vec<String> = self.permissions.iter().map(|p| p.to_string()).collect();
        out.sort();
        out
    }

    /// Number of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_display() {
        let perm = Permission::new(ResourceType::TeamMembers, Action::Add);
        assert_eq!(perm.to_string(), "team_members:add");
        assert!(perm.is_global());

        let perm = Permission::for_resource(ResourceType::Teams, Action::Update, "t-1");
        assert_eq!(perm.to_string(), "teams:update:t-1");
        assert!(!perm.is_global());
    }

    #[test]
    fn test_permission_parsing() {
        let perm: Permission = "organizations:update".parse().unwrap();
        assert_eq!(perm.resource, ResourceType::Organizations);
        assert_eq!(perm.action, Action::Update);

        let perm = Permission::parse("teams:read:a:b").unwrap();
        assert_eq!(perm.resource_id.as_deref(), Some("a:b"));

        assert!(Permission::parse("members").is_none());
        assert!("widgets:read".parse::<Permission>().is_err());
    }

    #[test]
    fn test_permission_matches() {
        let global = Permission::new(ResourceType::Teams, Action::Manage);
        let specific = Permission::for_resource(ResourceType::Teams, Action::Delete, "t-1");
        assert!(global.matches(&specific));

        let other_team = Permission::for_resource(ResourceType::Teams, Action::Manage, "t-2");
        assert!(!other_team.matches(&specific));

        let wrong_resource = Permission::new(ResourceType::Members, Action::Manage);
        assert!(!wrong_resource.matches(&specific));
    }

    #[test]
    fn test_permission_set_implication() {
        let set = PermissionSet::from_strings(&["invitations:create", "bogus"]);
        assert_eq!(set.len(), 1);
        assert!(set.has(&Permission::new(ResourceType::Invitations, Action::Read)));
        assert!(!set.has(&Permission::new(ResourceType::Invitations, Action::Cancel)));
    }

    #[test]
    fn test_permission_set_merge_and_remove() {
        let mut a = PermissionSet::from_strings(&["members:read"]);
        let b = PermissionSet::from_strings(&["teams:read", "members:read"]);
        a.merge(&b);
        assert_eq!(a.to_strings(), vec!["members:read", "teams:read"]);

        assert!(a.remove(&Permission::new(ResourceType::Teams, Action::Read)));
        assert!(!a.remove(&Permission::new(ResourceType::Teams, Action::Read)));
        assert_eq!(a.len(), 1);
    }
}
