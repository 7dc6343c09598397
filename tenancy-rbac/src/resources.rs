//! # Resource Types
//!
//! Resources a tenancy permission can refer to. A resource is the first
//! segment of a permission string (`teams:create`).

use serde::{Deserialize, Serialize};

/// Resource types that can have permissions assigned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// The organization itself (settings, status, deletion).
    Organizations,
    /// Organization memberships.
    Members,
    /// Teams and the team hierarchy.
    Teams,
    /// Team memberships.
    TeamMembers,
    /// Invitations to join an organization.
    Invitations,
    /// Direct permission grants and denials.
    Permissions,
    /// The authorization audit trail.
    Audit,
}

impl ResourceType {
    /// Get the string representation of the resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Organizations => "organizations",
            ResourceType::Members => "members",
            ResourceType::Teams => "teams",
            ResourceType::TeamMembers => "team_members",
            ResourceType::Invitations => "invitations",
            ResourceType::Permissions => "permissions",
            ResourceType::Audit => "audit",
        }
    }

    /// Parse a resource type (case-insensitive, singular forms accepted).
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_rbac::resources::ResourceType;
    ///
    /// assert_eq!(ResourceType::parse("members"), Some(ResourceType::Members));
    /// assert_eq!(ResourceType::parse("Team"), Some(ResourceType::Teams));
    /// assert_eq!(ResourceType::parse("projects"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "organizations" | "organization" | "org" => Some(ResourceType::Organizations),
            "members" | "member" => Some(ResourceType::Members),
            "teams" | "team" => Some(ResourceType::Teams),
            "team_members" | "team_member" => Some(ResourceType::TeamMembers),
            "invitations" | "invitation" => Some(ResourceType::Invitations),
            "permissions" | "permission" => Some(ResourceType::Permissions),
            "audit" | "audit_log" => Some(ResourceType::Audit),
            _ => None,
        }
    }

    /// All resource types.
    pub fn all() -> [ResourceType; 7] {
        [
            ResourceType::Organizations,
            ResourceType::Members,
            ResourceType::Teams,
            ResourceType::TeamMembers,
            ResourceType::Invitations,
            ResourceType::Permissions,
            ResourceType::Audit,
        ]
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_parsing() {
        assert_eq!(
            ResourceType::parse("team_members"),
            Some(ResourceType::TeamMembers)
        );
        assert_eq!(ResourceType::parse("ORG"), Some(ResourceType::Organizations));
        assert_eq!(ResourceType::parse("audit_log"), Some(ResourceType::Audit));
        assert_eq!(ResourceType::parse(""), None);
    }

    #[test]
    fn test_names_round_trip() {
        for resource in ResourceType::all() {
            assert_eq!(ResourceType::parse(resource.as_str()), Some(resource));
        }
    }
}
