//! # Scopes
//!
//! Every role assignment, permission override and permission check is bound
//! to a scope: an organization, or a team inside an organization.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of scope, without its identifiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Organization-wide.
    Organization,
    /// A single team.
    Team,
}

/// The boundary a role or permission applies within.
///
/// A team scope carries its organization so the policy engine can fall back
/// to organization-level decisions and scope audit queries per tenant.
///
/// # Example
///
/// ```
/// use tenancy_rbac::{Scope, ScopeKind};
/// use uuid::Uuid;
///
/// let org_id = Uuid::now_v7();
/// let team_id = Uuid::now_v7();
///
/// let scope = Scope::team(team_id, org_id);
/// assert_eq!(scope.kind(), ScopeKind::Team);
/// assert_eq!(scope.organization_id(), org_id);
/// assert_eq!(scope.parent(), Some(Scope::organization(org_id)));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scope {
    /// Organization scope.
    Organization {
        /// Organization ID
        id: Uuid,
    },
    /// Team scope.
    Team {
        /// Team ID
        id: Uuid,
        /// Organization that owns the team
        organization_id: Uuid,
    },
}

impl Scope {
    /// Organization scope for `org_id`.
    pub fn organization(org_id: Uuid) -> Self {
        Scope::Organization { id: org_id }
    }

    /// Team scope for `team_id` inside `org_id`.
    pub fn team(team_id: Uuid, org_id: Uuid) -> Self {
        Scope::Team {
            id: team_id,
            organization_id: org_id,
        }
    }

    /// Scope kind.
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Organization { .. } => ScopeKind::Organization,
            Scope::Team { .. } => ScopeKind::Team,
        }
    }

    /// The organization or team id.
    pub fn id(&self) -> Uuid {
        match self {
            Scope::Organization { id } | Scope::Team { id, .. } => *id,
        }
    }

    /// The organization this scope lives in.
    pub fn organization_id(&self) -> Uuid {
        match self {
            Scope::Organization { id } => *id,
            Scope::Team {
                organization_id, ..
            } => *organization_id,
        }
    }

    /// Enclosing scope, if any.
    pub fn parent(&self) -> Option<Scope> {
        match self {
            Scope::Organization { .. } => None,
            Scope::Team {
                organization_id, ..
            } => Some(Scope::organization(*organization_id)),
        }
    }

    /// Whether `other` is this scope or lies inside it.
    pub fn contains(&self, other: &Scope) -> bool {
        match self {
            Scope::Organization { id } => other.organization_id() == *id,
            Scope::Team { .. } => self == other,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Organization { id } => write!(f, "organization:{id}"),
            Scope::Team { id, .. } => write!(f, "team:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_scope() {
        let org_id = Uuid::now_v7();
        let scope = Scope::organization(org_id);

        assert_eq!(scope.kind(), ScopeKind::Organization);
        assert_eq!(scope.id(), org_id);
        assert_eq!(scope.organization_id(), org_id);
        assert!(scope.parent().is_none());
        assert_eq!(scope.to_string(), format!("organization:{org_id}"));
    }

    #[test]
    fn test_containment() {
        let org_id = Uuid::now_v7();
        let org = Scope::organization(org_id);
        let team = Scope::team(Uuid::now_v7(), org_id);

        assert!(org.contains(&org));
        assert!(org.contains(&team));
        assert!(!team.contains(&org));
        assert!(!team.contains(&Scope::team(Uuid::now_v7(), org_id)));
        assert!(!org.contains(&Scope::organization(Uuid::now_v7())));
    }

    #[test]
    fn test_team_scope_serialization() {
        let org_id = Uuid::now_v7();
        let scope = Scope::team(Uuid::now_v7(), org_id);

        let json = serde_json::to_value(scope).unwrap();
        assert_eq!(json["type"], "team");
        assert_eq!(json["organization_id"], org_id.to_string());

        let back: Scope = serde_json::from_value(json).unwrap();
        assert_eq!(back, scope);
    }
}
