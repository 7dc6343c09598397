//! Membership domain models
//!
//! This module provides membership entities that link users to organizations
//! and teams. A user has at most one [`Member`] row per organization and at
//! most one [`TeamMember`] row per team.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an organization membership.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Suspended,
}

/// Status filter for member listings and counts. Defaults to active only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatusFilter {
    #[default]
    Active,
    Suspended,
    All,
}

impl MemberStatusFilter {
    pub fn matches(&self, status: MemberStatus) -> bool {
        match self {
            MemberStatusFilter::Active => status == MemberStatus::Active,
            MemberStatusFilter::Suspended => status == MemberStatus::Suspended,
            MemberStatusFilter::All => true,
        }
    }
}

/// Organization membership linking a user to an organization.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use tenancy_org::Member;
///
/// let member = Member::new(Uuid::now_v7(), Uuid::now_v7(), "admin");
/// assert!(member.is_active());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    /// Organization ID
    pub organization_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role name, resolved against the role registry
    pub role: String,

    pub status: MemberStatus,

    /// Set while suspended
    pub suspended_at: Option<DateTime<Utc>>,

    /// When the user joined
    pub joined_at: DateTime<Utc>,

    /// Who added or invited this user (if applicable)
    pub invited_by: Option<Uuid>,
}

impl Member {
    /// Creates an active membership joined now.
    pub fn new(organization_id: Uuid, user_id: Uuid, role: impl Into<String>) -> Self {
        Self {
            organization_id,
            user_id,
            role: role.into(),
            status: MemberStatus::Active,
            suspended_at: None,
            joined_at: Utc::now(),
            invited_by: None,
        }
    }

    /// Set who invited this user.
    pub fn with_inviter(mut self, inviter_id: Option<Uuid>) -> Self {
        self.invited_by = inviter_id;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    /// Toggle suspension, stamping or clearing `suspended_at`.
    pub fn set_suspended(&mut self, suspended: bool) {
        if suspended {
            self.status = MemberStatus::Suspended;
            self.suspended_at.get_or_insert_with(Utc::now);
        } else {
            self.status = MemberStatus::Active;
            self.suspended_at = None;
        }
    }
}

/// Team membership.
///
/// Only meaningful while the user is an active [`Member`] of the team's
/// organization; the service enforces this, the store does not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub team_id: Uuid,

    /// Denormalized for per-organization lookups
    pub organization_id: Uuid,

    pub user_id: Uuid,

    /// Optional team-scoped role
    pub role: Option<String>,

    pub added_at: DateTime<Utc>,

    pub added_by: Option<Uuid>,
}

impl TeamMember {
    pub fn new(team_id: Uuid, organization_id: Uuid, user_id: Uuid, role: Option<String>) -> Self {
        Self {
            team_id,
            organization_id,
            user_id,
            role,
            added_at: Utc::now(),
            added_by: None,
        }
    }

    /// Set who added this user to the team.
    pub fn with_adder(mut self, adder_id: Uuid) -> Self {
        self.added_by = Some(adder_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_creation() {
        let org_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let inviter = Uuid::now_v7();
        let member = Member::new(org_id, user_id, "member").with_inviter(Some(inviter));

        assert_eq!(member.organization_id, org_id);
        assert_eq!(member.role, "member");
        assert_eq!(member.invited_by, Some(inviter));
        assert!(member.is_active());
        assert!(member.suspended_at.is_none());
    }

    #[test]
    fn test_suspension_toggle() {
        let mut member = Member::new(Uuid::now_v7(), Uuid::now_v7(), "member");

        member.set_suspended(true);
        assert_eq!(member.status, MemberStatus::Suspended);
        let stamped = member.suspended_at;
        assert!(stamped.is_some());

        member.set_suspended(true);
        assert_eq!(member.suspended_at, stamped);

        member.set_suspended(false);
        assert!(member.is_active());
        assert!(member.suspended_at.is_none());
    }

    #[test]
    fn test_status_filter() {
        assert!(MemberStatusFilter::default().matches(MemberStatus::Active));
        assert!(!MemberStatusFilter::default().matches(MemberStatus::Suspended));
        assert!(MemberStatusFilter::All.matches(MemberStatus::Suspended));
        assert!(!MemberStatusFilter::Suspended.matches(MemberStatus::Active));
    }

    #[test]
    fn test_team_member_creation() {
        let adder = Uuid::now_v7();
        let tm = TeamMember::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), None)
            .with_adder(adder);
        assert_eq!(tm.added_by, Some(adder));
        assert!(tm.role.is_none());
    }
}
