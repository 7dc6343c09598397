//! Event types for tenancy state changes
//!
//! Every successful organization, membership, team and invitation mutation
//! can be published as an [`Event`]. Typed payloads live in this module and
//! are wrapped by [`TenancyEvent`] for conversion into the envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::bus::{EventBusError, EventBusResult};

/// Event envelope.
///
/// All events are wrapped in this envelope which provides metadata
/// for routing, tracing, and processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type (e.g., "organization.created", "member.role_changed")
    pub event_type: String,

    /// Category derived from the event type
    pub category: EventCategory,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Organization context
    pub org_id: Option<Uuid>,

    /// User who triggered the event
    pub user_id: Option<Uuid>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event in an explicit category.
    pub fn new(
        event_type: impl Into<String>,
        category: EventCategory,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            category,
            timestamp: Utc::now(),
            org_id: None,
            user_id: None,
            correlation_id: None,
            version: 1,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Set organization context.
    pub fn with_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Set user context.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Routing topic, `tenancy.{event_type}`.
    pub fn topic(&self) -> String {
        format!("tenancy.{}", self.event_type)
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Event categories for filtering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Organization lifecycle and ownership
    Organization,
    /// Organization membership
    Membership,
    /// Teams and team membership
    Team,
    /// Invitations
    Invitation,
}

impl EventCategory {
    /// Parse from event type string.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type.split('.').next()? {
            "organization" | "org" => Some(EventCategory::Organization),
            "member" | "membership" => Some(EventCategory::Membership),
            "team" => Some(EventCategory::Team),
            "invitation" => Some(EventCategory::Invitation),
            _ => None,
        }
    }
}

// ============================================================================
// Organization payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationCreated {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationDeleted {
    pub organization_id: Uuid,
    pub deleted_by: Uuid,
    pub members_removed: usize,
    pub teams_removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnershipTransferred {
    pub organization_id: Uuid,
    pub previous_owner_id: Uuid,
    pub new_owner_id: Uuid,
    /// Role the previous owner was moved to
    pub previous_owner_role: String,
}

// ============================================================================
// Membership payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberAdded {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    /// `None` for self-service joins
    pub added_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberRemoved {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub removed_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberRoleChanged {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub old_role: String,
    pub new_role: String,
    pub changed_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberLeft {
    pub organization_id: Uuid,
    pub user_id: Uuid,
}

// ============================================================================
// Team payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamCreated {
    pub organization_id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_team_id: Option<Uuid>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamDeleted {
    pub organization_id: Uuid,
    pub team_id: Uuid,
    pub deleted_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMemberAdded {
    pub organization_id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: Option<String>,
    pub added_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMemberRemoved {
    pub organization_id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub removed_by: Uuid,
}

// ============================================================================
// Invitation payloads
// ============================================================================

/// Whether an invitation was just created or re-sent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationKind {
    Created,
    Resent,
}

/// Fired on create and on resend with the same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvitationIssued {
    pub kind: InvitationKind,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub invitation_id: Uuid,
    pub invitee_identifier: String,
    pub role: String,
    pub team_id: Option<Uuid>,
    pub inviter_id: Uuid,
    /// Display name snapshot; absent when no profile resolved
    pub inviter_name: Option<String>,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvitationAccepted {
    pub organization_id: Uuid,
    pub invitation_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub team_id: Option<Uuid>,
}

/// Every tenancy event with its typed payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TenancyEvent {
    OrganizationCreated(OrganizationCreated),
    OrganizationDeleted(OrganizationDeleted),
    OwnershipTransferred(OwnershipTransferred),
    MemberAdded(MemberAdded),
    MemberRemoved(MemberRemoved),
    MemberRoleChanged(MemberRoleChanged),
    MemberLeft(MemberLeft),
    TeamCreated(TeamCreated),
    TeamDeleted(TeamDeleted),
    TeamMemberAdded(TeamMemberAdded),
    TeamMemberRemoved(TeamMemberRemoved),
    InvitationIssued(InvitationIssued),
    InvitationAccepted(InvitationAccepted),
}

impl TenancyEvent {
    /// Event type string, `{category}.{verb}`.
    pub fn event_type(&self) -> &'static str {
        match self {
            TenancyEvent::OrganizationCreated(_) => "organization.created",
            TenancyEvent::OrganizationDeleted(_) => "organization.deleted",
            TenancyEvent::OwnershipTransferred(_) => "organization.ownership_transferred",
            TenancyEvent::MemberAdded(_) => "member.added",
            TenancyEvent::MemberRemoved(_) => "member.removed",
            TenancyEvent::MemberRoleChanged(_) => "member.role_changed",
            TenancyEvent::MemberLeft(_) => "member.left",
            TenancyEvent::TeamCreated(_) => "team.created",
            TenancyEvent::TeamDeleted(_) => "team.deleted",
            TenancyEvent::TeamMemberAdded(_) => "team.member_added",
            TenancyEvent::TeamMemberRemoved(_) => "team.member_removed",
            TenancyEvent::InvitationIssued(p) => match p.kind {
                InvitationKind::Created => "invitation.created",
                InvitationKind::Resent => "invitation.resent",
            },
            TenancyEvent::InvitationAccepted(_) => "invitation.accepted",
        }
    }

    /// Organization the event belongs to.
    pub fn organization_id(&self) -> Uuid {
        match self {
            TenancyEvent::OrganizationCreated(p) => p.organization_id,
            TenancyEvent::OrganizationDeleted(p) => p.organization_id,
            TenancyEvent::OwnershipTransferred(p) => p.organization_id,
            TenancyEvent::MemberAdded(p) => p.organization_id,
            TenancyEvent::MemberRemoved(p) => p.organization_id,
            TenancyEvent::MemberRoleChanged(p) => p.organization_id,
            TenancyEvent::MemberLeft(p) => p.organization_id,
            TenancyEvent::TeamCreated(p) => p.organization_id,
            TenancyEvent::TeamDeleted(p) => p.organization_id,
            TenancyEvent::TeamMemberAdded(p) => p.organization_id,
            TenancyEvent::TeamMemberRemoved(p) => p.organization_id,
            TenancyEvent::InvitationIssued(p) => p.organization_id,
            TenancyEvent::InvitationAccepted(p) => p.organization_id,
        }
    }

    /// The user who caused the event.
    pub fn actor(&self) -> Option<Uuid> {
        match self {
            TenancyEvent::OrganizationCreated(p) => Some(p.created_by),
            TenancyEvent::OrganizationDeleted(p) => Some(p.deleted_by),
            TenancyEvent::OwnershipTransferred(p) => Some(p.previous_owner_id),
            TenancyEvent::MemberAdded(p) => p.added_by.or(Some(p.user_id)),
            TenancyEvent::MemberRemoved(p) => Some(p.removed_by),
            TenancyEvent::MemberRoleChanged(p) => Some(p.changed_by),
            TenancyEvent::MemberLeft(p) => Some(p.user_id),
            TenancyEvent::TeamCreated(p) => Some(p.created_by),
            TenancyEvent::TeamDeleted(p) => Some(p.deleted_by),
            TenancyEvent::TeamMemberAdded(p) => Some(p.added_by),
            TenancyEvent::TeamMemberRemoved(p) => Some(p.removed_by),
            TenancyEvent::InvitationIssued(p) => Some(p.inviter_id),
            TenancyEvent::InvitationAccepted(p) => Some(p.user_id),
        }
    }

    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let event_type = self.event_type();
        let category = EventCategory::from_event_type(event_type)
            .unwrap_or(EventCategory::Organization);
        let payload = serde_json::to_value(self)
            .map_err(|e| EventBusError::SerializationError(e.to_string()))?;

        let mut event = Event::new(event_type, category, payload).with_org(self.organization_id());
        if let Some(actor) = self.actor() {
            event = event.with_user(actor);
        }
        Ok(event)
    }
}
