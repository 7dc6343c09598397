//! Invitation domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invitation status.
///
/// `Pending` is the only state with outgoing transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Cancelled,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Cancelled => "cancelled",
            InvitationStatus::Expired => "expired",
        }
    }
}

/// Kind of invitee identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    #[default]
    Email,
    Username,
    Phone,
    Other,
}

/// Trim and lowercase an invitee identifier for comparison.
///
/// ```
/// use tenancy_org::invitation::normalize_identifier;
///
/// assert_eq!(normalize_identifier("  Alice@Test.com "), "alice@test.com");
/// ```
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// An invitation for someone to join an organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invitation {
    pub id: Uuid,

    pub organization_id: Uuid,

    /// Stored normalized
    pub invitee_identifier: String,

    pub identifier_type: IdentifierType,

    /// Role granted on acceptance
    pub role: String,

    /// Team joined on acceptance
    pub team_id: Option<Uuid>,

    pub inviter_id: Uuid,

    /// Inviter display name at creation time
    pub inviter_name: Option<String>,

    pub message: Option<String>,

    pub status: InvitationStatus,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Whether a pending invitation is past its expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// Case- and whitespace-insensitive identifier comparison.
    pub fn is_for(&self, identifier: &str) -> bool {
        normalize_identifier(&self.invitee_identifier) == normalize_identifier(identifier)
    }
}

/// Input for creating an invitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvitation {
    pub invitee_identifier: String,
    #[serde(default)]
    pub identifier_type: IdentifierType,
    pub role: String,
    pub team_id: Option<Uuid>,
    pub message: Option<String>,
    /// Overrides the configured lifetime
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewInvitation {
    pub fn email(address: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            invitee_identifier: address.into(),
            identifier_type: IdentifierType::Email,
            role: role.into(),
            team_id: None,
            message: None,
            expires_at: None,
        }
    }

    pub fn to_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Status filter for invitation listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationFilter {
    #[default]
    Pending,
    Status(InvitationStatus),
    All,
}

impl InvitationFilter {
    pub fn matches(&self, invitation: &Invitation) -> bool {
        match self {
            InvitationFilter::Pending => invitation.is_pending(),
            InvitationFilter::Status(status) => invitation.status == *status,
            InvitationFilter::All => true,
        }
    }
}
