//! Invitation lifecycle.
//!
//! `pending` is the only state with outgoing transitions. Expiry is evaluated
//! lazily: a pending invitation past `expires_at` is marked `expired` the
//! first time someone tries to accept it.

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::members::MembershipLifecycle;
use super::team_members::TeamMembership;
use super::teams::TeamHierarchy;
use super::{require_text, LifecycleContext};
use crate::error::{OrgError, OrgResult};
use crate::invitation::{
    normalize_identifier, Invitation, InvitationFilter, InvitationStatus, NewInvitation,
};
use crate::membership::{Member, TeamMember};

/// Outcome of accepting an invitation.
#[derive(Debug, Clone)]
pub struct Acceptance {
    pub invitation: Invitation,
    pub member: Member,
    /// Role before acceptance when the user was already a member
    pub previous_role: Option<String>,
    /// Set when the invitation carried a team
    pub team_member: Option<TeamMember>,
}

impl Acceptance {
    /// The user was not a member before accepting.
    pub fn joined(&self) -> bool {
        self.previous_role.is_none()
    }
}

/// Invitation writes.
#[derive(Debug, Clone)]
pub struct InvitationLifecycle {
    ctx: LifecycleContext,
    members: MembershipLifecycle,
    teams: TeamHierarchy,
    team_members: TeamMembership,
}

impl InvitationLifecycle {
    pub fn new(ctx: LifecycleContext) -> Self {
        Self {
            members: MembershipLifecycle::new(ctx.clone()),
            teams: TeamHierarchy::new(ctx.clone()),
            team_members: TeamMembership::new(ctx.clone()),
            ctx,
        }
    }

    /// Load an invitation, treating another organization's as missing.
    pub async fn get_in(&self, org_id: Uuid, invitation_id: Uuid) -> OrgResult<Invitation> {
        match self.load(invitation_id).await? {
            invitation if invitation.organization_id == org_id => Ok(invitation),
            _ => Err(OrgError::not_found("invitation")),
        }
    }

    /// Load an invitation by id alone.
    pub async fn load(&self, invitation_id: Uuid) -> OrgResult<Invitation> {
        self.ctx
            .stores
            .invitations
            .get_invitation(invitation_id)
            .await?
            .ok_or_else(|| OrgError::not_found("invitation"))
    }

    pub async fn list(&self, org_id: Uuid, filter: InvitationFilter) -> OrgResult<Vec<Invitation>> {
        let invitations = self.ctx.stores.invitations.list_invitations(org_id).await?;
        Ok(invitations.into_iter().filter(|i| filter.matches(i)).collect())
    }

    /// Unexpired pending invitations for an identifier, across organizations.
    pub async fn pending_for_identifier(&self, identifier: &str) -> OrgResult<Vec<Invitation>> {
        let now = Utc::now();
        let invitations = self
            .ctx
            .stores
            .invitations
            .list_invitations_for_identifier(&normalize_identifier(identifier))
            .await?;
        Ok(invitations
            .into_iter()
            .filter(|i| i.is_pending() && !i.is_expired_at(now))
            .collect())
    }

    /// Create a pending invitation.
    pub async fn create(
        &self,
        org_id: Uuid,
        input: NewInvitation,
        inviter_id: Uuid,
        inviter_name: Option<String>,
    ) -> OrgResult<Invitation> {
        let identifier = normalize_identifier(&input.invitee_identifier);
        if identifier.is_empty() {
            return Err(OrgError::InvalidInput(
                "invitee identifier must not be empty".into(),
            ));
        }
        let role = require_text("role", &input.role)?;
        if let Some(team_id) = input.team_id {
            self.teams.get_in(org_id, team_id).await?;
        }

        let now = Utc::now();
        let duplicate = self
            .list(org_id, InvitationFilter::Pending)
            .await?
            .into_iter()
            .any(|i| i.is_for(&identifier) && !i.is_expired_at(now));
        if duplicate {
            return Err(OrgError::AlreadyExists(format!(
                "a pending invitation for {identifier} already exists"
            )));
        }

        let expires_at = input
            .expires_at
            .unwrap_or_else(|| now + self.ctx.config.invitation_ttl());
        if expires_at <= now {
            return Err(OrgError::InvalidInput(
                "expiry must be in the future".into(),
            ));
        }

        let invitation = Invitation {
            id: Uuid::now_v7(),
            organization_id: org_id,
            invitee_identifier: identifier,
            identifier_type: input.identifier_type,
            role,
            team_id: input.team_id,
            inviter_id,
            inviter_name,
            message: input.message,
            status: InvitationStatus::Pending,
            expires_at,
            created_at: now,
        };
        self.ctx
            .stores
            .invitations
            .insert_invitation(&invitation)
            .await?;

        info!(%org_id, invitation_id = %invitation.id, "Invitation created");
        Ok(invitation)
    }

    /// Accept an invitation as `user_id`, whose verified identifier is
    /// `identifier`.
    ///
    /// Checks, in order: pending, not expired, identifier match, active
    /// organization, caller not suspended. A user who is already a member
    /// gets the invited role unless they hold the creator role.
    pub async fn accept(
        &self,
        invitation_id: Uuid,
        user_id: Uuid,
        identifier: Option<&str>,
    ) -> OrgResult<Acceptance> {
        let mut invitation = self.load(invitation_id).await?;
        if !invitation.is_pending() {
            return Err(OrgError::InvalidState(format!(
                "invitation is {}",
                invitation.status.as_str()
            )));
        }
        if invitation.is_expired() {
            invitation.status = InvitationStatus::Expired;
            self.ctx
                .stores
                .invitations
                .update_invitation(&invitation)
                .await?;
            info!(%invitation_id, "Invitation expired");
            return Err(OrgError::InvalidState("invitation has expired".into()));
        }
        if !identifier.is_some_and(|id| invitation.is_for(id)) {
            warn!(%invitation_id, %user_id, "Invitation identifier mismatch");
            return Err(OrgError::Forbidden(
                "invitation was issued to a different identifier".into(),
            ));
        }

        let org_id = invitation.organization_id;
        let org = self
            .ctx
            .stores
            .organizations
            .get_organization(org_id)
            .await?
            .ok_or_else(|| OrgError::not_found("invitation"))?;
        if !org.is_active() {
            return Err(OrgError::InvalidState(format!("organization is {}", org.status)));
        }

        let existing = self.members.get(org_id, user_id).await?;
        if existing.as_ref().is_some_and(|m| !m.is_active()) {
            return Err(OrgError::InvalidState("membership is suspended".into()));
        }

        let (member, previous_role) = match existing {
            Some(existing) if self.ctx.is_creator_role(&existing.role) => {
                let role = existing.role.clone();
                (existing, Some(role))
            }
            Some(_) => {
                let (member, old) = self
                    .members
                    .update_role(org_id, user_id, &invitation.role)
                    .await?;
                (member, Some(old))
            }
            None => {
                let member = self
                    .members
                    .add(org_id, user_id, &invitation.role, Some(invitation.inviter_id))
                    .await?;
                (member, None)
            }
        };

        let mut team_member = None;
        if let Some(team_id) = invitation.team_id {
            let team_exists = self.ctx.stores.teams.get_team(team_id).await?.is_some();
            if team_exists {
                team_member = match self.team_members.get(team_id, user_id).await? {
                    Some(existing) => Some(existing),
                    None => Some(
                        self.team_members
                            .add(org_id, team_id, user_id, None, invitation.inviter_id)
                            .await?,
                    ),
                };
            }
        }

        invitation.status = InvitationStatus::Accepted;
        self.ctx
            .stores
            .invitations
            .update_invitation(&invitation)
            .await?;

        info!(%org_id, %invitation_id, %user_id, "Invitation accepted");
        Ok(Acceptance {
            invitation,
            member,
            previous_role,
            team_member,
        })
    }

    /// Push the expiry out again. Revives an expired invitation.
    ///
    /// The new expiry is always strictly later than the old one.
    pub async fn resend(&self, mut invitation: Invitation) -> OrgResult<Invitation> {
        if !matches!(
            invitation.status,
            InvitationStatus::Pending | InvitationStatus::Expired
        ) {
            return Err(OrgError::InvalidState(format!(
                "cannot resend an invitation that is {}",
                invitation.status.as_str()
            )));
        }

        let fresh = Utc::now() + self.ctx.config.invitation_ttl();
        let bumped = invitation.expires_at + Duration::milliseconds(1);
        invitation.expires_at = fresh.max(bumped);
        invitation.status = InvitationStatus::Pending;
        self.ctx
            .stores
            .invitations
            .update_invitation(&invitation)
            .await?;

        info!(
            invitation_id = %invitation.id,
            expires_at = %invitation.expires_at,
            "Invitation resent"
        );
        Ok(invitation)
    }

    pub async fn cancel(&self, mut invitation: Invitation) -> OrgResult<Invitation> {
        if !invitation.is_pending() {
            return Err(OrgError::InvalidState(
                "only pending invitations can be cancelled".into(),
            ));
        }
        invitation.status = InvitationStatus::Cancelled;
        self.ctx
            .stores
            .invitations
            .update_invitation(&invitation)
            .await?;

        info!(invitation_id = %invitation.id, "Invitation cancelled");
        Ok(invitation)
    }
}
