use tenancy_events::{
    InvitationAccepted, InvitationIssued, InvitationKind, MemberAdded, MemberRoleChanged,
};
use tracing::instrument;
use uuid::Uuid;

use super::{Caller, TenancyService};
use crate::bulk::BulkResult;
use crate::config::Operation;
use crate::error::{OrgError, OrgResult};
use crate::identity::RequestContext;
use crate::invitation::{normalize_identifier, Invitation, InvitationFilter, NewInvitation};
use crate::membership::Member;

impl TenancyService {
    /// Invite someone by identifier, optionally into a team of the
    /// organization.
    #[instrument(skip(self, ctx, input), fields(role = %input.role))]
    pub async fn create_invitation(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        input: NewInvitation,
    ) -> OrgResult<Invitation> {
        let caller = self.gate(ctx, org_id, Operation::CreateInvitation).await?;
        self.invite_as(&caller, input).await
    }

    /// Invite several identifiers; each entry succeeds or fails on its own.
    #[instrument(skip(self, ctx, inputs), fields(count = inputs.len()))]
    pub async fn bulk_create_invitations(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        inputs: Vec<NewInvitation>,
    ) -> OrgResult<BulkResult<Invitation>> {
        let caller = self.gate(ctx, org_id, Operation::CreateInvitation).await?;
        let mut result = BulkResult::new();
        for input in inputs {
            let id = normalize_identifier(&input.invitee_identifier);
            let outcome = self.invite_as(&caller, input).await;
            result.record(id, outcome)?;
        }
        Ok(result)
    }

    async fn invite_as(&self, caller: &Caller, input: NewInvitation) -> OrgResult<Invitation> {
        let org_id = caller.org_id();
        self.hooks
            .invitations
            .before_create_invitation(org_id, &input, caller.user_id())
            .await?;

        let inviter_name = self.display_name_of(&caller.identity).await;
        let invitation = self
            .invitations
            .create(org_id, input, caller.user_id(), inviter_name)
            .await?;

        self.hooks
            .invitations
            .on_invitation_issued(&issued(InvitationKind::Created, &caller.org.name, &invitation))
            .await;
        Ok(invitation)
    }

    /// Accept an invitation as the caller.
    ///
    /// Only an authenticated caller whose identifier matches the invitee
    /// may accept; no prior membership is needed.
    #[instrument(skip(self, ctx))]
    pub async fn accept_invitation(
        &self,
        ctx: &RequestContext,
        invitation_id: Uuid,
    ) -> OrgResult<Member> {
        let identity = self.authenticate(ctx).await?;
        let identifier = self.identifier_of(&identity).await;
        let acceptance = self
            .invitations
            .accept(invitation_id, identity.user_id, identifier.as_deref())
            .await?;

        let invitation = &acceptance.invitation;
        let member = &acceptance.member;
        self.hooks
            .invitations
            .on_invitation_accepted(&InvitationAccepted {
                organization_id: invitation.organization_id,
                invitation_id,
                user_id: identity.user_id,
                role: member.role.clone(),
                team_id: acceptance.team_member.as_ref().map(|tm| tm.team_id),
            })
            .await;

        match &acceptance.previous_role {
            None => {
                self.hooks
                    .members
                    .on_member_added(&MemberAdded {
                        organization_id: invitation.organization_id,
                        user_id: identity.user_id,
                        role: member.role.clone(),
                        added_by: Some(invitation.inviter_id),
                    })
                    .await
            }
            Some(old_role) if *old_role != member.role => {
                self.hooks
                    .members
                    .on_member_role_changed(&MemberRoleChanged {
                        organization_id: invitation.organization_id,
                        user_id: identity.user_id,
                        old_role: old_role.clone(),
                        new_role: member.role.clone(),
                        changed_by: invitation.inviter_id,
                    })
                    .await
            }
            Some(_) => {}
        }
        Ok(acceptance.member)
    }

    /// Extend a pending or expired invitation and notify the invitee again.
    #[instrument(skip(self, ctx))]
    pub async fn resend_invitation(
        &self,
        ctx: &RequestContext,
        invitation_id: Uuid,
    ) -> OrgResult<Invitation> {
        let (caller, invitation) = self
            .invitation_gate(ctx, invitation_id, Operation::ResendInvitation)
            .await?;
        self.hooks
            .invitations
            .before_resend_invitation(&invitation, caller.user_id())
            .await?;

        let invitation = self.invitations.resend(invitation).await?;

        self.hooks
            .invitations
            .on_invitation_issued(&issued(InvitationKind::Resent, &caller.org.name, &invitation))
            .await;
        Ok(invitation)
    }

    #[instrument(skip(self, ctx))]
    pub async fn cancel_invitation(
        &self,
        ctx: &RequestContext,
        invitation_id: Uuid,
    ) -> OrgResult<Invitation> {
        let (caller, invitation) = self
            .invitation_gate(ctx, invitation_id, Operation::CancelInvitation)
            .await?;
        self.hooks
            .invitations
            .before_cancel_invitation(&invitation, caller.user_id())
            .await?;
        self.invitations.cancel(invitation).await
    }

    /// Invitations of an organization. Pending ones only unless `filter`
    /// says otherwise.
    #[instrument(skip(self, ctx))]
    pub async fn list_invitations(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        filter: InvitationFilter,
    ) -> OrgResult<Vec<Invitation>> {
        self.privileged_reader(ctx, org_id, Operation::ListInvitations)
            .await?;
        self.invitations.list(org_id, filter).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_invitation(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        invitation_id: Uuid,
    ) -> OrgResult<Invitation> {
        self.privileged_reader(ctx, org_id, Operation::ListInvitations)
            .await?;
        self.invitations.get_in(org_id, invitation_id).await
    }

    /// Unexpired pending invitations addressed to `identifier`, across
    /// organizations. Callers may only look up their own identifier.
    #[instrument(skip(self, ctx, identifier))]
    pub async fn get_pending_for_identifier(
        &self,
        ctx: &RequestContext,
        identifier: &str,
    ) -> OrgResult<Vec<Invitation>> {
        let identity = self.authenticate(ctx).await?;
        let own = self
            .identifier_of(&identity)
            .await
            .map(|id| normalize_identifier(&id));
        if own.as_deref() != Some(normalize_identifier(identifier).as_str()) {
            return Err(OrgError::Forbidden(
                "cannot list invitations for another identifier".into(),
            ));
        }
        self.invitations.pending_for_identifier(identifier).await
    }

    /// Load an invitation and run the full mutation gate in its organization.
    ///
    /// An unknown id is reported like an invitation of a foreign
    /// organization, as `Unauthorized`.
    async fn invitation_gate(
        &self,
        ctx: &RequestContext,
        invitation_id: Uuid,
        operation: Operation,
    ) -> OrgResult<(Caller, Invitation)> {
        self.authenticate(ctx).await?;
        let invitation = match self.invitations.load(invitation_id).await {
            Err(OrgError::NotFound(_)) => return Err(OrgError::Unauthorized),
            loaded => loaded?,
        };
        let caller = self
            .gate(ctx, invitation.organization_id, operation)
            .await?;
        Ok((caller, invitation))
    }
}

fn issued(
    kind: InvitationKind,
    organization_name: &str,
    invitation: &Invitation,
) -> InvitationIssued {
    InvitationIssued {
        kind,
        organization_id: invitation.organization_id,
        organization_name: organization_name.to_string(),
        invitation_id: invitation.id,
        invitee_identifier: invitation.invitee_identifier.clone(),
        role: invitation.role.clone(),
        team_id: invitation.team_id,
        inviter_id: invitation.inviter_id,
        inviter_name: invitation.inviter_name.clone(),
        message: invitation.message.clone(),
        expires_at: invitation.expires_at,
    }
}
