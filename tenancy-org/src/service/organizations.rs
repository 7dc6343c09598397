use tenancy_events::{
    MemberAdded, MemberLeft, OrganizationCreated, OrganizationDeleted, OwnershipTransferred,
};
use tenancy_rbac::Scope;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{ensure_caller_active, ensure_org_active, TenancyService};
use crate::config::Operation;
use crate::error::{OrgError, OrgResult};
use crate::identity::RequestContext;
use crate::membership::Member;
use crate::organization::{
    DeletionSummary, NewOrganization, Organization, OrganizationPatch, OrganizationSummary,
};

impl TenancyService {
    /// Create an organization owned by the caller.
    ///
    /// Any authenticated caller may create one, subject to the
    /// per-user organization limit.
    #[instrument(skip(self, ctx, input), fields(name = %input.name))]
    pub async fn create_organization(
        &self,
        ctx: &RequestContext,
        input: NewOrganization,
    ) -> OrgResult<Organization> {
        let identity = self.authenticate(ctx).await?;
        self.hooks
            .organizations
            .before_create_organization(identity.user_id, &input)
            .await?;

        let org = self
            .organizations
            .create(identity.user_id, input)
            .await?;

        self.hooks
            .organizations
            .on_organization_created(&OrganizationCreated {
                organization_id: org.id,
                name: org.name.clone(),
                slug: org.slug.clone(),
                created_by: identity.user_id,
            })
            .await;
        Ok(org)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_organization(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
    ) -> OrgResult<Organization> {
        Ok(self.reader(ctx, org_id).await?.org)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_organization_by_slug(
        &self,
        ctx: &RequestContext,
        slug: &str,
    ) -> OrgResult<Organization> {
        let identity = self.authenticate(ctx).await?;
        let org = self
            .organizations
            .get_by_slug(slug)
            .await?
            .ok_or(OrgError::Unauthorized)?;
        Ok(self.member_of(identity, org.id).await?.org)
    }

    /// Every organization the caller belongs to, with their role in it.
    #[instrument(skip(self, ctx))]
    pub async fn list_my_organizations(
        &self,
        ctx: &RequestContext,
    ) -> OrgResult<Vec<OrganizationSummary>> {
        let identity = self.authenticate(ctx).await?;
        let memberships = self
            .ctx
            .stores
            .members
            .list_memberships_for_user(identity.user_id)
            .await?;

        let mut summaries = Vec::with_capacity(memberships.len());
        for member in memberships {
            let Some(org) = self.organizations.get(member.organization_id).await? else {
                continue;
            };
            summaries.push(OrganizationSummary {
                id: org.id,
                is_owner: org.owner_id == identity.user_id,
                name: org.name,
                slug: org.slug,
                logo: org.logo,
                status: org.status,
                role: member.role,
                membership_status: member.status,
            });
        }
        Ok(summaries)
    }

    /// Update an organization.
    ///
    /// A suspended or archived organization accepts only a patch that sets
    /// it back to active.
    #[instrument(skip(self, ctx, patch))]
    pub async fn update_organization(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        patch: OrganizationPatch,
    ) -> OrgResult<Organization> {
        let caller = self.reader(ctx, org_id).await?;
        ensure_caller_active(&caller)?;
        if !patch.reactivates() {
            ensure_org_active(&caller.org)?;
        }
        self.require(&caller, Operation::UpdateOrganization, Scope::organization(org_id))
            .await?;

        self.hooks
            .organizations
            .before_update_organization(&caller.org, &patch, caller.user_id())
            .await?;
        self.organizations.update(org_id, patch).await
    }

    /// Delete an organization with all of its members, teams and invitations.
    #[instrument(skip(self, ctx))]
    pub async fn delete_organization(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
    ) -> OrgResult<DeletionSummary> {
        let caller = self.gate(ctx, org_id, Operation::DeleteOrganization).await?;
        self.hooks
            .organizations
            .before_delete_organization(&caller.org, caller.user_id())
            .await?;

        let summary = self.organizations.delete(org_id).await?;

        self.hooks
            .organizations
            .on_organization_deleted(&OrganizationDeleted {
                organization_id: org_id,
                deleted_by: caller.user_id(),
                members_removed: summary.members_removed,
                teams_removed: summary.teams_removed,
            })
            .await;
        Ok(summary)
    }

    /// Join without an invitation.
    ///
    /// Allowed when the organization does not require invitations and either
    /// accepts public signups or lists the caller's e-mail domain.
    #[instrument(skip(self, ctx))]
    pub async fn join_organization(&self, ctx: &RequestContext, org_id: Uuid) -> OrgResult<Member> {
        let identity = self.authenticate(ctx).await?;
        let user_id = identity.user_id;
        let org = self
            .organizations
            .get(org_id)
            .await?
            .ok_or(OrgError::Unauthorized)?;
        ensure_org_active(&org)?;

        if self.members.get(org_id, user_id).await?.is_some() {
            return Err(OrgError::AlreadyExists(format!(
                "user {user_id} is already a member"
            )));
        }
        if org.settings.require_invitation_to_join {
            return Err(OrgError::Forbidden(
                "organization requires an invitation to join".into(),
            ));
        }
        let domain_allowed = match self.identifier_of(&identity).await {
            Some(identifier) => org.allows_domain_of(&identifier),
            None => false,
        };
        if !org.settings.allow_public_signup && !domain_allowed {
            return Err(OrgError::Forbidden(
                "organization is not open for joining".into(),
            ));
        }

        let role = self.ctx.config.default_member_role.clone();
        self.hooks
            .members
            .before_add_member(org_id, user_id, &role, user_id)
            .await?;
        let member = self.members.add(org_id, user_id, &role, None).await?;

        info!(%org_id, %user_id, domain_allowed, "User joined organization");
        self.hooks
            .members
            .on_member_added(&MemberAdded {
                organization_id: org_id,
                user_id,
                role,
                added_by: None,
            })
            .await;
        Ok(member)
    }

    /// Hand structural ownership to another active member.
    ///
    /// Only the current structural owner may do this. The new owner receives
    /// the creator role; the caller drops to `fallback_role` (the configured
    /// transfer fallback when `None`).
    #[instrument(skip(self, ctx))]
    pub async fn transfer_ownership(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        new_owner_id: Uuid,
        fallback_role: Option<String>,
    ) -> OrgResult<Organization> {
        let caller = self.writer(ctx, org_id).await?;
        let transfer = self
            .organizations
            .transfer_ownership(org_id, caller.user_id(), new_owner_id, fallback_role)
            .await?;

        self.hooks
            .organizations
            .on_ownership_transferred(&OwnershipTransferred {
                organization_id: org_id,
                previous_owner_id: transfer.previous_owner_id,
                new_owner_id,
                previous_owner_role: transfer.previous_owner_role,
            })
            .await;
        Ok(transfer.organization)
    }

    /// Leave an organization.
    ///
    /// The last active holder of the creator role cannot leave. When the
    /// structural owner leaves, ownership passes to the longest-standing
    /// remaining creator-role holder.
    #[instrument(skip(self, ctx))]
    pub async fn leave_organization(&self, ctx: &RequestContext, org_id: Uuid) -> OrgResult<()> {
        let caller = self.writer(ctx, org_id).await?;
        let user_id = caller.user_id();

        let successors: Vec<Member> = self
            .members
            .creator_role_holders(org_id)
            .await?
            .into_iter()
            .filter(|m| m.user_id != user_id)
            .collect();
        if self.ctx.is_creator_role(&caller.member.role) && successors.is_empty() {
            return Err(OrgError::InvalidState(
                "cannot leave as the last owner".into(),
            ));
        }

        self.hooks
            .members
            .before_remove_member(org_id, user_id, user_id)
            .await?;

        if caller.org.owner_id == user_id {
            match successors.first() {
                Some(successor) => {
                    self.organizations
                        .reassign_owner(org_id, successor.user_id)
                        .await?
                }
                None => {
                    return Err(OrgError::InvalidState(
                        "cannot leave as the last owner".into(),
                    ))
                }
            }
        }
        self.members.remove(org_id, user_id).await?;

        info!(%org_id, %user_id, "Member left organization");
        self.hooks
            .members
            .on_member_left(&MemberLeft {
                organization_id: org_id,
                user_id,
            })
            .await;
        Ok(())
    }
}
