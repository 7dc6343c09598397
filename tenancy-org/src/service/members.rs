use serde::{Deserialize, Serialize};
use tenancy_events::{MemberAdded, MemberRemoved, MemberRoleChanged};
use tracing::instrument;
use uuid::Uuid;

use super::{Caller, TenancyService};
use crate::bulk::BulkResult;
use crate::config::Operation;
use crate::error::{OrgError, OrgResult};
use crate::identity::{RequestContext, WithProfile};
use crate::membership::{Member, MemberStatusFilter};

/// One entry of a bulk add.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    pub user_id: Uuid,
    pub role: String,
}

impl NewMember {
    pub fn new(user_id: Uuid, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

impl TenancyService {
    #[instrument(skip(self, ctx))]
    pub async fn add_member(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
        role: &str,
    ) -> OrgResult<Member> {
        let caller = self.gate(ctx, org_id, Operation::AddMember).await?;
        self.add_member_as(&caller, user_id, role).await
    }

    /// Add several members; each entry succeeds or fails on its own.
    #[instrument(skip(self, ctx, entries), fields(count = entries.len()))]
    pub async fn bulk_add_members(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        entries: Vec<NewMember>,
    ) -> OrgResult<BulkResult<Uuid>> {
        let caller = self.gate(ctx, org_id, Operation::AddMember).await?;
        let mut result = BulkResult::new();
        for entry in entries {
            let outcome = self
                .add_member_as(&caller, entry.user_id, &entry.role)
                .await
                .map(|m| m.user_id);
            result.record(entry.user_id, outcome)?;
        }
        Ok(result)
    }

    async fn add_member_as(&self, caller: &Caller, user_id: Uuid, role: &str) -> OrgResult<Member> {
        let org_id = caller.org_id();
        self.hooks
            .members
            .before_add_member(org_id, user_id, role, caller.user_id())
            .await?;
        let member = self
            .members
            .add(org_id, user_id, role, Some(caller.user_id()))
            .await?;

        self.hooks
            .members
            .on_member_added(&MemberAdded {
                organization_id: org_id,
                user_id,
                role: member.role.clone(),
                added_by: Some(caller.user_id()),
            })
            .await;
        Ok(member)
    }

    /// Remove a member. The structural owner and the last active creator-role
    /// holder cannot be removed.
    #[instrument(skip(self, ctx))]
    pub async fn remove_member(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
    ) -> OrgResult<()> {
        let caller = self.gate(ctx, org_id, Operation::RemoveMember).await?;
        self.remove_member_as(&caller, user_id).await
    }

    #[instrument(skip(self, ctx, user_ids), fields(count = user_ids.len()))]
    pub async fn bulk_remove_members(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> OrgResult<BulkResult<Uuid>> {
        let caller = self.gate(ctx, org_id, Operation::RemoveMember).await?;
        let mut result = BulkResult::new();
        for user_id in user_ids {
            let outcome = self
                .remove_member_as(&caller, user_id)
                .await
                .map(|()| user_id);
            result.record(user_id, outcome)?;
        }
        Ok(result)
    }

    async fn remove_member_as(&self, caller: &Caller, user_id: Uuid) -> OrgResult<()> {
        let org_id = caller.org_id();
        let target = self
            .members
            .get(org_id, user_id)
            .await?
            .ok_or_else(|| OrgError::not_found("member"))?;
        if caller.org.owner_id == user_id {
            return Err(OrgError::InvalidState(
                "the organization owner cannot be removed".into(),
            ));
        }
        self.ensure_not_last_creator(&target).await?;

        self.hooks
            .members
            .before_remove_member(org_id, user_id, caller.user_id())
            .await?;
        self.members.remove(org_id, user_id).await?;

        self.hooks
            .members
            .on_member_removed(&MemberRemoved {
                organization_id: org_id,
                user_id,
                removed_by: caller.user_id(),
            })
            .await;
        Ok(())
    }

    /// Change a member's role.
    ///
    /// The structural owner's role is fixed, and the last active creator-role
    /// holder cannot be demoted.
    #[instrument(skip(self, ctx))]
    pub async fn update_member_role(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
        role: &str,
    ) -> OrgResult<Member> {
        let caller = self.gate(ctx, org_id, Operation::UpdateMemberRole).await?;
        let target = self
            .members
            .get(org_id, user_id)
            .await?
            .ok_or_else(|| OrgError::not_found("member"))?;
        if target.role == role.trim() {
            return Ok(target);
        }
        if caller.org.owner_id == user_id {
            return Err(OrgError::InvalidState(
                "cannot change the role of the organization owner".into(),
            ));
        }
        if !self.ctx.is_creator_role(role) {
            self.ensure_not_last_creator(&target).await?;
        }

        self.hooks
            .members
            .before_update_member_role(org_id, user_id, role, caller.user_id())
            .await?;
        let (member, old_role) = self.members.update_role(org_id, user_id, role).await?;

        self.hooks
            .members
            .on_member_role_changed(&MemberRoleChanged {
                organization_id: org_id,
                user_id,
                old_role,
                new_role: member.role.clone(),
                changed_by: caller.user_id(),
            })
            .await;
        Ok(member)
    }

    async fn ensure_not_last_creator(&self, target: &Member) -> OrgResult<()> {
        if !self.ctx.is_creator_role(&target.role) {
            return Ok(());
        }
        let others = self
            .members
            .creator_role_holders(target.organization_id)
            .await?
            .into_iter()
            .filter(|m| m.user_id != target.user_id)
            .count();
        if others == 0 {
            return Err(OrgError::InvalidState(format!(
                "cannot remove the last {}",
                self.ctx.config.creator_role
            )));
        }
        Ok(())
    }

    /// Suspend a member. Their roles stay in place, but every mutating call
    /// they make is rejected until they are unsuspended.
    #[instrument(skip(self, ctx))]
    pub async fn suspend_member(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
    ) -> OrgResult<Member> {
        let caller = self.gate(ctx, org_id, Operation::SuspendMember).await?;
        if caller.user_id() == user_id {
            return Err(OrgError::InvalidState("cannot suspend yourself".into()));
        }
        if caller.org.owner_id == user_id {
            return Err(OrgError::InvalidState(
                "the organization owner cannot be suspended".into(),
            ));
        }
        self.members.set_suspended(org_id, user_id, true).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn unsuspend_member(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
    ) -> OrgResult<Member> {
        self.gate(ctx, org_id, Operation::SuspendMember).await?;
        self.members.set_suspended(org_id, user_id, false).await
    }

    /// Members with their profiles. Active members only unless `filter`
    /// says otherwise.
    #[instrument(skip(self, ctx))]
    pub async fn list_members(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        filter: MemberStatusFilter,
    ) -> OrgResult<Vec<WithProfile<Member>>> {
        self.reader(ctx, org_id).await?;
        let members = self.members.list(org_id, filter).await?;
        let mut enriched = Vec::with_capacity(members.len());
        for member in members {
            enriched.push(self.with_profile(member.user_id, member).await);
        }
        Ok(enriched)
    }

    #[instrument(skip(self, ctx))]
    pub async fn count_members(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        filter: MemberStatusFilter,
    ) -> OrgResult<usize> {
        self.reader(ctx, org_id).await?;
        self.members.count(org_id, filter).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_member(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
    ) -> OrgResult<WithProfile<Member>> {
        self.reader(ctx, org_id).await?;
        let member = self
            .members
            .get(org_id, user_id)
            .await?
            .ok_or_else(|| OrgError::not_found("member"))?;
        Ok(self.with_profile(user_id, member).await)
    }
}
