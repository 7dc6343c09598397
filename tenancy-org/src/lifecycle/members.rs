//! Organization membership lifecycle.

use tenancy_rbac::Scope;
use tracing::{debug, info};
use uuid::Uuid;

use super::{require_text, LifecycleContext};
use crate::error::{OrgError, OrgResult};
use crate::membership::{Member, MemberStatusFilter};

/// Member writes.
#[derive(Debug, Clone)]
pub struct MembershipLifecycle {
    ctx: LifecycleContext,
}

impl MembershipLifecycle {
    pub fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    pub async fn get(&self, org_id: Uuid, user_id: Uuid) -> OrgResult<Option<Member>> {
        Ok(self.ctx.stores.members.get_member(org_id, user_id).await?)
    }

    async fn require(&self, org_id: Uuid, user_id: Uuid) -> OrgResult<Member> {
        self.get(org_id, user_id)
            .await?
            .ok_or_else(|| OrgError::not_found("member"))
    }

    pub async fn list(&self, org_id: Uuid, filter: MemberStatusFilter) -> OrgResult<Vec<Member>> {
        let members = self.ctx.stores.members.list_members(org_id).await?;
        Ok(members
            .into_iter()
            .filter(|m| filter.matches(m.status))
            .collect())
    }

    pub async fn count(&self, org_id: Uuid, filter: MemberStatusFilter) -> OrgResult<usize> {
        Ok(self.list(org_id, filter).await?.len())
    }

    /// Fail with `LimitExceeded` if one more member would break the limit.
    pub(crate) async fn ensure_capacity(&self, org_id: Uuid) -> OrgResult<()> {
        if let Some(limit) = self.ctx.config.limits.max_members_per_organization {
            let current = self.count(org_id, MemberStatusFilter::All).await?;
            if current >= limit {
                return Err(OrgError::LimitExceeded {
                    resource: "member",
                    limit,
                });
            }
        }
        Ok(())
    }

    /// Add an active member and assign their role.
    pub async fn add(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: &str,
        added_by: Option<Uuid>,
    ) -> OrgResult<Member> {
        let role = require_text("role", role)?;
        if self.get(org_id, user_id).await?.is_some() {
            return Err(OrgError::AlreadyExists(format!(
                "user {user_id} is already a member"
            )));
        }
        self.ensure_capacity(org_id).await?;

        let member = Member::new(org_id, user_id, role.as_str()).with_inviter(added_by);
        self.ctx.stores.members.insert_member(&member).await?;
        self.ctx
            .sync
            .assign_role(user_id, &role, Scope::organization(org_id))
            .await?;

        info!(%org_id, %user_id, %role, "Member added");
        Ok(member)
    }

    /// Remove a member and everything tied to them in this organization.
    ///
    /// Team relations go first, then the team rows and the member row, and
    /// the organization role and direct overrides are revoked last.
    pub async fn remove(&self, org_id: Uuid, user_id: Uuid) -> OrgResult<Member> {
        let stores = &self.ctx.stores;
        let sync = &self.ctx.sync;
        let member = self.require(org_id, user_id).await?;

        let team_memberships = stores
            .team_members
            .list_team_memberships_for_user(org_id, user_id)
            .await?;
        for tm in &team_memberships {
            sync.remove_team_relation(user_id, tm.team_id, org_id).await?;
            if let Some(role) = &tm.role {
                sync.revoke_role(user_id, role, Scope::team(tm.team_id, org_id))
                    .await?;
            }
        }
        for tm in &team_memberships {
            stores
                .team_members
                .delete_team_member(tm.team_id, user_id)
                .await?;
        }

        stores.members.delete_member(org_id, user_id).await?;
        sync.revoke_role(user_id, &member.role, Scope::organization(org_id))
            .await?;
        let overrides = sync
            .clear_overrides(Some(user_id), Scope::organization(org_id))
            .await?;

        info!(
            %org_id,
            %user_id,
            teams = team_memberships.len(),
            overrides,
            "Member removed"
        );
        Ok(member)
    }

    /// Change a member's role. Returns the updated member and the old role.
    ///
    /// The row is written first, then the old role revoked and the new one
    /// assigned.
    pub async fn update_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        new_role: &str,
    ) -> OrgResult<(Member, String)> {
        let new_role = require_text("role", new_role)?;
        let mut member = self.require(org_id, user_id).await?;
        if member.role == new_role {
            debug!(%org_id, %user_id, role = %new_role, "Role unchanged");
            let old = member.role.clone();
            return Ok((member, old));
        }

        let old_role = std::mem::replace(&mut member.role, new_role.clone());
        self.ctx.stores.members.update_member(&member).await?;

        let scope = Scope::organization(org_id);
        self.ctx.sync.revoke_role(user_id, &old_role, scope).await?;
        self.ctx.sync.assign_role(user_id, &new_role, scope).await?;

        info!(%org_id, %user_id, %old_role, %new_role, "Member role changed");
        Ok((member, old_role))
    }

    /// Suspend or reactivate a member. Roles are left untouched.
    pub async fn set_suspended(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        suspended: bool,
    ) -> OrgResult<Member> {
        let mut member = self.require(org_id, user_id).await?;
        if member.is_active() == !suspended {
            return Ok(member);
        }
        member.set_suspended(suspended);
        self.ctx.stores.members.update_member(&member).await?;

        info!(%org_id, %user_id, suspended, "Member suspension changed");
        Ok(member)
    }

    /// Active members holding the creator role, oldest first.
    pub async fn creator_role_holders(&self, org_id: Uuid) -> OrgResult<Vec<Member>> {
        let members = self.list(org_id, MemberStatusFilter::Active).await?;
        Ok(members
            .into_iter()
            .filter(|m| self.ctx.is_creator_role(&m.role))
            .collect())
    }
}
