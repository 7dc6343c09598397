use tenancy_events::{TeamCreated, TeamDeleted, TeamMemberAdded, TeamMemberRemoved};
use tracing::instrument;
use uuid::Uuid;

use super::TenancyService;
use crate::config::Operation;
use crate::error::{OrgError, OrgResult};
use crate::identity::{RequestContext, WithProfile};
use crate::lifecycle::TeamDeletion;
use crate::membership::TeamMember;
use crate::team::{NewTeam, ParentFilter, Team, TeamNode, TeamPatch};

impl TenancyService {
    /// Create a team, optionally nested under `input.parent_team_id`.
    #[instrument(skip(self, ctx, input), fields(name = %input.name))]
    pub async fn create_team(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        input: NewTeam,
    ) -> OrgResult<Team> {
        let caller = self.gate(ctx, org_id, Operation::CreateTeam).await?;
        self.hooks
            .teams
            .before_create_team(org_id, &input, caller.user_id())
            .await?;

        let team = self.teams.create(org_id, input).await?;

        self.hooks
            .teams
            .on_team_created(&TeamCreated {
                organization_id: org_id,
                team_id: team.id,
                name: team.name.clone(),
                slug: team.slug.clone(),
                parent_team_id: team.parent_team_id,
                created_by: caller.user_id(),
            })
            .await;
        Ok(team)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_team(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        team_id: Uuid,
    ) -> OrgResult<Team> {
        self.reader(ctx, org_id).await?;
        self.teams.get_in(org_id, team_id).await
    }

    #[instrument(skip(self, ctx))]
    pub async fn list_teams(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        filter: ParentFilter,
    ) -> OrgResult<Vec<Team>> {
        self.reader(ctx, org_id).await?;
        self.teams.list(org_id, filter).await
    }

    /// All teams of the organization as a forest of root teams.
    #[instrument(skip(self, ctx))]
    pub async fn get_team_tree(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
    ) -> OrgResult<Vec<TeamNode>> {
        self.reader(ctx, org_id).await?;
        self.teams.tree(org_id).await
    }

    /// Update a team. Reparenting is rejected when it would make the team
    /// its own ancestor.
    #[instrument(skip(self, ctx, patch))]
    pub async fn update_team(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        team_id: Uuid,
        patch: TeamPatch,
    ) -> OrgResult<Team> {
        let caller = self
            .gate_team(ctx, org_id, team_id, Operation::UpdateTeam)
            .await?;
        let team = self.teams.get_in(org_id, team_id).await?;
        self.hooks
            .teams
            .before_update_team(&team, &patch, caller.user_id())
            .await?;
        self.teams.update(org_id, team_id, patch).await
    }

    /// Delete a team. Its children move up to its parent.
    #[instrument(skip(self, ctx))]
    pub async fn delete_team(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        team_id: Uuid,
    ) -> OrgResult<TeamDeletion> {
        let caller = self
            .gate_team(ctx, org_id, team_id, Operation::DeleteTeam)
            .await?;
        let team = self.teams.get_in(org_id, team_id).await?;
        self.hooks
            .teams
            .before_delete_team(&team, caller.user_id())
            .await?;

        let deletion = self.teams.delete(org_id, team_id).await?;

        self.hooks
            .teams
            .on_team_deleted(&TeamDeleted {
                organization_id: org_id,
                team_id,
                deleted_by: caller.user_id(),
            })
            .await;
        Ok(deletion)
    }

    #[instrument(skip(self, ctx))]
    pub async fn add_team_member(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        role: Option<String>,
    ) -> OrgResult<TeamMember> {
        let caller = self
            .gate_team(ctx, org_id, team_id, Operation::AddTeamMember)
            .await?;
        let tm = self
            .team_members
            .add(org_id, team_id, user_id, role, caller.user_id())
            .await?;

        self.hooks
            .teams
            .on_team_member_added(&TeamMemberAdded {
                organization_id: org_id,
                team_id,
                user_id,
                role: tm.role.clone(),
                added_by: caller.user_id(),
            })
            .await;
        Ok(tm)
    }

    #[instrument(skip(self, ctx))]
    pub async fn remove_team_member(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
    ) -> OrgResult<()> {
        let caller = self
            .gate_team(ctx, org_id, team_id, Operation::RemoveTeamMember)
            .await?;
        self.team_members.remove(org_id, team_id, user_id).await?;

        self.hooks
            .teams
            .on_team_member_removed(&TeamMemberRemoved {
                organization_id: org_id,
                team_id,
                user_id,
                removed_by: caller.user_id(),
            })
            .await;
        Ok(())
    }

    /// Set (`Some`) or clear (`None`) a member's team-scoped role.
    #[instrument(skip(self, ctx))]
    pub async fn update_team_member_role(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        role: Option<String>,
    ) -> OrgResult<TeamMember> {
        self.gate_team(ctx, org_id, team_id, Operation::UpdateTeamMemberRole)
            .await?;
        let (tm, _) = self
            .team_members
            .update_role(org_id, team_id, user_id, role)
            .await?;
        Ok(tm)
    }

    #[instrument(skip(self, ctx))]
    pub async fn list_team_members(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        team_id: Uuid,
    ) -> OrgResult<Vec<WithProfile<TeamMember>>> {
        self.reader(ctx, org_id).await?;
        let members = self.team_members.list(org_id, team_id).await?;
        let mut enriched = Vec::with_capacity(members.len());
        for tm in members {
            enriched.push(self.with_profile(tm.user_id, tm).await);
        }
        Ok(enriched)
    }

    /// Teams of `user_id` (the caller when `None`) inside the organization.
    #[instrument(skip(self, ctx))]
    pub async fn list_user_teams(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Option<Uuid>,
    ) -> OrgResult<Vec<Team>> {
        let caller = self.reader(ctx, org_id).await?;
        let user_id = user_id.unwrap_or(caller.user_id());
        if user_id != caller.user_id() && self.members.get(org_id, user_id).await?.is_none() {
            return Err(OrgError::not_found("member"));
        }
        self.team_members.teams_of(org_id, user_id).await
    }
}
