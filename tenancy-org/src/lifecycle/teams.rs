//! Team hierarchy: create, reparent, delete, and tree listing.
//!
//! The parent pointers of one organization's teams always form a forest.
//! Reparenting walks the candidate parent's ancestor chain and rejects the
//! move if it reaches the team being moved. Deleting a team hands its
//! children to its own parent.

use chrono::Utc;
use tenancy_rbac::Scope;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{require_text, LifecycleContext};
use crate::error::{OrgError, OrgResult};
use crate::slug;
use crate::team::{NewTeam, ParentFilter, Team, TeamNode, TeamPatch};

/// Outcome of a team delete.
#[derive(Debug, Clone)]
pub struct TeamDeletion {
    pub team: Team,
    /// Children moved to the deleted team's parent
    pub children_reparented: usize,
    pub members_removed: usize,
    /// Pending invitations whose team was cleared
    pub invitations_detached: usize,
}

/// Team writes.
#[derive(Debug, Clone)]
pub struct TeamHierarchy {
    ctx: LifecycleContext,
}

impl TeamHierarchy {
    pub fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Resolve a team inside `org_id`.
    ///
    /// Missing teams are `NotFound`; teams of another organization are
    /// `Forbidden`.
    pub async fn get_in(&self, org_id: Uuid, team_id: Uuid) -> OrgResult<Team> {
        let team = self
            .ctx
            .stores
            .teams
            .get_team(team_id)
            .await?
            .ok_or_else(|| OrgError::not_found("team"))?;
        if team.organization_id != org_id {
            return Err(OrgError::Forbidden(
                "team belongs to another organization".into(),
            ));
        }
        Ok(team)
    }

    pub async fn list(&self, org_id: Uuid, filter: ParentFilter) -> OrgResult<Vec<Team>> {
        let teams = self.ctx.stores.teams.list_teams(org_id).await?;
        Ok(teams.into_iter().filter(|t| filter.matches(t)).collect())
    }

    /// All teams of an organization as a forest.
    pub async fn tree(&self, org_id: Uuid) -> OrgResult<Vec<TeamNode>> {
        let teams = self.ctx.stores.teams.list_teams(org_id).await?;
        Ok(TeamNode::build_forest(teams))
    }

    pub async fn create(&self, org_id: Uuid, input: NewTeam) -> OrgResult<Team> {
        let name = require_text("name", &input.name)?;

        if let Some(limit) = self.ctx.config.limits.max_teams_per_organization {
            let current = self.ctx.stores.teams.list_teams(org_id).await?.len();
            if current >= limit {
                return Err(OrgError::LimitExceeded {
                    resource: "team",
                    limit,
                });
            }
        }

        if let Some(parent_id) = input.parent_team_id {
            self.get_in(org_id, parent_id).await?;
        }

        let base = slug::slugify(input.slug.as_deref().unwrap_or(&name), "team");
        let slug = self.unique_slug(org_id, &base).await?;

        let mut team = Team::new(org_id, name, slug).with_parent(input.parent_team_id);
        team.description = input.description;
        team.metadata = input.metadata;
        self.ctx.stores.teams.insert_team(&team).await?;

        info!(%org_id, team_id = %team.id, slug = %team.slug, "Team created");
        Ok(team)
    }

    async fn unique_slug(&self, org_id: Uuid, base: &str) -> OrgResult<String> {
        for candidate in slug::candidates(base) {
            let taken = self
                .ctx
                .stores
                .teams
                .get_team_by_slug(org_id, &candidate)
                .await?;
            if taken.is_none() {
                return Ok(candidate);
            }
            debug!(%org_id, slug = %candidate, "Team slug taken");
        }
        Err(OrgError::AlreadyExists(format!("slug {base} is taken")))
    }

    pub async fn update(&self, org_id: Uuid, team_id: Uuid, patch: TeamPatch) -> OrgResult<Team> {
        let mut team = self.get_in(org_id, team_id).await?;

        if let Some(name) = patch.name {
            team.name = require_text("name", &name)?;
        }
        if let Some(new_slug) = patch.slug {
            let new_slug = new_slug.trim().to_string();
            if !slug::is_valid(&new_slug) {
                return Err(OrgError::InvalidInput(format!("invalid slug: {new_slug}")));
            }
            if new_slug != team.slug {
                let taken = self
                    .ctx
                    .stores
                    .teams
                    .get_team_by_slug(org_id, &new_slug)
                    .await?;
                if taken.is_some() {
                    return Err(OrgError::AlreadyExists(format!("slug {new_slug} is taken")));
                }
                team.slug = new_slug;
            }
        }
        if let Some(description) = patch.description {
            team.description = description;
        }
        if let Some(metadata) = patch.metadata {
            team.metadata = metadata;
        }
        if let Some(parent) = patch.parent {
            if parent != team.parent_team_id {
                if let Some(parent_id) = parent {
                    self.get_in(org_id, parent_id).await?;
                    self.ensure_no_cycle(org_id, team_id, parent_id).await?;
                }
                debug!(%team_id, from = ?team.parent_team_id, to = ?parent, "Reparenting team");
                team.parent_team_id = parent;
            }
        }
        team.updated_at = Utc::now();

        self.ctx.stores.teams.update_team(&team).await?;
        Ok(team)
    }

    /// Reject making `candidate_parent` the parent of `team_id` if `team_id`
    /// is `candidate_parent` or one of its ancestors.
    async fn ensure_no_cycle(
        &self,
        org_id: Uuid,
        team_id: Uuid,
        candidate_parent: Uuid,
    ) -> OrgResult<()> {
        let cycle = || OrgError::InvalidState("team hierarchy cannot contain a cycle".into());
        let bound = self.ctx.stores.teams.list_teams(org_id).await?.len();

        let mut current = Some(candidate_parent);
        let mut steps = 0usize;
        while let Some(id) = current {
            if id == team_id {
                return Err(cycle());
            }
            steps += 1;
            if steps > bound {
                warn!(%org_id, %team_id, "Ancestor walk exceeded team count");
                return Err(cycle());
            }
            current = match self.ctx.stores.teams.get_team(id).await? {
                Some(team) => team.parent_team_id,
                None => None,
            };
        }
        Ok(())
    }

    /// Delete a team.
    ///
    /// Children move to the deleted team's parent, team memberships are
    /// removed (relation first, then row, then team role), overrides held
    /// in the team scope are dropped, pending invitations to the team are
    /// detached, and the team row goes last.
    pub async fn delete(&self, org_id: Uuid, team_id: Uuid) -> OrgResult<TeamDeletion> {
        let stores = &self.ctx.stores;
        let sync = &self.ctx.sync;
        let team = self.get_in(org_id, team_id).await?;

        let children = self.list(org_id, ParentFilter::Children(team_id)).await?;
        for mut child in children.iter().cloned() {
            child.parent_team_id = team.parent_team_id;
            child.updated_at = Utc::now();
            stores.teams.update_team(&child).await?;
        }

        let members = stores.team_members.list_team_members(team_id).await?;
        for tm in &members {
            sync.remove_team_relation(tm.user_id, team_id, org_id).await?;
            stores
                .team_members
                .delete_team_member(team_id, tm.user_id)
                .await?;
            if let Some(role) = &tm.role {
                sync.revoke_role(tm.user_id, role, Scope::team(team_id, org_id))
                    .await?;
            }
        }
        let overrides = sync
            .clear_overrides(None, Scope::team(team_id, org_id))
            .await?;

        let mut invitations_detached = 0;
        for mut invitation in stores.invitations.list_invitations(org_id).await? {
            if invitation.team_id == Some(team_id) && invitation.is_pending() {
                invitation.team_id = None;
                stores.invitations.update_invitation(&invitation).await?;
                invitations_detached += 1;
            }
        }

        stores.teams.delete_team(team_id).await?;

        info!(
            %org_id,
            %team_id,
            children = children.len(),
            members = members.len(),
            overrides,
            "Team deleted"
        );
        Ok(TeamDeletion {
            team,
            children_reparented: children.len(),
            members_removed: members.len(),
            invitations_detached,
        })
    }
}
