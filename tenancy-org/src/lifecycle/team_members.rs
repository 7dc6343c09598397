//! Team membership.

use tenancy_rbac::Scope;
use tracing::info;
use uuid::Uuid;

use super::teams::TeamHierarchy;
use super::LifecycleContext;
use crate::error::{OrgError, OrgResult};
use crate::membership::TeamMember;
use crate::team::Team;

/// Team membership writes.
#[derive(Debug, Clone)]
pub struct TeamMembership {
    ctx: LifecycleContext,
    teams: TeamHierarchy,
}

impl TeamMembership {
    pub fn new(ctx: LifecycleContext) -> Self {
        let teams = TeamHierarchy::new(ctx.clone());
        Self { ctx, teams }
    }

    pub async fn get(&self, team_id: Uuid, user_id: Uuid) -> OrgResult<Option<TeamMember>> {
        Ok(self
            .ctx
            .stores
            .team_members
            .get_team_member(team_id, user_id)
            .await?)
    }

    /// Add an active organization member to a team.
    ///
    /// Writes the row, records the team relation, then assigns the optional
    /// team role in team scope.
    pub async fn add(
        &self,
        org_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        role: Option<String>,
        added_by: Uuid,
    ) -> OrgResult<TeamMember> {
        self.teams.get_in(org_id, team_id).await?;
        let role = normalize_role(role);

        match self.ctx.stores.members.get_member(org_id, user_id).await? {
            Some(member) if member.is_active() => {}
            _ => {
                return Err(OrgError::InvalidState(
                    "user is not an active member of the organization".into(),
                ))
            }
        }
        if self.get(team_id, user_id).await?.is_some() {
            return Err(OrgError::AlreadyExists(format!(
                "user {user_id} is already in this team"
            )));
        }

        let tm = TeamMember::new(team_id, org_id, user_id, role).with_adder(added_by);
        self.ctx.stores.team_members.insert_team_member(&tm).await?;
        self.ctx
            .sync
            .add_team_relation(user_id, team_id, org_id)
            .await?;
        if let Some(role) = &tm.role {
            self.ctx
                .sync
                .assign_role(user_id, role, Scope::team(team_id, org_id))
                .await?;
        }

        info!(%org_id, %team_id, %user_id, "Team member added");
        Ok(tm)
    }

    pub async fn remove(
        &self,
        org_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
    ) -> OrgResult<TeamMember> {
        self.teams.get_in(org_id, team_id).await?;
        let tm = self
            .get(team_id, user_id)
            .await?
            .ok_or_else(|| OrgError::not_found("team member"))?;

        self.ctx
            .sync
            .remove_team_relation(user_id, team_id, org_id)
            .await?;
        self.ctx
            .stores
            .team_members
            .delete_team_member(team_id, user_id)
            .await?;
        if let Some(role) = &tm.role {
            self.ctx
                .sync
                .revoke_role(user_id, role, Scope::team(team_id, org_id))
                .await?;
        }

        info!(%org_id, %team_id, %user_id, "Team member removed");
        Ok(tm)
    }

    /// Set or clear the team-scoped role. Returns the member and the old role.
    pub async fn update_role(
        &self,
        org_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        role: Option<String>,
    ) -> OrgResult<(TeamMember, Option<String>)> {
        self.teams.get_in(org_id, team_id).await?;
        let mut tm = self
            .get(team_id, user_id)
            .await?
            .ok_or_else(|| OrgError::not_found("team member"))?;
        let role = normalize_role(role);
        if tm.role == role {
            let old = tm.role.clone();
            return Ok((tm, old));
        }

        let old_role = std::mem::replace(&mut tm.role, role);
        self.ctx.stores.team_members.update_team_member(&tm).await?;

        let scope = Scope::team(team_id, org_id);
        if let Some(old) = &old_role {
            self.ctx.sync.revoke_role(user_id, old, scope).await?;
        }
        if let Some(new) = &tm.role {
            self.ctx.sync.assign_role(user_id, new, scope).await?;
        }

        info!(%org_id, %team_id, %user_id, "Team member role changed");
        Ok((tm, old_role))
    }

    pub async fn list(&self, org_id: Uuid, team_id: Uuid) -> OrgResult<Vec<TeamMember>> {
        self.teams.get_in(org_id, team_id).await?;
        Ok(self.ctx.stores.team_members.list_team_members(team_id).await?)
    }

    /// Teams of `user_id` inside `org_id`.
    pub async fn teams_of(&self, org_id: Uuid, user_id: Uuid) -> OrgResult<Vec<Team>> {
        let memberships = self
            .ctx
            .stores
            .team_members
            .list_team_memberships_for_user(org_id, user_id)
            .await?;
        let mut teams = Vec::with_capacity(memberships.len());
        for tm in memberships {
            if let Some(team) = self.ctx.stores.teams.get_team(tm.team_id).await? {
                teams.push(team);
            }
        }
        Ok(teams)
    }
}

fn normalize_role(role: Option<String>) -> Option<String> {
    role.map(|r| r.trim().to_string()).filter(|r| !r.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TenancyConfig;
    use crate::lifecycle::MembershipLifecycle;
    use crate::store::Stores;
    use crate::sync::{AuthorizationSync, TEAM_MEMBER_RELATION};
    use crate::team::NewTeam;
    use std::sync::Arc;
    use tenancy_rbac::{AuthorizationClient, MemoryPolicyEngine};

    struct Fixture {
        members: MembershipLifecycle,
        teams: TeamHierarchy,
        team_members: TeamMembership,
        engine: MemoryPolicyEngine,
    }

    fn fixture() -> Fixture {
        let engine = MemoryPolicyEngine::new();
        let ctx = LifecycleContext::new(
            Stores::memory(),
            AuthorizationSync::new(Arc::new(engine.clone())),
            TenancyConfig::default(),
        );
        Fixture {
            members: MembershipLifecycle::new(ctx.clone()),
            teams: TeamHierarchy::new(ctx.clone()),
            team_members: TeamMembership::new(ctx),
            engine,
        }
    }

    #[tokio::test]
    async fn test_add_requires_active_org_member() {
        let f = fixture();
        let org = Uuid::now_v7();
        let team = f.teams.create(org, NewTeam::named("Eng")).await.unwrap();
        let outsider = Uuid::now_v7();

        let err = f
            .team_members
            .add(org, team.id, outsider, None, Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, OrgError::InvalidState(_)));

        f.members.add(org, outsider, "member", None).await.unwrap();
        f.members.set_suspended(org, outsider, true).await.unwrap();
        let err = f
            .team_members
            .add(org, team.id, outsider, None, Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, OrgError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_add_and_remove_sync_relation_and_role() {
        let f = fixture();
        let org = Uuid::now_v7();
        let user = Uuid::now_v7();
        let team = f.teams.create(org, NewTeam::named("Eng")).await.unwrap();
        let scope = Scope::team(team.id, org);
        f.members.add(org, user, "member", None).await.unwrap();

        f.team_members
            .add(org, team.id, user, Some("lead".into()), user)
            .await
            .unwrap();
        assert!(f.engine.has_relation(user, TEAM_MEMBER_RELATION, scope).await);
        assert_eq!(
            f.engine.get_user_roles(user, scope).await.unwrap(),
            vec!["lead".to_string()]
        );

        let err = f
            .team_members
            .add(org, team.id, user, None, user)
            .await
            .unwrap_err();
        assert!(matches!(err, OrgError::AlreadyExists(_)));

        f.team_members.remove(org, team.id, user).await.unwrap();
        assert!(!f.engine.has_relation(user, TEAM_MEMBER_RELATION, scope).await);
        assert!(f.engine.get_user_roles(user, scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_role_clears_and_sets() {
        let f = fixture();
        let org = Uuid::now_v7();
        let user = Uuid::now_v7();
        let team = f.teams.create(org, NewTeam::named("Eng")).await.unwrap();
        let scope = Scope::team(team.id, org);
        f.members.add(org, user, "member", None).await.unwrap();
        f.team_members.add(org, team.id, user, None, user).await.unwrap();

        let (tm, old) = f
            .team_members
            .update_role(org, team.id, user, Some("lead".into()))
            .await
            .unwrap();
        assert!(old.is_none());
        assert_eq!(tm.role.as_deref(), Some("lead"));

        let (tm, old) = f
            .team_members
            .update_role(org, team.id, user, Some("  ".into()))
            .await
            .unwrap();
        assert_eq!(old.as_deref(), Some("lead"));
        assert!(tm.role.is_none());
        assert!(f.engine.get_user_roles(user, scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_teams_of_user() {
        let f = fixture();
        let org = Uuid::now_v7();
        let user = Uuid::now_v7();
        f.members.add(org, user, "member", None).await.unwrap();
        let eng = f.teams.create(org, NewTeam::named("Eng")).await.unwrap();
        f.teams.create(org, NewTeam::named("Sales")).await.unwrap();
        f.team_members.add(org, eng.id, user, None, user).await.unwrap();

        let teams = f.team_members.teams_of(org, user).await.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].id, eng.id);
    }
}
