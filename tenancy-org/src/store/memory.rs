//! In-memory store for tests and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    InvitationStore, MemberStore, OrganizationStore, StoreError, StoreResult, TeamMemberStore,
    TeamStore,
};
use crate::invitation::{normalize_identifier, Invitation};
use crate::membership::{Member, TeamMember};
use crate::organization::Organization;
use crate::team::Team;

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    members: HashMap<(Uuid, Uuid), Member>,
    teams: HashMap<Uuid, Team>,
    team_members: HashMap<(Uuid, Uuid), TeamMember>,
    invitations: HashMap<Uuid, Invitation>,
}

/// All five entity stores over one `RwLock`-guarded set of tables.
///
/// Cloning shares the tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_unique<K, V>(map: &mut HashMap<K, V>, key: K, value: V, what: &str) -> StoreResult<()>
where
    K: std::hash::Hash + Eq + std::fmt::Debug,
{
    if map.contains_key(&key) {
        return Err(StoreError::Conflict(format!("{what} {key:?} already exists")));
    }
    map.insert(key, value);
    Ok(())
}

fn replace<K, V>(map: &mut HashMap<K, V>, key: K, value: V, entity: &'static str) -> StoreResult<()>
where
    K: std::hash::Hash + Eq + std::fmt::Debug,
{
    match map.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(StoreError::not_found(entity, format!("{key:?}"))),
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn insert_organization(&self, org: &Organization) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        insert_unique(&mut tables.organizations, org.id, org.clone(), "organization")
    }

    async fn get_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.tables.read().await.organizations.get(&id).cloned())
    }

    async fn get_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        let tables = self.tables.read().await;
        Ok(tables
            .organizations
            .values()
            .find(|org| org.slug == slug)
            .cloned())
    }

    async fn update_organization(&self, org: &Organization) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.organizations, org.id, org.clone(), "organization")
    }

    async fn delete_organization(&self, id: Uuid) -> StoreResult<()> {
        self.tables.write().await.organizations.remove(&id);
        Ok(())
    }

    async fn count_organizations_owned_by(&self, user_id: Uuid) -> StoreResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .organizations
            .values()
            .filter(|org| org.owner_id == user_id)
            .count())
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn insert_member(&self, member: &Member) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let key = (member.organization_id, member.user_id);
        insert_unique(&mut tables.members, key, member.clone(), "member")
    }

    async fn get_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>> {
        Ok(self
            .tables
            .read()
            .await
            .members
            .get(&(org_id, user_id))
            .cloned())
    }

    async fn update_member(&self, member: &Member) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let key = (member.organization_id, member.user_id);
        replace(&mut tables.members, key, member.clone(), "member")
    }

    async fn delete_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.tables.write().await.members.remove(&(org_id, user_id));
        Ok(())
    }

    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<Member>> {
        let tables = self.tables.read().await;
        let mut members: Vec<Member> = tables
            .members
            .values()
            .filter(|m| m.organization_id == org_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.joined_at, m.user_id));
        Ok(members)
    }

    async fn list_memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Member>> {
        let tables = self.tables.read().await;
        let mut members: Vec<Member> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.joined_at, m.organization_id));
        Ok(members)
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn insert_team(&self, team: &Team) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        insert_unique(&mut tables.teams, team.id, team.clone(), "team")
    }

    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.tables.read().await.teams.get(&id).cloned())
    }

    async fn get_team_by_slug(&self, org_id: Uuid, slug: &str) -> StoreResult<Option<Team>> {
        let tables = self.tables.read().await;
        Ok(tables
            .teams
            .values()
            .find(|t| t.organization_id == org_id && t.slug == slug)
            .cloned())
    }

    async fn update_team(&self, team: &Team) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.teams, team.id, team.clone(), "team")
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<()> {
        self.tables.write().await.teams.remove(&id);
        Ok(())
    }

    async fn list_teams(&self, org_id: Uuid) -> StoreResult<Vec<Team>> {
        let tables = self.tables.read().await;
        let mut teams: Vec<Team> = tables
            .teams
            .values()
            .filter(|t| t.organization_id == org_id)
            .cloned()
            .collect();
        teams.sort_by_key(|t| (t.created_at, t.id));
        Ok(teams)
    }
}

#[async_trait]
impl TeamMemberStore for MemoryStore {
    async fn insert_team_member(&self, member: &TeamMember) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let key = (member.team_id, member.user_id);
        insert_unique(&mut tables.team_members, key, member.clone(), "team member")
    }

    async fn get_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TeamMember>> {
        Ok(self
            .tables
            .read()
            .await
            .team_members
            .get(&(team_id, user_id))
            .cloned())
    }

    async fn update_team_member(&self, member: &TeamMember) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let key = (member.team_id, member.user_id);
        replace(&mut tables.team_members, key, member.clone(), "team member")
    }

    async fn delete_team_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .team_members
            .remove(&(team_id, user_id));
        Ok(())
    }

    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<TeamMember>> {
        let tables = self.tables.read().await;
        let mut members: Vec<TeamMember> = tables
            .team_members
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.added_at, m.user_id));
        Ok(members)
    }

    async fn list_team_memberships_for_user(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Vec<TeamMember>> {
        let tables = self.tables.read().await;
        let mut members: Vec<TeamMember> = tables
            .team_members
            .values()
            .filter(|m| m.organization_id == org_id && m.user_id == user_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.added_at, m.team_id));
        Ok(members)
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        insert_unique(
            &mut tables.invitations,
            invitation.id,
            invitation.clone(),
            "invitation",
        )
    }

    async fn get_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        Ok(self.tables.read().await.invitations.get(&id).cloned())
    }

    async fn update_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        replace(
            &mut tables.invitations,
            invitation.id,
            invitation.clone(),
            "invitation",
        )
    }

    async fn delete_invitation(&self, id: Uuid) -> StoreResult<()> {
        self.tables.write().await.invitations.remove(&id);
        Ok(())
    }

    async fn list_invitations(&self, org_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let tables = self.tables.read().await;
        let mut invitations: Vec<Invitation> = tables
            .invitations
            .values()
            .filter(|i| i.organization_id == org_id)
            .cloned()
            .collect();
        invitations.sort_by_key(|i| (i.created_at, i.id));
        Ok(invitations)
    }

    async fn list_invitations_for_identifier(
        &self,
        identifier: &str,
    ) -> StoreResult<Vec<Invitation>> {
        let wanted = normalize_identifier(identifier);
        let tables = self.tables.read().await;
        let mut invitations: Vec<Invitation> = tables
            .invitations
            .values()
            .filter(|i| normalize_identifier(&i.invitee_identifier) == wanted)
            .cloned()
            .collect();
        invitations.sort_by_key(|i| (i.created_at, i.id));
        Ok(invitations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_organization_crud() {
        let store = MemoryStore::new();
        let owner = Uuid::now_v7();
        let mut org = Organization::new("Acme", "acme", owner);

        store.insert_organization(&org).await.unwrap();
        assert!(matches!(
            store.insert_organization(&org).await,
            Err(StoreError::Conflict(_))
        ));

        org.name = "Acme Inc".into();
        store.update_organization(&org).await.unwrap();

        let loaded = store.get_organization_by_slug("acme").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Acme Inc");
        assert_eq!(store.count_organizations_owned_by(owner).await.unwrap(), 1);

        store.delete_organization(org.id).await.unwrap();
        store.delete_organization(org.id).await.unwrap();
        assert!(store.get_organization(org.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let member = Member::new(Uuid::now_v7(), Uuid::now_v7(), "member");

        let err = store.update_member(&member).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "member", .. }));
    }

    #[tokio::test]
    async fn test_team_slug_lookup_is_per_organization() {
        let store = MemoryStore::new();
        let org_a = Uuid::now_v7();
        let org_b = Uuid::now_v7();
        store.insert_team(&Team::new(org_a, "Eng", "eng")).await.unwrap();

        assert!(store.get_team_by_slug(org_a, "eng").await.unwrap().is_some());
        assert!(store.get_team_by_slug(org_b, "eng").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_team_memberships_filtered_by_org() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let org_a = Uuid::now_v7();
        let org_b = Uuid::now_v7();

        store
            .insert_team_member(&TeamMember::new(Uuid::now_v7(), org_a, user, None))
            .await
            .unwrap();
        store
            .insert_team_member(&TeamMember::new(Uuid::now_v7(), org_b, user, None))
            .await
            .unwrap();

        let in_a = store.list_team_memberships_for_user(org_a, user).await.unwrap();
        assert_eq!(in_a.len(), 1);
        assert_eq!(in_a[0].organization_id, org_a);
    }

    #[tokio::test]
    async fn test_clones_share_tables() {
        let store = MemoryStore::new();
        let other = store.clone();
        let member = Member::new(Uuid::now_v7(), Uuid::now_v7(), "member");

        store.insert_member(&member).await.unwrap();
        assert!(other
            .get_member(member.organization_id, member.user_id)
            .await
            .unwrap()
            .is_some());
    }
}
