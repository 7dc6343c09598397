//! Organization lifecycle: create, update, cascading delete and ownership
//! transfer.

use chrono::Utc;
use tenancy_rbac::Scope;
use tracing::{debug, info};
use uuid::Uuid;

use super::{require_text, LifecycleContext};
use crate::error::{OrgError, OrgResult};
use crate::membership::Member;
use crate::organization::{
    normalize_domain, DeletionSummary, NewOrganization, Organization, OrganizationPatch,
};
use crate::slug;

/// Outcome of an ownership transfer.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub organization: Organization,
    pub previous_owner_id: Uuid,
    /// Role the previous owner now holds
    pub previous_owner_role: String,
}

/// Organization writes.
#[derive(Debug, Clone)]
pub struct OrganizationLifecycle {
    ctx: LifecycleContext,
}

impl OrganizationLifecycle {
    pub fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    pub async fn get(&self, org_id: Uuid) -> OrgResult<Option<Organization>> {
        Ok(self.ctx.stores.organizations.get_organization(org_id).await?)
    }

    pub async fn get_by_slug(&self, slug: &str) -> OrgResult<Option<Organization>> {
        Ok(self
            .ctx
            .stores
            .organizations
            .get_organization_by_slug(slug)
            .await?)
    }

    /// Create an organization owned by `creator_id`.
    ///
    /// Persists the organization, then the creator's member row, then
    /// assigns the creator role in the new organization's scope.
    pub async fn create(
        &self,
        creator_id: Uuid,
        input: NewOrganization,
    ) -> OrgResult<Organization> {
        let name = require_text("name", &input.name)?;

        if let Some(limit) = self.ctx.config.limits.max_organizations_per_user {
            let owned = self
                .ctx
                .stores
                .organizations
                .count_organizations_owned_by(creator_id)
                .await?;
            if owned >= limit {
                return Err(OrgError::LimitExceeded {
                    resource: "organization",
                    limit,
                });
            }
        }

        let base = slug::slugify(input.slug.as_deref().unwrap_or(&name), "org");
        let slug = self.unique_slug(&base).await?;

        let mut org = Organization::new(name, slug, creator_id);
        org.logo = input.logo;
        org.metadata = input.metadata;
        org.settings = input.settings;
        org.allowed_domains = normalize_domains(input.allowed_domains);

        self.ctx.stores.organizations.insert_organization(&org).await?;

        let creator_role = self.ctx.config.creator_role.clone();
        let member = Member::new(org.id, creator_id, creator_role.as_str());
        self.ctx.stores.members.insert_member(&member).await?;
        self.ctx
            .sync
            .assign_role(creator_id, &creator_role, Scope::organization(org.id))
            .await?;

        info!(org_id = %org.id, slug = %org.slug, %creator_id, "Organization created");
        Ok(org)
    }

    async fn unique_slug(&self, base: &str) -> OrgResult<String> {
        for candidate in slug::candidates(base) {
            if self.get_by_slug(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            debug!(slug = %candidate, "Organization slug taken");
        }
        Err(OrgError::AlreadyExists(format!("slug {base} is taken")))
    }

    /// Apply a patch. Gating (including the active-organization rule) is the
    /// caller's job.
    pub async fn update(&self, org_id: Uuid, patch: OrganizationPatch) -> OrgResult<Organization> {
        let mut org = self
            .get(org_id)
            .await?
            .ok_or_else(|| OrgError::not_found("organization"))?;

        if let Some(name) = patch.name {
            org.name = require_text("name", &name)?;
        }
        if let Some(new_slug) = patch.slug {
            let new_slug = new_slug.trim().to_string();
            if !slug::is_valid(&new_slug) {
                return Err(OrgError::InvalidInput(format!("invalid slug: {new_slug}")));
            }
            if new_slug != org.slug {
                if self.get_by_slug(&new_slug).await?.is_some() {
                    return Err(OrgError::AlreadyExists(format!("slug {new_slug} is taken")));
                }
                org.slug = new_slug;
            }
        }
        if let Some(logo) = patch.logo {
            org.logo = logo;
        }
        if let Some(metadata) = patch.metadata {
            org.metadata = metadata;
        }
        if let Some(settings) = patch.settings {
            org.settings = settings;
        }
        if let Some(domains) = patch.allowed_domains {
            org.allowed_domains = normalize_domains(domains);
        }
        if let Some(status) = patch.status {
            if status != org.status {
                info!(%org_id, from = %org.status, to = %status, "Organization status changed");
            }
            org.status = status;
        }
        org.updated_at = Utc::now();

        self.ctx.stores.organizations.update_organization(&org).await?;
        Ok(org)
    }

    /// Delete an organization and everything it owns.
    ///
    /// Order: team relations and roles, then member roles and direct
    /// overrides, then team membership rows, teams, invitations and members,
    /// and the organization row last so the cleanup can still enumerate
    /// children.
    pub async fn delete(&self, org_id: Uuid) -> OrgResult<DeletionSummary> {
        let stores = &self.ctx.stores;
        let sync = &self.ctx.sync;
        let org = self
            .get(org_id)
            .await?
            .ok_or_else(|| OrgError::not_found("organization"))?;

        let members = stores.members.list_members(org_id).await?;
        let teams = stores.teams.list_teams(org_id).await?;
        let invitations = stores.invitations.list_invitations(org_id).await?;

        let mut team_memberships = Vec::new();
        for team in &teams {
            for tm in stores.team_members.list_team_members(team.id).await? {
                sync.remove_team_relation(tm.user_id, team.id, org_id).await?;
                if let Some(role) = &tm.role {
                    sync.revoke_role(tm.user_id, role, Scope::team(team.id, org_id))
                        .await?;
                }
                team_memberships.push(tm);
            }
        }
        for member in &members {
            sync.revoke_role(member.user_id, &member.role, Scope::organization(org_id))
                .await?;
        }
        let overrides = sync
            .clear_overrides(None, Scope::organization(org_id))
            .await?;

        for tm in &team_memberships {
            stores
                .team_members
                .delete_team_member(tm.team_id, tm.user_id)
                .await?;
        }
        for team in &teams {
            stores.teams.delete_team(team.id).await?;
        }
        for invitation in &invitations {
            stores.invitations.delete_invitation(invitation.id).await?;
        }
        for member in &members {
            stores.members.delete_member(org_id, member.user_id).await?;
        }
        stores.organizations.delete_organization(org.id).await?;

        let summary = DeletionSummary {
            organization_id: org_id,
            members_removed: members.len(),
            teams_removed: teams.len(),
            team_memberships_removed: team_memberships.len(),
            invitations_removed: invitations.len(),
        };
        info!(
            %org_id,
            members = summary.members_removed,
            teams = summary.teams_removed,
            overrides,
            "Organization deleted"
        );
        Ok(summary)
    }

    /// Hand structural ownership from `from` to `to`.
    ///
    /// The new owner gains the creator role first, the previous owner is
    /// moved to `fallback_role`, and `owner_id` is written last so an
    /// interrupted transfer still names the previous owner.
    pub async fn transfer_ownership(
        &self,
        org_id: Uuid,
        from: Uuid,
        to: Uuid,
        fallback_role: Option<String>,
    ) -> OrgResult<Transfer> {
        let stores = &self.ctx.stores;
        let sync = &self.ctx.sync;
        let scope = Scope::organization(org_id);

        let mut org = self
            .get(org_id)
            .await?
            .ok_or_else(|| OrgError::not_found("organization"))?;
        if org.owner_id != from {
            return Err(OrgError::Forbidden(
                "only the current owner can transfer ownership".into(),
            ));
        }
        if from == to {
            return Err(OrgError::InvalidState(
                "cannot transfer ownership to yourself".into(),
            ));
        }

        let fallback_role = match fallback_role {
            Some(role) => require_text("fallback role", &role)?,
            None => self.ctx.config.transfer_fallback_role.clone(),
        };
        if self.ctx.is_creator_role(&fallback_role) {
            return Err(OrgError::InvalidInput(
                "fallback role must differ from the creator role".into(),
            ));
        }

        let mut target = match stores.members.get_member(org_id, to).await? {
            Some(member) if member.is_active() => member,
            _ => {
                return Err(OrgError::InvalidState(
                    "new owner must be an active member".into(),
                ))
            }
        };
        let creator_role = self.ctx.config.creator_role.clone();

        if !self.ctx.is_creator_role(&target.role) {
            let old_role = std::mem::replace(&mut target.role, creator_role.clone());
            stores.members.update_member(&target).await?;
            sync.revoke_role(to, &old_role, scope).await?;
        }
        sync.assign_role(to, &creator_role, scope).await?;

        if let Some(mut previous) = stores.members.get_member(org_id, from).await? {
            let old_role = std::mem::replace(&mut previous.role, fallback_role.clone());
            stores.members.update_member(&previous).await?;
            sync.revoke_role(from, &old_role, scope).await?;
            sync.assign_role(from, &fallback_role, scope).await?;
        }

        org.owner_id = to;
        org.updated_at = Utc::now();
        stores.organizations.update_organization(&org).await?;

        info!(%org_id, %from, %to, "Ownership transferred");
        Ok(Transfer {
            organization: org,
            previous_owner_id: from,
            previous_owner_role: fallback_role,
        })
    }

    /// Point `owner_id` at another member without touching roles.
    pub(crate) async fn reassign_owner(&self, org_id: Uuid, new_owner: Uuid) -> OrgResult<()> {
        let mut org = self
            .get(org_id)
            .await?
            .ok_or_else(|| OrgError::not_found("organization"))?;
        org.owner_id = new_owner;
        org.updated_at = Utc::now();
        self.ctx.stores.organizations.update_organization(&org).await?;
        info!(%org_id, %new_owner, "Structural owner reassigned");
        Ok(())
    }
}

fn normalize_domains(domains: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(domains.len());
    for domain in domains.iter().map(|d| normalize_domain(d)) {
        if !domain.is_empty() && !out.contains(&domain) {
            out.push(domain);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Limits, TenancyConfig};
    use crate::store::Stores;
    use crate::sync::AuthorizationSync;
    use std::sync::Arc;
    use tenancy_rbac::MemoryPolicyEngine;

    fn lifecycle(config: TenancyConfig) -> (OrganizationLifecycle, MemoryPolicyEngine) {
        let engine = MemoryPolicyEngine::new();
        let ctx = LifecycleContext::new(
            Stores::memory(),
            AuthorizationSync::new(Arc::new(engine.clone())),
            config,
        );
        (OrganizationLifecycle::new(ctx), engine)
    }

    #[tokio::test]
    async fn test_create_assigns_creator_role() {
        let (orgs, engine) = lifecycle(TenancyConfig::default());
        let alice = Uuid::now_v7();

        let org = orgs
            .create(alice, NewOrganization::named("Acme Corp"))
            .await
            .unwrap();

        assert_eq!(org.slug, "acme-corp");
        assert_eq!(org.owner_id, alice);
        assert_eq!(
            engine.holders_of("owner", Scope::organization(org.id)).await,
            vec![alice]
        );
    }

    #[tokio::test]
    async fn test_slug_collisions_get_suffixes() {
        let (orgs, _) = lifecycle(TenancyConfig::default());
        let user = Uuid::now_v7();

        let a = orgs.create(user, NewOrganization::named("Acme")).await.unwrap();
        let b = orgs.create(user, NewOrganization::named("acme")).await.unwrap();
        let c = orgs
            .create(user, NewOrganization::named("Other").with_slug("acme"))
            .await
            .unwrap();

        assert_eq!(a.slug, "acme");
        assert_eq!(b.slug, "acme-2");
        assert_eq!(c.slug, "acme-3");
    }

    #[tokio::test]
    async fn test_organization_limit() {
        let config = TenancyConfig::default().with_limits(Limits {
            max_organizations_per_user: Some(1),
            ..Default::default()
        });
        let (orgs, _) = lifecycle(config);
        let user = Uuid::now_v7();

        orgs.create(user, NewOrganization::named("One")).await.unwrap();
        let err = orgs
            .create(user, NewOrganization::named("Two"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "organization limit reached (max 1)");
    }

    #[tokio::test]
    async fn test_update_rejects_taken_slug() {
        let (orgs, _) = lifecycle(TenancyConfig::default());
        let user = Uuid::now_v7();
        orgs.create(user, NewOrganization::named("Taken")).await.unwrap();
        let org = orgs.create(user, NewOrganization::named("Mine")).await.unwrap();

        let err = orgs
            .update(
                org.id,
                OrganizationPatch {
                    slug: Some("taken".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrgError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (orgs, _) = lifecycle(TenancyConfig::default());
        let err = orgs
            .create(Uuid::now_v7(), NewOrganization::named("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, OrgError::InvalidInput(_)));
    }

    #[test]
    fn test_normalize_domains_dedupes() {
        let domains = normalize_domains(vec!["Acme.com".into(), "@acme.com".into(), " ".into()]);
        assert_eq!(domains, vec!["acme.com".to_string()]);
    }
}
