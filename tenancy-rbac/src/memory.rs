//! In-memory policy engine
//!
//! A complete [`AuthorizationClient`] backed by process memory. Suitable for
//! single-process deployments and tests.
//!
//! ## Decision order
//!
//! For `can(user, permission, scope)` the engine walks the scope chain
//! (the scope itself, then its organization for team scopes):
//!
//! 1. an active **deny** override anywhere in the chain refuses
//! 2. an active **grant** override anywhere in the chain allows
//! 3. a role held anywhere in the chain whose permission set covers the
//!    request allows
//! 4. otherwise refuse

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEntry, AuditQuery};
use crate::client::{
    AuthorizationClient, AuthzError, AuthzResult, Effect, OverrideOptions, PermissionOverride,
};
use crate::permissions::{Permission, PermissionSet};
use crate::roles::RoleRegistry;
use crate::scope::Scope;

#[derive(Default)]
struct PolicyState {
    roles: HashMap<(Uuid, Scope), BTreeSet<String>>,
    relations: HashSet<(Uuid, String, Scope)>,
    overrides: Vec<PermissionOverride>,
    audit: Vec<AuditEntry>,
}

impl PolicyState {
    fn chain(scope: Scope) -> impl Iterator<Item = Scope> {
        std::iter::once(scope).chain(scope.parent())
    }

    fn active_overrides(
        &self,
        user_id: Uuid,
        scope: Scope,
        effect: Effect,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &PermissionOverride> {
        self.overrides.iter().filter(move |o| {
            o.user_id == user_id
                && o.effect == effect
                && o.is_active_at(now)
                && Self::chain(scope).any(|s| s == o.scope)
        })
    }

    fn role_permissions(
        &self,
        registry: &RoleRegistry,
        user_id: Uuid,
        scope: Scope,
    ) -> PermissionSet {
        let mut set = PermissionSet::new();
        for s in Self::chain(scope) {
            if let Some(roles) = self.roles.get(&(user_id, s)) {
                for role in roles {
                    set.merge(&registry.permissions_for(role));
                }
            }
        }
        set
    }

    fn record(&mut self, entry: AuditEntry) {
        debug!(
            action = %entry.action,
            user_id = %entry.user_id,
            scope = %entry.scope,
            "authorization change recorded"
        );
        self.audit.push(entry);
    }
}

/// In-memory [`AuthorizationClient`].
///
/// Cloning shares the underlying state.
#[derive(Clone)]
pub struct MemoryPolicyEngine {
    registry: Arc<RoleRegistry>,
    state: Arc<RwLock<PolicyState>>,
}

impl MemoryPolicyEngine {
    /// Engine using the default role registry.
    pub fn new() -> Self {
        Self::with_registry(RoleRegistry::default())
    }

    /// Engine resolving roles against `registry`.
    pub fn with_registry(registry: RoleRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            state: Arc::new(RwLock::new(PolicyState::default())),
        }
    }

    /// The role registry in use.
    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Whether the relation exists.
    pub async fn has_relation(&self, user_id: Uuid, relation: &str, object: Scope) -> bool {
        self.state
            .read()
            .await
            .relations
            .contains(&(user_id, relation.to_string(), object))
    }

    /// Objects `user_id` holds `relation` to.
    pub async fn relations_of(&self, user_id: Uuid, relation: &str) -> Vec<Scope> {
        self.state
            .read()
            .await
            .relations
            .iter()
            .filter(|(u, r, _)| *u == user_id && r == relation)
            .map(|(_, _, s)| *s)
            .collect()
    }

    /// Users holding `role` directly in `scope`.
    pub async fn holders_of(&self, role: &str, scope: Scope) -> Vec<Uuid> {
        let state = self.state.read().await;
        let mut users: Vec<Uuid> = state
            .roles
            .iter()
            .filter(|((_, s), roles)| *s == scope && roles.contains(role))
            .map(|((u, _), _)| *u)
            .collect();
        users.sort();
        users
    }

    /// Overrides currently recorded for `user_id`, including expired ones.
    pub async fn overrides_for(&self, user_id: Uuid) -> Vec<PermissionOverride> {
        self.state
            .read()
            .await
            .overrides
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn set_override(
        &self,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        effect: Effect,
        options: OverrideOptions,
    ) -> AuthzResult<()> {
        let mut state = self.state.write().await;

        let unchanged = state.overrides.iter().any(|o| {
            o.user_id == user_id
                && o.permission == permission
                && o.scope == scope
                && o.effect == effect
                && o.reason == options.reason
                && o.expires_at == options.expires_at
        });
        if unchanged {
            return Ok(());
        }

        // One override per (user, permission, scope); a deny replaces a grant.
        state
            .overrides
            .retain(|o| !(o.user_id == user_id && o.permission == permission && o.scope == scope));
        state.overrides.push(PermissionOverride {
            user_id,
            permission: permission.clone(),
            scope,
            effect,
            reason: options.reason.clone(),
            expires_at: options.expires_at,
            created_at: Utc::now(),
        });

        let action = match effect {
            Effect::Allow => AuditAction::PermissionGranted,
            Effect::Deny => AuditAction::PermissionDenied,
        };
        state.record(
            AuditEntry::new(action, user_id, scope)
                .with_permission(permission)
                .with_reason(options.reason),
        );
        Ok(())
    }
}

impl Default for MemoryPolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn check_name(kind: &str, value: &str) -> AuthzResult<()> {
    if value.trim().is_empty() {
        return Err(AuthzError::InvalidRequest(format!("{kind} must not be empty")));
    }
    Ok(())
}

#[async_trait]
impl AuthorizationClient for MemoryPolicyEngine {
    async fn assign_role(&self, user_id: Uuid, role: &str, scope: Scope) -> AuthzResult<()> {
        check_name("role", role)?;
        let mut state = self.state.write().await;
        let inserted = state
            .roles
            .entry((user_id, scope))
            .or_default()
            .insert(role.to_string());
        if inserted {
            state.record(
                AuditEntry::new(AuditAction::RoleAssigned, user_id, scope).with_role(role),
            );
        }
        Ok(())
    }

    async fn revoke_role(&self, user_id: Uuid, role: &str, scope: Scope) -> AuthzResult<()> {
        check_name("role", role)?;
        let mut state = self.state.write().await;
        let key = (user_id, scope);
        let removed = state
            .roles
            .get_mut(&key)
            .map_or(false, |roles| roles.remove(role));
        if state.roles.get(&key).is_some_and(|roles| roles.is_empty()) {
            state.roles.remove(&key);
        }
        if removed {
            state.record(AuditEntry::new(AuditAction::RoleRevoked, user_id, scope).with_role(role));
        }
        Ok(())
    }

    async fn add_relation(&self, user_id: Uuid, relation: &str, object: Scope) -> AuthzResult<()> {
        check_name("relation", relation)?;
        let mut state = self.state.write().await;
        if state.relations.insert((user_id, relation.to_string(), object)) {
            state.record(
                AuditEntry::new(AuditAction::RelationAdded, user_id, object)
                    .with_relation(format!("{relation}:{object}")),
            );
        }
        Ok(())
    }

    async fn remove_relation(
        &self,
        user_id: Uuid,
        relation: &str,
        object: Scope,
    ) -> AuthzResult<()> {
        check_name("relation", relation)?;
        let mut state = self.state.write().await;
        if state.relations.remove(&(user_id, relation.to_string(), object)) {
            state.record(
                AuditEntry::new(AuditAction::RelationRemoved, user_id, object)
                    .with_relation(format!("{relation}:{object}")),
            );
        }
        Ok(())
    }

    async fn grant_permission(
        &self,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        options: OverrideOptions,
    ) -> AuthzResult<()> {
        self.set_override(user_id, permission, scope, Effect::Allow, options)
            .await
    }

    async fn deny_permission(
        &self,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        options: OverrideOptions,
    ) -> AuthzResult<()> {
        self.set_override(user_id, permission, scope, Effect::Deny, options)
            .await
    }

    async fn clear_overrides(&self, user_id: Option<Uuid>, scope: Scope) -> AuthzResult<usize> {
        let mut state = self.state.write().await;
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut state.overrides).into_iter().partition(|o| {
                user_id.map_or(true, |u| u == o.user_id) && scope.contains(&o.scope)
            });
        state.overrides = kept;

        for o in &removed {
            state.record(
                AuditEntry::new(AuditAction::OverrideRemoved, o.user_id, o.scope)
                    .with_permission(o.permission.clone()),
            );
        }
        Ok(removed.len())
    }

    async fn can(
        &self,
        user_id: Uuid,
        permission: &Permission,
        scope: Scope,
    ) -> AuthzResult<bool> {
        let now = Utc::now();
        let state = self.state.read().await;

        if state
            .active_overrides(user_id, scope, Effect::Deny, now)
            .any(|o| o.permission.matches(permission))
        {
            return Ok(false);
        }

        if state
            .active_overrides(user_id, scope, Effect::Allow, now)
            .any(|o| o.permission.matches(permission))
        {
            return Ok(true);
        }

        Ok(state
            .role_permissions(&self.registry, user_id, scope)
            .has(permission))
    }

    async fn get_user_permissions(
        &self,
        user_id: Uuid,
        scope: Scope,
    ) -> AuthzResult<PermissionSet> {
        let now = Utc::now();
        let state = self.state.read().await;

        let mut set = state.role_permissions(&self.registry, user_id, scope);
        for grant in state.active_overrides(user_id, scope, Effect::Allow, now) {
            set.add(grant.permission.clone());
        }

        let denied: Vec<&Permission> = state
            .active_overrides(user_id, scope, Effect::Deny, now)
            .map(|o| &o.permission)
            .collect();
        Ok(set
            .iter()
            .filter(|p| !denied.iter().any(|d| d.matches(p)))
            .cloned()
            .collect())
    }

    async fn get_user_roles(&self, user_id: Uuid, scope: Scope) -> AuthzResult<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .get(&(user_id, scope))
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_audit_log(&self, query: &AuditQuery) -> AuthzResult<Vec<AuditEntry>> {
        let state = self.state.read().await;
        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|entry| query.matches(entry))
            .take(query.limit())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, ResourceType};

    fn perm(s: &str) -> Permission {
        Permission::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_role_grants_permission() {
        let engine = MemoryPolicyEngine::new();
        let user = Uuid::now_v7();
        let org = Scope::organization(Uuid::now_v7());

        assert!(!engine.can(user, &perm("members:add"), org).await.unwrap());

        engine.assign_role(user, "admin", org).await.unwrap();
        assert!(engine.can(user, &perm("members:add"), org).await.unwrap());
        assert!(!engine.can(user, &perm("organizations:delete"), org).await.unwrap());

        let other_org = Scope::organization(Uuid::now_v7());
        assert!(!engine.can(user, &perm("members:add"), other_org).await.unwrap());
    }

    #[tokio::test]
    async fn test_team_scope_falls_back_to_organization() {
        let engine = MemoryPolicyEngine::new();
        let user = Uuid::now_v7();
        let org_id = Uuid::now_v7();
        let team = Scope::team(Uuid::now_v7(), org_id);

        engine
            .assign_role(user, "member", Scope::organization(org_id))
            .await
            .unwrap();
        assert!(engine.can(user, &perm("teams:read"), team).await.unwrap());
        assert!(!engine.can(user, &perm("teams:update"), team).await.unwrap());

        engine.assign_role(user, "admin", team).await.unwrap();
        assert!(engine.can(user, &perm("teams:update"), team).await.unwrap());
        assert!(!engine
            .can(user, &perm("teams:update"), Scope::organization(org_id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_deny_beats_grant_and_role() {
        let engine = MemoryPolicyEngine::new();
        let user = Uuid::now_v7();
        let org = Scope::organization(Uuid::now_v7());
        engine.assign_role(user, "owner", org).await.unwrap();

        engine
            .deny_permission(
                user,
                perm("members:remove"),
                org,
                OverrideOptions {
                    reason: Some("under review".into()),
                    expires_at: None,
                },
            )
            .await
            .unwrap();
        assert!(!engine.can(user, &perm("members:remove"), org).await.unwrap());
        assert!(engine.can(user, &perm("members:add"), org).await.unwrap());

        let err = engine
            .require(user, &perm("members:remove"), org)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Denied { .. }));

        // A later grant replaces the denial.
        engine
            .grant_permission(user, perm("members:remove"), org, OverrideOptions::default())
            .await
            .unwrap();
        assert!(engine.can(user, &perm("members:remove"), org).await.unwrap());
        assert_eq!(engine.overrides_for(user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_grant_is_ignored() {
        let engine = MemoryPolicyEngine::new();
        let user = Uuid::now_v7();
        let org = Scope::organization(Uuid::now_v7());

        engine
            .grant_permission(
                user,
                perm("teams:create"),
                org,
                OverrideOptions {
                    reason: None,
                    expires_at: Some(Utc::now() - chrono::Duration::minutes(5)),
                },
            )
            .await
            .unwrap();
        assert!(!engine.can(user, &perm("teams:create"), org).await.unwrap());
    }

    #[tokio::test]
    async fn test_role_and_relation_calls_are_idempotent() {
        let engine = MemoryPolicyEngine::new();
        let user = Uuid::now_v7();
        let org_id = Uuid::now_v7();
        let org = Scope::organization(org_id);
        let team = Scope::team(Uuid::now_v7(), org_id);

        engine.assign_role(user, "owner", org).await.unwrap();
        engine.assign_role(user, "owner", org).await.unwrap();
        engine.revoke_role(user, "admin", org).await.unwrap();
        engine.add_relation(user, "member", team).await.unwrap();
        engine.add_relation(user, "member", team).await.unwrap();
        engine.remove_relation(user, "member", team).await.unwrap();
        engine.remove_relation(user, "member", team).await.unwrap();

        assert_eq!(engine.get_user_roles(user, org).await.unwrap(), vec!["owner"]);
        assert!(!engine.has_relation(user, "member", team).await);

        let log = engine
            .get_audit_log(&AuditQuery::for_organization(org_id))
            .await
            .unwrap();
        let actions: Vec<AuditAction> = log.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::RelationRemoved,
                AuditAction::RelationAdded,
                AuditAction::RoleAssigned,
            ]
        );
    }

    #[tokio::test]
    async fn test_audit_log_is_tenant_scoped() {
        let engine = MemoryPolicyEngine::new();
        let user = Uuid::now_v7();
        let org_a = Uuid::now_v7();
        let org_b = Uuid::now_v7();

        engine
            .assign_role(user, "member", Scope::organization(org_a))
            .await
            .unwrap();
        engine
            .assign_role(user, "admin", Scope::organization(org_b))
            .await
            .unwrap();

        let log = engine
            .get_audit_log(&AuditQuery::for_organization(org_a))
            .await
            .unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role.as_deref(), Some("member"));
    }

    #[tokio::test]
    async fn test_clear_overrides_covers_teams_of_organization() {
        let engine = MemoryPolicyEngine::new();
        let (alice, bob) = (Uuid::now_v7(), Uuid::now_v7());
        let org_id = Uuid::now_v7();
        let org = Scope::organization(org_id);
        let team = Scope::team(Uuid::now_v7(), org_id);
        let elsewhere = Scope::organization(Uuid::now_v7());

        for (user, scope) in [(alice, org), (alice, team), (alice, elsewhere), (bob, team)] {
            engine
                .grant_permission(user, perm("teams:update"), scope, OverrideOptions::default())
                .await
                .unwrap();
        }

        assert_eq!(engine.clear_overrides(Some(alice), org).await.unwrap(), 2);
        assert!(!engine.can(alice, &perm("teams:update"), team).await.unwrap());
        assert!(engine.can(alice, &perm("teams:update"), elsewhere).await.unwrap());
        assert!(engine.can(bob, &perm("teams:update"), team).await.unwrap());

        assert_eq!(engine.clear_overrides(None, team).await.unwrap(), 1);
        assert!(!engine.can(bob, &perm("teams:update"), team).await.unwrap());
        assert_eq!(engine.clear_overrides(None, team).await.unwrap(), 0);

        let log = engine
            .get_audit_log(&AuditQuery::for_organization(org_id))
            .await
            .unwrap();
        assert_eq!(log[0].action, AuditAction::OverrideRemoved);
        assert_eq!(log[0].user_id, bob);
    }

    #[tokio::test]
    async fn test_user_permissions_exclude_denials() {
        let engine = MemoryPolicyEngine::new();
        let user = Uuid::now_v7();
        let org = Scope::organization(Uuid::now_v7());

        engine.assign_role(user, "member", org).await.unwrap();
        engine
            .grant_permission(user, perm("invitations:create"), org, OverrideOptions::default())
            .await
            .unwrap();
        engine
            .deny_permission(user, perm("teams:read"), org, OverrideOptions::default())
            .await
            .unwrap();

        let perms = engine.get_user_permissions(user, org).await.unwrap();
        assert!(perms.has(&Permission::new(ResourceType::Invitations, Action::Create)));
        assert!(!perms.has(&Permission::new(ResourceType::Teams, Action::Read)));
        assert!(perms.has(&Permission::new(ResourceType::Members, Action::Read)));
    }
}
