//! Authorization sync.
//!
//! Thin façade over the policy engine, called by the lifecycles at the exact
//! point a role or relation changes. Every call here is idempotent on the
//! engine side, so a partially applied operation can be re-driven.

use std::sync::Arc;
use tenancy_rbac::{
    AuditEntry, AuditQuery, AuthorizationClient, OverrideOptions, Permission, PermissionSet,
    Scope,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::OrgResult;

/// Relation recorded for team membership.
pub const TEAM_MEMBER_RELATION: &str = "member";

/// Authorization sync over an [`AuthorizationClient`].
#[derive(Clone)]
pub struct AuthorizationSync {
    client: Arc<dyn AuthorizationClient>,
}

impl AuthorizationSync {
    pub fn new(client: Arc<dyn AuthorizationClient>) -> Self {
        Self { client }
    }

    /// Underlying policy engine.
    pub fn client(&self) -> &Arc<dyn AuthorizationClient> {
        &self.client
    }

    pub async fn assign_role(&self, user_id: Uuid, role: &str, scope: Scope) -> OrgResult<()> {
        debug!(%user_id, role, %scope, "Assigning role");
        self.client.assign_role(user_id, role, scope).await?;
        Ok(())
    }

    pub async fn revoke_role(&self, user_id: Uuid, role: &str, scope: Scope) -> OrgResult<()> {
        debug!(%user_id, role, %scope, "Revoking role");
        self.client.revoke_role(user_id, role, scope).await?;
        Ok(())
    }

    /// Record team membership.
    pub async fn add_team_relation(
        &self,
        user_id: Uuid,
        team_id: Uuid,
        org_id: Uuid,
    ) -> OrgResult<()> {
        debug!(%user_id, %team_id, "Adding team relation");
        self.client
            .add_relation(user_id, TEAM_MEMBER_RELATION, Scope::team(team_id, org_id))
            .await?;
        Ok(())
    }

    /// Drop team membership.
    pub async fn remove_team_relation(
        &self,
        user_id: Uuid,
        team_id: Uuid,
        org_id: Uuid,
    ) -> OrgResult<()> {
        debug!(%user_id, %team_id, "Removing team relation");
        self.client
            .remove_relation(user_id, TEAM_MEMBER_RELATION, Scope::team(team_id, org_id))
            .await?;
        Ok(())
    }

    pub async fn grant_permission(
        &self,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        options: OverrideOptions,
    ) -> OrgResult<()> {
        debug!(%user_id, %permission, %scope, "Granting permission");
        self.client
            .grant_permission(user_id, permission, scope, options)
            .await?;
        Ok(())
    }

    pub async fn deny_permission(
        &self,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        options: OverrideOptions,
    ) -> OrgResult<()> {
        debug!(%user_id, %permission, %scope, "Denying permission");
        self.client
            .deny_permission(user_id, permission, scope, options)
            .await?;
        Ok(())
    }

    /// Drop direct overrides in `scope` and the scopes inside it.
    pub async fn clear_overrides(&self, user_id: Option<Uuid>, scope: Scope) -> OrgResult<usize> {
        let removed = self.client.clear_overrides(user_id, scope).await?;
        debug!(user_id = ?user_id, %scope, removed, "Cleared permission overrides");
        Ok(removed)
    }

    /// Fails with [`crate::OrgError::Forbidden`] on denial.
    pub async fn require(
        &self,
        user_id: Uuid,
        permission: &Permission,
        scope: Scope,
    ) -> OrgResult<()> {
        self.client.require(user_id, permission, scope).await?;
        Ok(())
    }

    pub async fn can(
        &self,
        user_id: Uuid,
        permission: &Permission,
        scope: Scope,
    ) -> OrgResult<bool> {
        Ok(self.client.can(user_id, permission, scope).await?)
    }

    pub async fn permissions(&self, user_id: Uuid, scope: Scope) -> OrgResult<PermissionSet> {
        Ok(self.client.get_user_permissions(user_id, scope).await?)
    }

    pub async fn roles(&self, user_id: Uuid, scope: Scope) -> OrgResult<Vec<String>> {
        Ok(self.client.get_user_roles(user_id, scope).await?)
    }

    pub async fn audit_log(&self, query: &AuditQuery) -> OrgResult<Vec<AuditEntry>> {
        Ok(self.client.get_audit_log(query).await?)
    }
}

impl std::fmt::Debug for AuthorizationSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationSync").finish_non_exhaustive()
    }
}
