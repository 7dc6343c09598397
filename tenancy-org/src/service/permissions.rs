use tenancy_rbac::{AuditEntry, AuditQuery, OverrideOptions, Permission, PermissionSet, Scope};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Caller, TenancyService};
use crate::config::Operation;
use crate::error::{OrgError, OrgResult};
use crate::identity::RequestContext;

impl TenancyService {
    /// Grant `permission` to a member directly, bypassing roles.
    #[instrument(skip(self, ctx, options), fields(permission = %permission, scope = %scope))]
    pub async fn grant_permission(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        options: OverrideOptions,
    ) -> OrgResult<()> {
        self.override_target(ctx, org_id, user_id, scope).await?;
        self.ctx
            .sync
            .grant_permission(user_id, permission, scope, options)
            .await?;
        info!(%org_id, %user_id, "Permission granted");
        Ok(())
    }

    /// Deny `permission` to a member directly. A deny anywhere up the scope
    /// chain beats every grant.
    #[instrument(skip(self, ctx, options), fields(permission = %permission, scope = %scope))]
    pub async fn deny_permission(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
        permission: Permission,
        scope: Scope,
        options: OverrideOptions,
    ) -> OrgResult<()> {
        self.override_target(ctx, org_id, user_id, scope).await?;
        self.ctx
            .sync
            .deny_permission(user_id, permission, scope, options)
            .await?;
        info!(%org_id, %user_id, "Permission denied");
        Ok(())
    }

    /// Gate for direct overrides: `permissions:manage`, a scope inside the
    /// organization and a target that is a member of it.
    async fn override_target(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        user_id: Uuid,
        scope: Scope,
    ) -> OrgResult<Caller> {
        let caller = self.gate(ctx, org_id, Operation::ManagePermissions).await?;
        self.ensure_scope_in(org_id, scope).await?;
        if self.members.get(org_id, user_id).await?.is_none() {
            return Err(OrgError::not_found("member"));
        }
        Ok(caller)
    }

    /// Effective permissions of `user_id` (the caller when `None`) in
    /// `scope`. Looking at someone else requires `permissions:manage`.
    #[instrument(skip(self, ctx))]
    pub async fn get_user_permissions(
        &self,
        ctx: &RequestContext,
        scope: Scope,
        user_id: Option<Uuid>,
    ) -> OrgResult<PermissionSet> {
        let user_id = self.inspect_target(ctx, scope, user_id).await?;
        self.ctx.sync.permissions(user_id, scope).await
    }

    /// Roles of `user_id` (the caller when `None`) assigned exactly at `scope`.
    #[instrument(skip(self, ctx))]
    pub async fn get_user_roles(
        &self,
        ctx: &RequestContext,
        scope: Scope,
        user_id: Option<Uuid>,
    ) -> OrgResult<Vec<String>> {
        let user_id = self.inspect_target(ctx, scope, user_id).await?;
        self.ctx.sync.roles(user_id, scope).await
    }

    /// Whether the caller holds `permission` in `scope`.
    #[instrument(skip(self, ctx), fields(permission = %permission))]
    pub async fn check_permission(
        &self,
        ctx: &RequestContext,
        permission: &Permission,
        scope: Scope,
    ) -> OrgResult<bool> {
        let caller = self.reader(ctx, scope.organization_id()).await?;
        self.ensure_scope_in(caller.org_id(), scope).await?;
        self.ctx.sync.can(caller.user_id(), permission, scope).await
    }

    /// Authorization audit trail of the organization, newest first.
    ///
    /// The query is always pinned to `org_id`.
    #[instrument(skip(self, ctx, query))]
    pub async fn get_audit_log(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        query: AuditQuery,
    ) -> OrgResult<Vec<AuditEntry>> {
        self.privileged_reader(ctx, org_id, Operation::ReadAuditLog)
            .await?;
        let query = AuditQuery {
            organization_id: org_id,
            ..query
        };
        self.ctx.sync.audit_log(&query).await
    }

    async fn inspect_target(
        &self,
        ctx: &RequestContext,
        scope: Scope,
        user_id: Option<Uuid>,
    ) -> OrgResult<Uuid> {
        let org_id = scope.organization_id();
        let caller = self.reader(ctx, org_id).await?;
        self.ensure_scope_in(org_id, scope).await?;
        match user_id {
            None => Ok(caller.user_id()),
            Some(id) if id == caller.user_id() => Ok(id),
            Some(id) => {
                self.require(&caller, Operation::ManagePermissions, Scope::organization(org_id))
                    .await?;
                if self.members.get(org_id, id).await?.is_none() {
                    return Err(OrgError::not_found("member"));
                }
                Ok(id)
            }
        }
    }

    /// A scope must be the organization itself or one of its teams.
    async fn ensure_scope_in(&self, org_id: Uuid, scope: Scope) -> OrgResult<()> {
        if scope.organization_id() != org_id {
            return Err(OrgError::Forbidden(
                "scope belongs to another organization".into(),
            ));
        }
        if let Scope::Team { id, .. } = scope {
            self.teams.get_in(org_id, id).await?;
        }
        Ok(())
    }
}
