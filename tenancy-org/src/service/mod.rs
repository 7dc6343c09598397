//! The tenancy orchestrator.
//!
//! [`TenancyService`] is the public entry point. Every operation resolves the
//! caller, runs the gates in a fixed order, calls the lifecycle that owns the
//! write, and fires after-hooks once the write has succeeded:
//!
//! ```text
//! authenticate ─→ member of org? ─→ caller active? ─→ org active? ─→ permission ─→ lifecycle ─→ hooks
//!  NotAuthenticated  Unauthorized    InvalidState     InvalidState     Forbidden
//! ```
//!
//! Reads stop after the membership gate (plus a permission check where the
//! data is privileged).

mod invitations;
mod members;
mod organizations;
mod permissions;
mod teams;

pub use members::NewMember;

use std::sync::Arc;
use tenancy_rbac::{AuthorizationClient, Scope};
use tracing::debug;
use uuid::Uuid;

use crate::config::{Operation, TenancyConfig};
use crate::error::{OrgError, OrgResult};
use crate::hooks::Hooks;
use crate::identity::{
    Identity, IdentityResolver, NoProfiles, Profile, ProfileResolver, RequestContext, WithProfile,
};
use crate::lifecycle::{
    InvitationLifecycle, LifecycleContext, MembershipLifecycle, OrganizationLifecycle,
    TeamHierarchy, TeamMembership,
};
use crate::membership::Member;
use crate::organization::Organization;
use crate::store::Stores;
use crate::sync::AuthorizationSync;

/// A caller that passed the membership gate of one organization.
#[derive(Debug, Clone)]
pub(crate) struct Caller {
    pub identity: Identity,
    pub org: Organization,
    pub member: Member,
}

impl Caller {
    pub fn user_id(&self) -> Uuid {
        self.identity.user_id
    }

    pub fn org_id(&self) -> Uuid {
        self.org.id
    }
}

/// Multi-tenant organization service.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use tenancy_org::{
///     Identity, IdentityResolver, NewOrganization, RequestContext, Stores, TenancyConfig,
///     TenancyService,
/// };
/// use tenancy_rbac::MemoryPolicyEngine;
/// use uuid::Uuid;
///
/// struct Fixed(Uuid);
///
/// #[async_trait]
/// impl IdentityResolver for Fixed {
///     async fn resolve(&self, _ctx: &RequestContext) -> Option<Identity> {
///         Some(Identity::new(self.0))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let alice = Uuid::now_v7();
/// let service = TenancyService::new(
///     Stores::memory(),
///     Arc::new(MemoryPolicyEngine::new()),
///     Arc::new(Fixed(alice)),
///     TenancyConfig::default(),
/// );
///
/// let ctx = RequestContext::new();
/// let org = service
///     .create_organization(&ctx, NewOrganization::named("Acme"))
///     .await
///     .unwrap();
/// assert_eq!(org.owner_id, alice);
/// # }
/// ```
#[derive(Clone)]
pub struct TenancyService {
    ctx: LifecycleContext,
    organizations: OrganizationLifecycle,
    members: MembershipLifecycle,
    teams: TeamHierarchy,
    team_members: TeamMembership,
    invitations: InvitationLifecycle,
    identities: Arc<dyn IdentityResolver>,
    profiles: Arc<dyn ProfileResolver>,
    hooks: Hooks,
}

impl TenancyService {
    pub fn new(
        stores: Stores,
        authz: Arc<dyn AuthorizationClient>,
        identities: Arc<dyn IdentityResolver>,
        config: TenancyConfig,
    ) -> Self {
        let ctx = LifecycleContext::new(stores, AuthorizationSync::new(authz), config);
        Self {
            organizations: OrganizationLifecycle::new(ctx.clone()),
            members: MembershipLifecycle::new(ctx.clone()),
            teams: TeamHierarchy::new(ctx.clone()),
            team_members: TeamMembership::new(ctx.clone()),
            invitations: InvitationLifecycle::new(ctx.clone()),
            ctx,
            identities,
            profiles: Arc::new(NoProfiles),
            hooks: Hooks::default(),
        }
    }

    /// Builder: profile lookup for enrichment and identifier matching.
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileResolver>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Builder: lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &TenancyConfig {
        &self.ctx.config
    }

    /// Authorization sync used by this service.
    pub fn authorization(&self) -> &AuthorizationSync {
        &self.ctx.sync
    }

    // ------------------------------------------------------------------
    // Gates
    // ------------------------------------------------------------------

    pub(crate) async fn authenticate(&self, ctx: &RequestContext) -> OrgResult<Identity> {
        let identity = self
            .identities
            .resolve(ctx)
            .await
            .ok_or(OrgError::NotAuthenticated)?;
        debug!(
            user_id = %identity.user_id,
            correlation_id = ctx.correlation_id.as_deref().unwrap_or("-"),
            "Caller resolved"
        );
        Ok(identity)
    }

    /// Membership gate. A missing organization and a missing membership are
    /// indistinguishable.
    pub(crate) async fn member_of(&self, identity: Identity, org_id: Uuid) -> OrgResult<Caller> {
        let org = self
            .organizations
            .get(org_id)
            .await?
            .ok_or(OrgError::Unauthorized)?;
        let member = self
            .members
            .get(org_id, identity.user_id)
            .await?
            .ok_or(OrgError::Unauthorized)?;
        Ok(Caller {
            identity,
            org,
            member,
        })
    }

    /// Authenticated member; enough for reads.
    pub(crate) async fn reader(&self, ctx: &RequestContext, org_id: Uuid) -> OrgResult<Caller> {
        let identity = self.authenticate(ctx).await?;
        self.member_of(identity, org_id).await
    }

    /// Reader that also holds the permission mapped to `operation`.
    pub(crate) async fn privileged_reader(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        operation: Operation,
    ) -> OrgResult<Caller> {
        let caller = self.reader(ctx, org_id).await?;
        self.require(&caller, operation, Scope::organization(org_id))
            .await?;
        Ok(caller)
    }

    /// Active caller in an active organization, without the permission step.
    pub(crate) async fn writer(&self, ctx: &RequestContext, org_id: Uuid) -> OrgResult<Caller> {
        let caller = self.reader(ctx, org_id).await?;
        ensure_caller_active(&caller)?;
        ensure_org_active(&caller.org)?;
        Ok(caller)
    }

    /// Full mutation gate in organization scope.
    pub(crate) async fn gate(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        operation: Operation,
    ) -> OrgResult<Caller> {
        let caller = self.writer(ctx, org_id).await?;
        self.require(&caller, operation, Scope::organization(org_id))
            .await?;
        Ok(caller)
    }

    /// Full mutation gate in the scope of a team of `org_id`.
    pub(crate) async fn gate_team(
        &self,
        ctx: &RequestContext,
        org_id: Uuid,
        team_id: Uuid,
        operation: Operation,
    ) -> OrgResult<Caller> {
        let caller = self.writer(ctx, org_id).await?;
        self.teams.get_in(org_id, team_id).await?;
        self.require(&caller, operation, Scope::team(team_id, org_id))
            .await?;
        Ok(caller)
    }

    pub(crate) async fn require(
        &self,
        caller: &Caller,
        operation: Operation,
        scope: Scope,
    ) -> OrgResult<()> {
        let permission = self.ctx.config.permissions.permission_for(operation);
        self.ctx
            .sync
            .require(caller.user_id(), &permission, scope)
            .await
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    pub(crate) async fn profile(&self, user_id: Uuid) -> Option<Profile> {
        self.profiles.profile(user_id).await
    }

    pub(crate) async fn with_profile<T>(&self, user_id: Uuid, item: T) -> WithProfile<T> {
        WithProfile {
            profile: self.profile(user_id).await,
            item,
        }
    }

    /// The caller's verified identifier: the identity's own, else the
    /// profile e-mail.
    pub(crate) async fn identifier_of(&self, identity: &Identity) -> Option<String> {
        match &identity.identifier {
            Some(identifier) => Some(identifier.clone()),
            None => self
                .profile(identity.user_id)
                .await
                .and_then(|p| p.email),
        }
    }

    /// Display name: the identity's own, else the profile name.
    pub(crate) async fn display_name_of(&self, identity: &Identity) -> Option<String> {
        match &identity.name {
            Some(name) => Some(name.clone()),
            None => self
                .profile(identity.user_id)
                .await
                .and_then(|p| p.name),
        }
    }
}

impl std::fmt::Debug for TenancyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenancyService")
            .field("config", &self.ctx.config)
            .finish_non_exhaustive()
    }
}

pub(crate) fn ensure_caller_active(caller: &Caller) -> OrgResult<()> {
    if caller.member.is_active() {
        Ok(())
    } else {
        Err(OrgError::InvalidState("membership is suspended".into()))
    }
}

pub(crate) fn ensure_org_active(org: &Organization) -> OrgResult<()> {
    if org.is_active() {
        Ok(())
    } else {
        Err(OrgError::InvalidState(format!("organization is {}", org.status)))
    }
}
