//! Shared fixture for the tenancy integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tenancy_events::{
    InvitationAccepted, InvitationIssued, MemberAdded, MemberLeft, MemberRemoved,
    MemberRoleChanged, OrganizationCreated, OrganizationDeleted, OwnershipTransferred,
    TeamCreated, TeamDeleted, TeamMemberAdded, TeamMemberRemoved, TenancyEvent,
};
use tenancy_org::{
    HookRejection, HookResult, Hooks, Identity, IdentityResolver, InvitationHooks,
    MembershipHooks, NewTeam, Organization, OrganizationHooks, RequestContext, Stores,
    TeamHooks, TenancyConfig, TenancyService,
};
use tenancy_rbac::MemoryPolicyEngine;
use uuid::Uuid;

/// Resolves bearer tokens registered by the fixture.
#[derive(Default)]
pub struct StaticIdentities {
    by_token: Mutex<HashMap<String, Identity>>,
}

impl StaticIdentities {
    fn register(&self, token: &str, identity: Identity) {
        self.by_token
            .lock()
            .unwrap()
            .insert(token.to_string(), identity);
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentities {
    async fn resolve(&self, ctx: &RequestContext) -> Option<Identity> {
        let token = ctx.bearer_token.as_deref()?;
        self.by_token.lock().unwrap().get(token).cloned()
    }
}

/// Records after-hook events and can be told to reject team creation.
#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<TenancyEvent>>,
    reject_teams: AtomicBool,
}

impl RecordingHooks {
    fn push(&self, event: TenancyEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Event types seen so far, in order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type())
            .collect()
    }

    pub fn events(&self) -> Vec<TenancyEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reject_teams(&self, reject: bool) {
        self.reject_teams.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrganizationHooks for RecordingHooks {
    async fn on_organization_created(&self, event: &OrganizationCreated) {
        self.push(TenancyEvent::OrganizationCreated(event.clone()));
    }

    async fn on_organization_deleted(&self, event: &OrganizationDeleted) {
        self.push(TenancyEvent::OrganizationDeleted(event.clone()));
    }

    async fn on_ownership_transferred(&self, event: &OwnershipTransferred) {
        self.push(TenancyEvent::OwnershipTransferred(event.clone()));
    }
}

#[async_trait]
impl MembershipHooks for RecordingHooks {
    async fn on_member_added(&self, event: &MemberAdded) {
        self.push(TenancyEvent::MemberAdded(event.clone()));
    }

    async fn on_member_removed(&self, event: &MemberRemoved) {
        self.push(TenancyEvent::MemberRemoved(event.clone()));
    }

    async fn on_member_role_changed(&self, event: &MemberRoleChanged) {
        self.push(TenancyEvent::MemberRoleChanged(event.clone()));
    }

    async fn on_member_left(&self, event: &MemberLeft) {
        self.push(TenancyEvent::MemberLeft(event.clone()));
    }
}

#[async_trait]
impl TeamHooks for RecordingHooks {
    async fn before_create_team(
        &self,
        _org_id: Uuid,
        _input: &NewTeam,
        _actor_id: Uuid,
    ) -> HookResult {
        if self.reject_teams.load(Ordering::SeqCst) {
            return Err(HookRejection::new("teams are frozen"));
        }
        Ok(())
    }

    async fn on_team_created(&self, event: &TeamCreated) {
        self.push(TenancyEvent::TeamCreated(event.clone()));
    }

    async fn on_team_deleted(&self, event: &TeamDeleted) {
        self.push(TenancyEvent::TeamDeleted(event.clone()));
    }

    async fn on_team_member_added(&self, event: &TeamMemberAdded) {
        self.push(TenancyEvent::TeamMemberAdded(event.clone()));
    }

    async fn on_team_member_removed(&self, event: &TeamMemberRemoved) {
        self.push(TenancyEvent::TeamMemberRemoved(event.clone()));
    }
}

#[async_trait]
impl InvitationHooks for RecordingHooks {
    async fn on_invitation_issued(&self, event: &InvitationIssued) {
        self.push(TenancyEvent::InvitationIssued(event.clone()));
    }

    async fn on_invitation_accepted(&self, event: &InvitationAccepted) {
        self.push(TenancyEvent::InvitationAccepted(event.clone()));
    }
}

/// A user known to the fixture.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub ctx: RequestContext,
}

/// Service wired to in-memory stores, the in-memory policy engine and
/// recording hooks.
pub struct TestFixture {
    /// Service under test.
    pub service: TenancyService,
    /// Policy engine behind the service.
    pub engine: MemoryPolicyEngine,
    /// After-hook recorder.
    pub hooks: Arc<RecordingHooks>,
    /// Stores behind the service, for seeding state the API cannot reach.
    pub stores: Stores,
    identities: Arc<StaticIdentities>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(TenancyConfig::default())
    }

    pub fn with_config(config: TenancyConfig) -> Self {
        let engine = MemoryPolicyEngine::new();
        let hooks = Arc::new(RecordingHooks::default());
        let identities = Arc::new(StaticIdentities::default());
        let stores = Stores::memory();
        let service = TenancyService::new(
            stores.clone(),
            Arc::new(engine.clone()),
            identities.clone(),
            config,
        )
        .with_hooks(Hooks::all(hooks.clone()));

        Self {
            service,
            engine,
            hooks,
            stores,
            identities,
        }
    }

    /// Register a user whose bearer token is `name` and whose e-mail is
    /// `{name}@acme.test`.
    pub fn user(&self, name: &str) -> TestUser {
        let id = Uuid::now_v7();
        let email = format!("{name}@acme.test");
        self.identities.register(
            name,
            Identity::new(id)
                .with_identifier(email.clone())
                .with_name(name.to_string()),
        );
        TestUser {
            id,
            email,
            ctx: RequestContext::bearer(name).with_correlation_id(format!("test-{name}")),
        }
    }

    /// Organization created by `owner`.
    pub async fn org(&self, owner: &TestUser, name: &str) -> Organization {
        self.service
            .create_organization(&owner.ctx, tenancy_org::NewOrganization::named(name))
            .await
            .expect("organization should be created")
    }

    /// Add `user` to `org` with `role`, acting as `actor`.
    pub async fn join(&self, actor: &TestUser, org: &Organization, user: &TestUser, role: &str) {
        self.service
            .add_member(&actor.ctx, org.id, user.id, role)
            .await
            .expect("member should be added");
    }
}
