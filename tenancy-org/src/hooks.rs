//! Lifecycle hooks.
//!
//! One small observer trait per entity. Before-hooks run ahead of the first
//! write and abort the operation by returning a [`HookRejection`]; nothing is
//! committed in that case. After-hooks fire once the operation has succeeded
//! and cannot change its outcome.
//!
//! Every method has a no-op default, so implementors override only what they
//! need. [`EventBusHooks`] forwards every after-hook to an [`EventBus`].

use async_trait::async_trait;
use std::sync::Arc;
use tenancy_events::{
    EventBus, InvitationAccepted, InvitationIssued, MemberAdded, MemberLeft, MemberRemoved,
    MemberRoleChanged, OrganizationCreated, OrganizationDeleted, OwnershipTransferred,
    TeamCreated, TeamDeleted, TeamMemberAdded, TeamMemberRemoved, TenancyEvent,
};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::OrgError;
use crate::invitation::{Invitation, NewInvitation};
use crate::organization::{NewOrganization, Organization, OrganizationPatch};
use crate::team::{NewTeam, Team, TeamPatch};

/// Returned by a before-hook to abort an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HookRejection {
    pub message: String,
}

impl HookRejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<HookRejection> for OrgError {
    fn from(rejection: HookRejection) -> Self {
        OrgError::Rejected(rejection.message)
    }
}

/// Result of a before-hook.
pub type HookResult = Result<(), HookRejection>;

/// Organization hooks.
#[async_trait]
pub trait OrganizationHooks: Send + Sync {
    async fn before_create_organization(
        &self,
        _creator_id: Uuid,
        _input: &NewOrganization,
    ) -> HookResult {
        Ok(())
    }

    async fn before_update_organization(
        &self,
        _org: &Organization,
        _patch: &OrganizationPatch,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    async fn before_delete_organization(&self, _org: &Organization, _actor_id: Uuid) -> HookResult {
        Ok(())
    }

    async fn on_organization_created(&self, _event: &OrganizationCreated) {}

    async fn on_organization_deleted(&self, _event: &OrganizationDeleted) {}

    async fn on_ownership_transferred(&self, _event: &OwnershipTransferred) {}
}

/// Membership hooks.
#[async_trait]
pub trait MembershipHooks: Send + Sync {
    async fn before_add_member(
        &self,
        _org_id: Uuid,
        _user_id: Uuid,
        _role: &str,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    async fn before_remove_member(
        &self,
        _org_id: Uuid,
        _user_id: Uuid,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    async fn before_update_member_role(
        &self,
        _org_id: Uuid,
        _user_id: Uuid,
        _new_role: &str,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    async fn on_member_added(&self, _event: &MemberAdded) {}

    async fn on_member_removed(&self, _event: &MemberRemoved) {}

    async fn on_member_role_changed(&self, _event: &MemberRoleChanged) {}

    async fn on_member_left(&self, _event: &MemberLeft) {}
}

/// Team hooks.
#[async_trait]
pub trait TeamHooks: Send + Sync {
    async fn before_create_team(
        &self,
        _org_id: Uuid,
        _input: &NewTeam,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    async fn before_update_team(
        &self,
        _team: &Team,
        _patch: &TeamPatch,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    async fn before_delete_team(&self, _team: &Team, _actor_id: Uuid) -> HookResult {
        Ok(())
    }

    async fn on_team_created(&self, _event: &TeamCreated) {}

    async fn on_team_deleted(&self, _event: &TeamDeleted) {}

    async fn on_team_member_added(&self, _event: &TeamMemberAdded) {}

    async fn on_team_member_removed(&self, _event: &TeamMemberRemoved) {}
}

/// Invitation hooks.
#[async_trait]
pub trait InvitationHooks: Send + Sync {
    async fn before_create_invitation(
        &self,
        _org_id: Uuid,
        _input: &NewInvitation,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    async fn before_resend_invitation(
        &self,
        _invitation: &Invitation,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    async fn before_cancel_invitation(
        &self,
        _invitation: &Invitation,
        _actor_id: Uuid,
    ) -> HookResult {
        Ok(())
    }

    /// Fired on create and on resend; `event.kind` tells them apart.
    async fn on_invitation_issued(&self, _event: &InvitationIssued) {}

    async fn on_invitation_accepted(&self, _event: &InvitationAccepted) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl OrganizationHooks for NoHooks {}
impl MembershipHooks for NoHooks {}
impl TeamHooks for NoHooks {}
impl InvitationHooks for NoHooks {}

/// The hook set injected into the service.
#[derive(Clone)]
pub struct Hooks {
    pub organizations: Arc<dyn OrganizationHooks>,
    pub members: Arc<dyn MembershipHooks>,
    pub teams: Arc<dyn TeamHooks>,
    pub invitations: Arc<dyn InvitationHooks>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self::all(Arc::new(NoHooks))
    }
}

impl Hooks {
    /// Use one implementation for every entity.
    pub fn all<T>(hooks: Arc<T>) -> Self
    where
        T: OrganizationHooks + MembershipHooks + TeamHooks + InvitationHooks + 'static,
    {
        Self {
            organizations: hooks.clone(),
            members: hooks.clone(),
            teams: hooks.clone(),
            invitations: hooks,
        }
    }

    pub fn with_organizations(mut self, hooks: Arc<dyn OrganizationHooks>) -> Self {
        self.organizations = hooks;
        self
    }

    pub fn with_members(mut self, hooks: Arc<dyn MembershipHooks>) -> Self {
        self.members = hooks;
        self
    }

    pub fn with_teams(mut self, hooks: Arc<dyn TeamHooks>) -> Self {
        self.teams = hooks;
        self
    }

    pub fn with_invitations(mut self, hooks: Arc<dyn InvitationHooks>) -> Self {
        self.invitations = hooks;
        self
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

/// Publishes every after-hook as a [`TenancyEvent`].
///
/// Publish failures are logged and swallowed.
#[derive(Clone)]
pub struct EventBusHooks {
    bus: Arc<dyn EventBus>,
}

impl EventBusHooks {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    async fn publish(&self, event: TenancyEvent) {
        let event_type = event.event_type();
        let envelope = match event.to_event() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(event_type, error = %e, "Failed to encode tenancy event");
                return;
            }
        };
        match self.bus.publish(envelope).await {
            Ok(()) => debug!(event_type, "Published tenancy event"),
            Err(e) => warn!(event_type, error = %e, "Failed to publish tenancy event"),
        }
    }
}

#[async_trait]
impl OrganizationHooks for EventBusHooks {
    async fn on_organization_created(&self, event: &OrganizationCreated) {
        self.publish(TenancyEvent::OrganizationCreated(event.clone())).await;
    }

    async fn on_organization_deleted(&self, event: &OrganizationDeleted) {
        self.publish(TenancyEvent::OrganizationDeleted(event.clone())).await;
    }

    async fn on_ownership_transferred(&self, event: &OwnershipTransferred) {
        self.publish(TenancyEvent::OwnershipTransferred(event.clone())).await;
    }
}

#[async_trait]
impl MembershipHooks for EventBusHooks {
    async fn on_member_added(&self, event: &MemberAdded) {
        self.publish(TenancyEvent::MemberAdded(event.clone())).await;
    }

    async fn on_member_removed(&self, event: &MemberRemoved) {
        self.publish(TenancyEvent::MemberRemoved(event.clone())).await;
    }

    async fn on_member_role_changed(&self, event: &MemberRoleChanged) {
        self.publish(TenancyEvent::MemberRoleChanged(event.clone())).await;
    }

    async fn on_member_left(&self, event: &MemberLeft) {
        self.publish(TenancyEvent::MemberLeft(event.clone())).await;
    }
}

#[async_trait]
impl TeamHooks for EventBusHooks {
    async fn on_team_created(&self, event: &TeamCreated) {
        self.publish(TenancyEvent::TeamCreated(event.clone())).await;
    }

    async fn on_team_deleted(&self, event: &TeamDeleted) {
        self.publish(TenancyEvent::TeamDeleted(event.clone())).await;
    }

    async fn on_team_member_added(&self, event: &TeamMemberAdded) {
        self.publish(TenancyEvent::TeamMemberAdded(event.clone())).await;
    }

    async fn on_team_member_removed(&self, event: &TeamMemberRemoved) {
        self.publish(TenancyEvent::TeamMemberRemoved(event.clone())).await;
    }
}

#[async_trait]
impl InvitationHooks for EventBusHooks {
    async fn on_invitation_issued(&self, event: &InvitationIssued) {
        self.publish(TenancyEvent::InvitationIssued(event.clone())).await;
    }

    async fn on_invitation_accepted(&self, event: &InvitationAccepted) {
        self.publish(TenancyEvent::InvitationAccepted(event.clone())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenancy_events::MemoryEventBus;

    #[test]
    fn test_rejection_becomes_org_error() {
        let err: OrgError = HookRejection::new("blocked by policy").into();
        assert_eq!(err.to_string(), "Rejected: blocked by policy");
        assert_eq!(err.error_code(), "REJECTED");
    }

    #[tokio::test]
    async fn test_default_hooks_allow_everything() {
        let hooks = Hooks::default();
        let input = NewOrganization::named("Acme");
        assert!(hooks
            .organizations
            .before_create_organization(Uuid::now_v7(), &input)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_event_bus_hooks_publish() {
        let bus = Arc::new(MemoryEventBus::new());
        let mut sub = bus.subscribe("tenancy.member.*").await.unwrap();
        let hooks = EventBusHooks::new(bus.clone());

        let org_id = Uuid::now_v7();
        hooks
            .on_member_left(&MemberLeft {
                organization_id: org_id,
                user_id: Uuid::now_v7(),
            })
            .await;

        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type, "member.left");
        assert_eq!(event.org_id, Some(org_id));
    }
}
