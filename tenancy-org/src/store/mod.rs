//! Entity storage traits.
//!
//! One trait per entity. Stores enforce primary-key uniqueness and nothing
//! else: no cascades, no foreign keys, no secondary unique indexes. The
//! lifecycles in [`crate::lifecycle`] do that work explicitly.
//!
//! Method names are distinct across traits so a single backend can
//! implement all five and be shared through [`Stores::from_shared`].

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::invitation::Invitation;
use crate::membership::{Member, TeamMember};
use crate::organization::Organization;
use crate::team::Team;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row to update does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Primary key already taken
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Organization storage.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Insert a new organization.
    async fn insert_organization(&self, org: &Organization) -> StoreResult<()>;

    /// Get organization by ID.
    async fn get_organization(&self, id: Uuid) -> StoreResult<Option<Organization>>;

    /// Get organization by slug.
    async fn get_organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>>;

    /// Replace an existing organization.
    async fn update_organization(&self, org: &Organization) -> StoreResult<()>;

    /// Delete an organization. Deleting a missing row is a no-op.
    async fn delete_organization(&self, id: Uuid) -> StoreResult<()>;

    /// Organizations whose structural owner is `user_id`.
    async fn count_organizations_owned_by(&self, user_id: Uuid) -> StoreResult<usize>;
}

/// Organization membership storage.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn insert_member(&self, member: &Member) -> StoreResult<()>;

    async fn get_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>>;

    async fn update_member(&self, member: &Member) -> StoreResult<()>;

    async fn delete_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    /// All members of an organization, oldest first.
    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<Member>>;

    /// All memberships of a user across organizations.
    async fn list_memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Member>>;
}

/// Team storage.
#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn insert_team(&self, team: &Team) -> StoreResult<()>;

    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>>;

    /// Slugs are unique per organization.
    async fn get_team_by_slug(&self, org_id: Uuid, slug: &str) -> StoreResult<Option<Team>>;

    async fn update_team(&self, team: &Team) -> StoreResult<()>;

    async fn delete_team(&self, id: Uuid) -> StoreResult<()>;

    /// All teams of an organization, oldest first.
    async fn list_teams(&self, org_id: Uuid) -> StoreResult<Vec<Team>>;
}

/// Team membership storage.
#[async_trait]
pub trait TeamMemberStore: Send + Sync {
    async fn insert_team_member(&self, member: &TeamMember) -> StoreResult<()>;

    async fn get_team_member(&self, team_id: Uuid, user_id: Uuid)
        -> StoreResult<Option<TeamMember>>;

    async fn update_team_member(&self, member: &TeamMember) -> StoreResult<()>;

    async fn delete_team_member(&self, team_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<TeamMember>>;

    /// Team memberships of one user inside one organization.
    async fn list_team_memberships_for_user(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Vec<TeamMember>>;
}

/// Invitation storage.
#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()>;

    async fn get_invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>>;

    async fn update_invitation(&self, invitation: &Invitation) -> StoreResult<()>;

    async fn delete_invitation(&self, id: Uuid) -> StoreResult<()>;

    /// All invitations of an organization, oldest first.
    async fn list_invitations(&self, org_id: Uuid) -> StoreResult<Vec<Invitation>>;

    /// Invitations across organizations for a normalized identifier.
    async fn list_invitations_for_identifier(
        &self,
        identifier: &str,
    ) -> StoreResult<Vec<Invitation>>;
}

/// The five entity stores the lifecycles depend on.
#[derive(Clone)]
pub struct Stores {
    pub organizations: Arc<dyn OrganizationStore>,
    pub members: Arc<dyn MemberStore>,
    pub teams: Arc<dyn TeamStore>,
    pub team_members: Arc<dyn TeamMemberStore>,
    pub invitations: Arc<dyn InvitationStore>,
}

impl Stores {
    /// Use one backend for every entity.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: OrganizationStore + MemberStore + TeamStore + TeamMemberStore + InvitationStore + 'static,
    {
        Self {
            organizations: store.clone(),
            members: store.clone(),
            teams: store.clone(),
            team_members: store.clone(),
            invitations: store,
        }
    }

    /// Fresh in-memory stores.
    pub fn memory() -> Self {
        Self::from_shared(Arc::new(MemoryStore::new()))
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
