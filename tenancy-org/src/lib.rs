//! # Tenancy Organization Management
//!
//! Multi-tenant organization management: organizations, members with roles,
//! nested teams and time-bounded invitations, kept consistent with an
//! external authorization model.
//!
//! ## Overview
//!
//! The crate handles:
//! - **Organizations**: top-level tenants with settings, status and a
//!   structural owner
//! - **Members**: user-organization relations carrying a role and a
//!   suspension flag
//! - **Teams**: a per-organization forest of nested teams
//! - **Invitations**: identifier-bound, expiring offers to join
//! - **Authorization sync**: every write mirrored as role assignments and
//!   team relations in a [`tenancy_rbac::AuthorizationClient`]
//!
//! The store behind it is a plain document store with no cascades, so every
//! multi-entity write is an ordered sequence driven from the lifecycles.
//!
//! ## Architecture
//!
//! ```text
//! TenancyService (gates, hooks)
//!   ├─ OrganizationLifecycle ─┐
//!   ├─ MembershipLifecycle   ─┤
//!   ├─ TeamHierarchy         ─┼─→ Stores (entity CRUD)
//!   ├─ TeamMembership        ─┤
//!   └─ InvitationLifecycle   ─┘─→ AuthorizationSync ─→ AuthorizationClient
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tenancy_org::{NewInvitation, NewOrganization, NewTeam, RequestContext, TenancyService};
//!
//! # async fn demo(service: TenancyService) -> tenancy_org::OrgResult<()> {
//! let ctx = RequestContext::bearer("token");
//!
//! let org = service
//!     .create_organization(&ctx, NewOrganization::named("Acme Corp"))
//!     .await?;
//! let eng = service.create_team(&ctx, org.id, NewTeam::named("Engineering")).await?;
//! service
//!     .create_invitation(
//!         &ctx,
//!         org.id,
//!         NewInvitation::email("dev@acme.test", "member").to_team(eng.id),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Related crates
//!
//! - `tenancy-rbac`: roles, permissions and the policy engine contract
//! - `tenancy-events`: event bus for after-hooks
//! - `tenancy-auth`: JWT-backed [`IdentityResolver`]

pub mod bulk;
pub mod config;
pub mod error;
pub mod hooks;
pub mod identity;
pub mod invitation;
pub mod lifecycle;
pub mod membership;
pub mod organization;
pub mod service;
pub mod settings;
pub mod slug;
pub mod store;
pub mod sync;
pub mod team;

// Re-export main types for convenience
pub use bulk::{BulkError, BulkErrorCode, BulkResult};
pub use config::{ConfigError, Limits, Operation, PermissionMap, TenancyConfig};
pub use error::{OrgError, OrgResult};
pub use hooks::{
    EventBusHooks, HookRejection, HookResult, Hooks, InvitationHooks, MembershipHooks, NoHooks,
    OrganizationHooks, TeamHooks,
};
pub use identity::{
    Identity, IdentityResolver, NoProfiles, Profile, ProfileResolver, RequestContext, WithProfile,
};
pub use invitation::{IdentifierType, Invitation, InvitationFilter, InvitationStatus, NewInvitation};
pub use lifecycle::{Acceptance, TeamDeletion};
pub use membership::{Member, MemberStatus, MemberStatusFilter, TeamMember};
pub use organization::{
    DeletionSummary, NewOrganization, Organization, OrganizationPatch, OrganizationStatus,
    OrganizationSummary,
};
pub use service::{NewMember, TenancyService};
pub use settings::OrganizationSettings;
pub use store::{MemoryStore, StoreError, StoreResult, Stores};
pub use sync::{AuthorizationSync, TEAM_MEMBER_RELATION};
pub use team::{NewTeam, ParentFilter, Team, TeamNode, TeamPatch};
