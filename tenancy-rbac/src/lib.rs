//! # Tenancy RBAC (Role-Based Access Control)
//!
//! Permission vocabulary and policy-engine contract for multi-tenant
//! organization management.
//!
//! ## Overview
//!
//! The tenancy-rbac crate handles:
//! - **Resources**: organizations, members, teams, team members, invitations,
//!   direct permissions and the audit trail
//! - **Actions**: operations that can be performed on resources
//! - **Permissions**: resource + action combinations
//! - **Scopes**: the organization or team a role or permission is bound to
//! - **Roles**: named permission sets resolved through a [`RoleRegistry`]
//! - **Policy engine**: the [`AuthorizationClient`] contract and the
//!   [`MemoryPolicyEngine`] implementation
//!
//! ## Architecture
//!
//! ```text
//! Permission = Resource + Action [+ Resource ID]
//!
//! Examples:
//!   "members:add"                - Add members to the organization
//!   "teams:update:<team-id>"     - Update one team
//!   "invitations:manage"         - Full management of invitations
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tenancy_rbac::{AuthorizationClient, MemoryPolicyEngine, Permission, Scope};
//! use uuid::Uuid;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = MemoryPolicyEngine::new();
//! let user = Uuid::now_v7();
//! let org = Scope::organization(Uuid::now_v7());
//!
//! engine.assign_role(user, "admin", org).await.unwrap();
//!
//! let add: Permission = "members:add".parse().unwrap();
//! assert!(engine.can(user, &add, org).await.unwrap());
//! # }
//! ```
//!
//! ## Action Implications
//!
//! - `Manage` implies all actions
//! - Every other mutating action implies `Read`

pub mod actions;
pub mod audit;
pub mod client;
pub mod memory;
pub mod permissions;
pub mod resources;
pub mod roles;
pub mod scope;

// Re-export main types for convenience
pub use actions::Action;
pub use audit::{AuditAction, AuditEntry, AuditQuery};
pub use client::{
    AuthorizationClient, AuthzError, AuthzResult, Effect, OverrideOptions, PermissionOverride,
};
pub use memory::MemoryPolicyEngine;
pub use permissions::{ParsePermissionError, Permission, PermissionSet};
pub use resources::ResourceType;
pub use roles::{RoleDefinition, RoleRegistry, ADMIN_ROLE, MEMBER_ROLE, OWNER_ROLE};
pub use scope::{Scope, ScopeKind};
