//! Lifecycle components.
//!
//! Each component owns the writes for one entity: the store rows, the manual
//! cascades, and the matching [`AuthorizationSync`] calls, issued in a fixed
//! order. Caller authentication and permission gates live one level up in
//! [`crate::TenancyService`]; lifecycles trust the ids they are given.

pub mod invitations;
pub mod members;
pub mod organizations;
pub mod team_members;
pub mod teams;

pub use invitations::{Acceptance, InvitationLifecycle};
pub use members::MembershipLifecycle;
pub use organizations::{OrganizationLifecycle, Transfer};
pub use team_members::TeamMembership;
pub use teams::{TeamDeletion, TeamHierarchy};

use std::sync::Arc;

use crate::config::TenancyConfig;
use crate::store::Stores;
use crate::sync::AuthorizationSync;

/// Wiring shared by every lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleContext {
    pub stores: Stores,
    pub sync: AuthorizationSync,
    pub config: Arc<TenancyConfig>,
}

impl LifecycleContext {
    pub fn new(stores: Stores, sync: AuthorizationSync, config: TenancyConfig) -> Self {
        Self {
            stores,
            sync,
            config: Arc::new(config),
        }
    }

    /// Whether `role` is the configured creator role.
    pub(crate) fn is_creator_role(&self, role: &str) -> bool {
        role.eq_ignore_ascii_case(&self.config.creator_role)
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> crate::OrgResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(crate::OrgError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}
