//! Organization settings
//!
//! Settings control how users may join an organization without being
//! explicitly added by a member.

use serde::{Deserialize, Serialize};

/// Organization-level settings.
///
/// # Examples
///
/// ```
/// use tenancy_org::settings::OrganizationSettings;
///
/// let settings = OrganizationSettings::default();
/// assert!(!settings.allow_public_signup);
/// assert!(!settings.require_invitation_to_join);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationSettings {
    /// Any authenticated user may join with the default member role
    #[serde(default)]
    pub allow_public_signup: bool,

    /// Joining is only possible by accepting an invitation; wins over
    /// `allow_public_signup` and allowed domains
    #[serde(default)]
    pub require_invitation_to_join: bool,
}

impl OrganizationSettings {
    /// Settings for an organization anyone can join.
    pub fn public() -> Self {
        Self {
            allow_public_signup: true,
            require_invitation_to_join: false,
        }
    }

    /// Settings for an invitation-only organization.
    pub fn invitation_only() -> Self {
        Self {
            allow_public_signup: false,
            require_invitation_to_join: true,
        }
    }
}
