//! Organization domain models
//!
//! This module provides the core Organization entity for multi-tenant
//! organization management. Organizations are the top-level tenant entities
//! that own members, teams and invitations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::membership::MemberStatus;
use crate::settings::OrganizationSettings;

/// Organization status.
///
/// Only active organizations accept mutations; a suspended or archived
/// organization must be reactivated first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    #[default]
    Active,
    Suspended,
    Archived,
}

impl OrganizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationStatus::Active => "active",
            OrganizationStatus::Suspended => "suspended",
            OrganizationStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An organization represents a tenant in the multi-tenant system.
///
/// Users can belong to multiple organizations with different roles.
///
/// # Architecture
///
/// ```text
/// Organization
///   ├─ Members
///   ├─ Teams (forest via parent_team_id)
///   │    └─ TeamMembers
///   ├─ Invitations
///   └─ Settings
/// ```
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use tenancy_org::Organization;
///
/// let owner_id = Uuid::now_v7();
/// let org = Organization::new("Acme Corp", "acme-corp", owner_id);
/// assert_eq!(org.name, "Acme Corp");
/// assert!(org.is_active());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (unique across all organizations)
    pub slug: String,

    /// Logo URL for branding
    pub logo: Option<String>,

    /// Opaque key/value data owned by the caller
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Join behavior
    #[serde(default)]
    pub settings: OrganizationSettings,

    /// E-mail domains whose users may join without an invitation
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Structural owner, distinct from any role
    pub owner_id: Uuid,

    pub status: OrganizationStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new active organization with default settings.
    pub fn new(name: impl Into<String>, slug: impl Into<String>, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            logo: None,
            metadata: HashMap::new(),
            settings: OrganizationSettings::default(),
            allowed_domains: Vec::new(),
            owner_id,
            status: OrganizationStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OrganizationStatus::Active
    }

    /// Whether the domain of `email` is in `allowed_domains`.
    ///
    /// ```
    /// use uuid::Uuid;
    /// use tenancy_org::Organization;
    ///
    /// let mut org = Organization::new("Acme", "acme", Uuid::now_v7());
    /// org.allowed_domains = vec!["acme.com".into()];
    ///
    /// assert!(org.allows_domain_of("Jane@ACME.com"));
    /// assert!(!org.allows_domain_of("jane@acme.co"));
    /// assert!(!org.allows_domain_of("not-an-email"));
    /// ```
    pub fn allows_domain_of(&self, email: &str) -> bool {
        let Some((_, domain)) = email.trim().rsplit_once('@') else {
            return false;
        };
        let domain = domain.to_lowercase();
        !domain.is_empty()
            && self
                .allowed_domains
                .iter()
                .any(|allowed| normalize_domain(allowed) == domain)
    }
}

/// Lowercase a domain and drop a leading `@`.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('@').to_lowercase()
}

/// Input for creating an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    /// Derived from the name when omitted
    pub slug: Option<String>,
    pub logo: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub settings: OrganizationSettings,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

impl NewOrganization {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_settings(mut self, settings: OrganizationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }
}

/// Partial update. `None` leaves a field unchanged; `logo: Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub logo: Option<Option<String>>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub settings: Option<OrganizationSettings>,
    pub allowed_domains: Option<Vec<String>>,
    pub status: Option<OrganizationStatus>,
}

impl OrganizationPatch {
    pub fn status(status: OrganizationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// The patch sets the organization back to active.
    pub fn reactivates(&self) -> bool {
        self.status == Some(OrganizationStatus::Active)
    }
}

/// An organization as seen by one of its members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub status: OrganizationStatus,
    /// Caller's role
    pub role: String,
    /// Caller's membership status
    pub membership_status: MemberStatus,
    /// Caller is the structural owner
    pub is_owner: bool,
}

/// What a cascading organization delete removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletionSummary {
    pub organization_id: Uuid,
    pub members_removed: usize,
    pub teams_removed: usize,
    pub team_memberships_removed: usize,
    pub invitations_removed: usize,
}
