//! Team domain models
//!
//! Teams group members within an organization. Each team may point at a
//! parent team in the same organization; the parent pointers of one
//! organization always form a forest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A team within an organization.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use tenancy_org::Team;
///
/// let org_id = Uuid::now_v7();
/// let eng = Team::new(org_id, "Engineering", "engineering");
/// let core = Team::new(org_id, "Core", "core").with_parent(Some(eng.id));
///
/// assert!(eng.is_root());
/// assert_eq!(core.parent_team_id, Some(eng.id));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    /// Unique identifier for the team
    pub id: Uuid,

    /// Parent organization ID
    pub organization_id: Uuid,

    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (unique within organization)
    pub slug: String,

    /// Team description
    pub description: Option<String>,

    /// Opaque key/value data owned by the caller
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Parent team in the same organization
    pub parent_team_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Creates a new root team.
    pub fn new(organization_id: Uuid, name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            name: name.into(),
            slug: slug.into(),
            description: None,
            metadata: HashMap::new(),
            parent_team_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set the parent team.
    pub fn with_parent(mut self, parent_team_id: Option<Uuid>) -> Self {
        self.parent_team_id = parent_team_id;
        self
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_team_id.is_none()
    }
}

/// Input for creating a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTeam {
    pub name: String,
    /// Derived from the name when omitted
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub parent_team_id: Option<Uuid>,
}

impl NewTeam {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn under(mut self, parent_team_id: Uuid) -> Self {
        self.parent_team_id = Some(parent_team_id);
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

/// Partial team update.
///
/// `parent: Some(None)` moves the team to the root; `Some(Some(id))`
/// reparents it under `id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub parent: Option<Option<Uuid>>,
}

impl TeamPatch {
    pub fn reparent(parent: Option<Uuid>) -> Self {
        Self {
            parent: Some(parent),
            ..Default::default()
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Parent filter for team listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentFilter {
    /// Every team in the organization
    #[default]
    Any,
    /// Root teams only
    Root,
    /// Direct children of a team
    Children(Uuid),
}

impl ParentFilter {
    pub fn matches(&self, team: &Team) -> bool {
        match self {
            ParentFilter::Any => true,
            ParentFilter::Root => team.parent_team_id.is_none(),
            ParentFilter::Children(parent) => team.parent_team_id == Some(*parent),
        }
    }
}

/// A team with its nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamNode {
    pub team: Team,
    pub children: Vec<TeamNode>,
}

impl TeamNode {
    /// Build the forest for one organization from a flat team list.
    ///
    /// Teams whose parent is missing from `teams` are treated as roots.
    /// Siblings keep the order they had in `teams`.
    pub fn build_forest(teams: Vec<Team>) -> Vec<TeamNode> {
        let ids: std::collections::HashSet<Uuid> = teams.iter().map(|t| t.id).collect();
        let mut children: HashMap<Option<Uuid>, Vec<Team>> = HashMap::new();
        for team in teams {
            let parent = team.parent_team_id.filter(|p| ids.contains(p));
            children.entry(parent).or_default().push(team);
        }

        fn attach(
            parent: Option<Uuid>,
            children: &mut HashMap<Option<Uuid>, Vec<Team>>,
        ) -> Vec<TeamNode> {
            children
                .remove(&parent)
                .unwrap_or_default()
                .into_iter()
                .map(|team| {
                    let id = team.id;
                    TeamNode {
                        team,
                        children: attach(Some(id), children),
                    }
                })
                .collect()
        }

        attach(None, &mut children)
    }

    /// Number of teams in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TeamNode::size).sum::<usize>()
    }
}
