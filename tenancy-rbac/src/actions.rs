//! # Actions
//!
//! Operations a caller can perform on a tenancy resource. Actions are the
//! second segment of a permission string (`members:add`).

use serde::{Deserialize, Serialize};

/// Actions that can be performed on resources.
///
/// - **Read**: View organizations, members, teams, invitations, audit entries
/// - **Create**: Create organizations, teams, invitations
/// - **Update**: Modify settings, roles, hierarchy
/// - **Delete**: Remove organizations and teams
/// - **Add** / **Remove**: Change membership of an organization or team
/// - **Suspend**: Toggle a member's suspension
/// - **Cancel**: Withdraw a pending invitation
/// - **Manage**: Every action on the resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read/view resource.
    Read,

    /// Create new resource.
    Create,

    /// Update existing resource.
    Update,

    /// Delete resource.
    Delete,

    /// Add a user to a membership relation.
    Add,

    /// Remove a user from a membership relation.
    Remove,

    /// Suspend or reinstate a member.
    Suspend,

    /// Cancel a pending resource (invitations).
    Cancel,

    /// Full administrative access to the resource.
    Manage,
}

impl Action {
    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Add => "add",
            Action::Remove => "remove",
            Action::Suspend => "suspend",
            Action::Cancel => "cancel",
            Action::Manage => "manage",
        }
    }

    /// Parse action from string representation.
    ///
    /// Parsing is case-insensitive and accepts a few common aliases.
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("add"), Some(Action::Add));
    /// assert_eq!(Action::parse("VIEW"), Some(Action::Read));
    /// assert_eq!(Action::parse("admin"), Some(Action::Manage));
    /// assert_eq!(Action::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" | "view" | "list" => Some(Action::Read),
            "create" => Some(Action::Create),
            "update" | "edit" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            "add" => Some(Action::Add),
            "remove" => Some(Action::Remove),
            "suspend" => Some(Action::Suspend),
            "cancel" => Some(Action::Cancel),
            "manage" | "admin" => Some(Action::Manage),
            _ => None,
        }
    }

    /// All actions, in declaration order.
    pub fn all() -> [Action; 9] {
        [
            Action::Read,
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Add,
            Action::Remove,
            Action::Suspend,
            Action::Cancel,
            Action::Manage,
        ]
    }

    /// Check if this action implies another action.
    ///
    /// - `Manage` implies every action
    /// - every mutating action implies `Read`
    ///
    /// # Example
    ///
    /// ```
    /// use tenancy_rbac::actions::Action;
    ///
    /// assert!(Action::Manage.implies(Action::Suspend));
    /// assert!(Action::Add.implies(Action::Read));
    /// assert!(!Action::Read.implies(Action::Add));
    /// ```
    pub fn implies(&self, other: Action) -> bool {
        match self {
            Action::Manage => true,
            Action::Read => false,
            _ => other == Action::Read,
        }
    }

    /// Whether this action leaves state untouched.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Action::Read)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        assert_eq!(Action::parse("read"), Some(Action::Read));
        assert_eq!(Action::parse("list"), Some(Action::Read));
        assert_eq!(Action::parse("Suspend"), Some(Action::Suspend));
        assert_eq!(Action::parse("cancel"), Some(Action::Cancel));
        assert_eq!(Action::parse("write"), None);
    }

    #[test]
    fn test_round_trip_names() {
        for action in Action::all() {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_action_implies() {
        for action in Action::all() {
            assert!(Action::Manage.implies(action));
        }

        assert!(Action::Remove.implies(Action::Read));
        assert!(Action::Cancel.implies(Action::Read));
        assert!(!Action::Remove.implies(Action::Add));
        assert!(!Action::Read.implies(Action::Read));
    }

    #[test]
    fn test_is_read_only() {
        assert!(Action::Read.is_read_only());
        assert!(!Action::Manage.is_read_only());
    }
}
