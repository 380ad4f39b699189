//! User and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fixed set of roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Staff,
    Viewer,
}

/// Resources that can be accessed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Inventory,
    Order,
    Invoice,
    Delivery,
    Demo,
    Return,
    Report,
    User,
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Export,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Inventory,
        Resource::Order,
        Resource::Invoice,
        Resource::Delivery,
        Resource::Demo,
        Resource::Return,
        Resource::Report,
        Resource::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Inventory => "inventory",
            Resource::Order => "order",
            Resource::Invoice => "invoice",
            Resource::Delivery => "delivery",
            Resource::Demo => "demo",
            Resource::Return => "return",
            Resource::Report => "report",
            Resource::User => "user",
        }
    }
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Export => "export",
        }
    }
}

/// Permission string in `resource:action` form
pub fn permission(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource.as_str(), action.as_str())
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Staff => "staff",
            UserRole::Viewer => "viewer",
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "manager" => Some(UserRole::Manager),
            "staff" | "user" => Some(UserRole::Staff),
            "viewer" => Some(UserRole::Viewer),
            _ => None,
        }
    }

    /// Permissions granted to the role
    pub fn permissions(&self) -> Vec<String> {
        match self {
            UserRole::Admin => Resource::ALL
                .iter()
                .flat_map(|r| Action::ALL.iter().map(move |a| permission(*r, *a)))
                .collect(),
            UserRole::Manager => Resource::ALL
                .iter()
                .filter(|r| **r != Resource::User)
                .flat_map(|r| Action::ALL.iter().map(move |a| permission(*r, *a)))
                .chain(std::iter::once(permission(Resource::User, Action::View)))
                .collect(),
            UserRole::Staff => {
                let mut perms: Vec<String> = [
                    Resource::Inventory,
                    Resource::Order,
                    Resource::Invoice,
                    Resource::Delivery,
                    Resource::Demo,
                    Resource::Return,
                ]
                .iter()
                .flat_map(|r| {
                    [Action::View, Action::Create, Action::Edit]
                        .into_iter()
                        .map(move |a| permission(*r, a))
                })
                .collect();
                perms.push(permission(Resource::Report, Action::View));
                perms
            }
            UserRole::Viewer => Resource::ALL
                .iter()
                .filter(|r| **r != Resource::User)
                .map(|r| permission(*r, Action::View))
                .collect(),
        }
    }

    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.permissions().contains(&permission(resource, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        let perms = UserRole::Admin.permissions();
        assert_eq!(perms.len(), Resource::ALL.len() * Action::ALL.len());
        assert!(perms.contains(&"user:delete".to_string()));
    }

    #[test]
    fn test_manager_cannot_manage_users() {
        assert!(UserRole::Manager.has_permission(Resource::User, Action::View));
        assert!(!UserRole::Manager.has_permission(Resource::User, Action::Create));
        assert!(UserRole::Manager.has_permission(Resource::Report, Action::Export));
    }

    #[test]
    fn test_staff_and_viewer() {
        assert!(UserRole::Staff.has_permission(Resource::Order, Action::Create));
        assert!(!UserRole::Staff.has_permission(Resource::Inventory, Action::Delete));
        assert!(!UserRole::Staff.has_permission(Resource::Report, Action::Export));
        assert!(UserRole::Viewer.has_permission(Resource::Demo, Action::View));
        assert!(!UserRole::Viewer.has_permission(Resource::Demo, Action::Create));
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(UserRole::parse_label("User"), Some(UserRole::Staff));
        assert_eq!(UserRole::parse_label("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse_label("owner"), None);
    }
}
