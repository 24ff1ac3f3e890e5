//! The authenticated principal and its permission resolution.
//!
//! A subject holds a direct permission set, a role set (each role carrying
//! its own permissions), and a superuser flag. Effective permissions are
//! the union of the direct set and every role's set; holding a permission
//! through either path is sufficient. Roles and permissions arrive
//! pre-loaded; resolution never fetches.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TidegateError};

/// A named permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique name, e.g. `posts:write`
    pub name: String,
    /// Human-readable title
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Permission {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: None,
        }
    }
}

/// A role grouping a set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique name, e.g. `editor`
    pub name: String,
    /// Human-readable title
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: None,
            permissions: Vec::new(),
        }
    }

    /// Add a permission to this role (builder style).
    #[must_use]
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Whether this role grants the named permission.
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p.name == name)
    }
}

/// An authenticated principal.
///
/// Serializes cleanly so it can be cached in the session bucket between
/// requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

fn default_true() -> bool {
    true
}

impl Subject {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            is_active: true,
            is_superuser: false,
            permissions: Vec::new(),
            roles: Vec::new(),
        }
    }

    /// Whether the subject holds a permission, directly or via a role.
    ///
    /// Superusers hold every permission. Empty permission and role sets
    /// resolve to `false`, not an error.
    pub fn has_permission(&self, name: &str) -> bool {
        if self.is_superuser {
            return true;
        }
        self.permissions.iter().any(|p| p.name == name)
            || self.roles.iter().any(|role| role.has_permission(name))
    }

    /// Whether the subject holds the named role.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.name == name)
    }

    /// Require a single permission.
    ///
    /// # Errors
    ///
    /// [`TidegateError::PermissionDenied`] naming the permission when the
    /// subject does not hold it.
    pub fn can(&self, name: &str) -> Result<()> {
        if self.has_permission(name) {
            Ok(())
        } else {
            Err(TidegateError::permission_denied([name]))
        }
    }

    /// Require every permission in the list.
    ///
    /// # Errors
    ///
    /// [`TidegateError::PermissionDenied`] carrying the full required list
    /// when any single permission is missing.
    pub fn can_all<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let missing = names
            .iter()
            .any(|name| !self.has_permission(name.as_ref()));
        if missing {
            Err(TidegateError::permission_denied(
                names.iter().map(|n| n.as_ref().to_string()),
            ))
        } else {
            Ok(())
        }
    }
}
