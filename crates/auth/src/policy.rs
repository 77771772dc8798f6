use serde::Serialize;
use thiserror::Error;

use crate::permissions::{self, Permission, PermissionSet};

/// Route-level authorization requirement.
///
/// A policy is a plain value attached to a route and evaluated uniformly by the
/// authentication gate; it captures nothing but the required permission names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "permissions", rename_all = "snake_case")]
pub enum PermissionPolicy {
    /// Any authenticated identity passes.
    Authenticated,
    /// Every listed permission is required (or `admin`).
    All(Vec<Permission>),
    /// At least one listed permission is required (or `admin`).
    Any(Vec<Permission>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Insufficient permissions. Required: {}", join(.missing))]
    Forbidden { missing: Vec<Permission> },

    #[error("Insufficient permissions. Required (any): {}", join(.required))]
    ForbiddenAny { required: Vec<Permission> },
}

impl AuthzError {
    /// Permission names the caller would need to pass.
    pub fn permissions(&self) -> &[Permission] {
        match self {
            AuthzError::Forbidden { missing } => missing,
            AuthzError::ForbiddenAny { required } => required,
        }
    }
}

fn join(perms: &[Permission]) -> String {
    perms
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl PermissionPolicy {
    pub fn all(perms: impl IntoIterator<Item = Permission>) -> Self {
        Self::All(perms.into_iter().collect())
    }

    pub fn any(perms: impl IntoIterator<Item = Permission>) -> Self {
        Self::Any(perms.into_iter().collect())
    }

    /// Shorthand for a single required permission.
    pub fn require(perm: Permission) -> Self {
        Self::All(vec![perm])
    }

    /// Evaluate the policy against an identity's permissions.
    ///
    /// - No IO
    /// - No panics
    /// - A denial is an ordinary outcome, not a fault
    pub fn evaluate(&self, held: &PermissionSet) -> Result<(), AuthzError> {
        match self {
            PermissionPolicy::Authenticated => Ok(()),
            PermissionPolicy::All(required) => {
                if permissions::has_all(held, required) {
                    Ok(())
                } else {
                    Err(AuthzError::Forbidden {
                        missing: permissions::missing(held, required),
                    })
                }
            }
            PermissionPolicy::Any(required) => {
                if permissions::has_any(held, required) {
                    Ok(())
                } else {
                    Err(AuthzError::ForbiddenAny {
                        required: required.clone(),
                    })
                }
            }
        }
    }
}
