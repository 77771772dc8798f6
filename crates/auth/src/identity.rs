use serde::Serialize;

use crate::claims::TokenClaims;
use crate::permissions::{Permission, PermissionSet};

/// The authenticated caller of a single request.
///
/// Built from validated token claims only (no store lookup), never persisted,
/// and immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    id: String,
    email: String,
    permissions: PermissionSet,
}

impl Identity {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Synthesize an identity from claims; `None` when the subject is blank.
    pub fn from_claims(claims: TokenClaims) -> Option<Self> {
        if claims.sub.trim().is_empty() {
            return None;
        }
        Some(Self::new(claims.sub, claims.email, claims.permissions))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}
