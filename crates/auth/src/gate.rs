//! Per-request authentication and authorization.
//!
//! ```text
//! header ─► extract_bearer ─► TokenCodec::validate ─► Identity ─► PermissionPolicy
//!   none ─► Unauthenticated      rejected ─► Unauthenticated       denied ─► Forbidden
//! ```
//!
//! No step touches a store: trust comes from the token signature alone.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::codec::TokenCodec;
use crate::error::{KeyError, TokenError};
use crate::identity::Identity;
use crate::permissions::Permission;
use crate::policy::{AuthzError, PermissionPolicy};

/// Why a request is unauthenticated.
///
/// Only presence is distinguished; the reason a credential was invalid is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    MissingCredential,
    InvalidCredential,
}

impl UnauthenticatedReason {
    pub fn message(&self) -> &'static str {
        match self {
            UnauthenticatedReason::MissingCredential => "Authentication credentials were not provided",
            UnauthenticatedReason::InvalidCredential => "Invalid authentication credentials",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("{}", .0.message())]
    Unauthenticated(UnauthenticatedReason),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("authentication is misconfigured: {0}")]
    Configuration(KeyError),
}

impl GateError {
    /// Permissions named by a `Forbidden` outcome.
    pub fn missing_permissions(&self) -> &[Permission] {
        match self {
            GateError::Forbidden(e) => e.permissions(),
            _ => &[],
        }
    }
}

/// Pull the bearer credential out of an `Authorization` header value.
///
/// Accepts `Bearer <token>` (scheme case-insensitive) and a bare `<token>`.
/// A lone `Bearer` scheme carries no credential and counts as missing.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split_whitespace();
    let first = parts.next()?;
    match (parts.next(), parts.next()) {
        (None, _) if !first.eq_ignore_ascii_case("bearer") => Some(first),
        (Some(token), None) if first.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

/// Orchestrates token validation and permission checks for each request.
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<dyn TokenCodec>,
}

impl AuthGate {
    pub fn new(codec: Arc<dyn TokenCodec>) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &Arc<dyn TokenCodec> {
        &self.codec
    }

    /// Authenticate the raw `Authorization` header value.
    pub fn authenticate(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Identity, GateError> {
        let token = extract_bearer(header)
            .ok_or(GateError::Unauthenticated(UnauthenticatedReason::MissingCredential))?;

        let claims = self.codec.validate(token, now).map_err(|e| match e {
            TokenError::Configuration(key) => GateError::Configuration(key),
            _ => GateError::Unauthenticated(UnauthenticatedReason::InvalidCredential),
        })?;

        Identity::from_claims(claims)
            .ok_or(GateError::Unauthenticated(UnauthenticatedReason::InvalidCredential))
    }

    /// Check an authenticated identity against a route's policy.
    pub fn authorize(&self, identity: &Identity, policy: &PermissionPolicy) -> Result<(), GateError> {
        policy.evaluate(identity.permissions()).map_err(|e| {
            tracing::warn!(
                user_id = identity.id(),
                missing = %e,
                "permission denied"
            );
            GateError::Forbidden(e)
        })
    }

    /// Authenticate, then authorize.
    pub fn check(
        &self,
        header: Option<&str>,
        policy: &PermissionPolicy,
        now: DateTime<Utc>,
    ) -> Result<Identity, GateError> {
        let identity = self.authenticate(header, now)?;
        self.authorize(&identity, policy)?;
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_and_bare_forms_are_accepted() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(Some("bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(Some("BEARER   abc  ")), Some("abc"));
        assert_eq!(extract_bearer(Some("abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(Some("  abc  ")), Some("abc"));
    }

    #[test]
    fn malformed_headers_yield_no_credential() {
        assert_eq!(extract_bearer(None), None);
        assert_eq!(extract_bearer(Some("")), None);
        assert_eq!(extract_bearer(Some("   ")), None);
        assert_eq!(extract_bearer(Some("Bearer")), None);
        assert_eq!(extract_bearer(Some("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer(Some("Bearer a b")), None);
    }

    #[test]
    fn scheme_without_token_is_missing_not_invalid() {
        let gate = AuthGate::new(Arc::new(NeverCalled));
        for header in ["Bearer", "bearer  "] {
            assert_eq!(
                gate.authenticate(Some(header), Utc::now()),
                Err(GateError::Unauthenticated(UnauthenticatedReason::MissingCredential))
            );
        }
    }

    struct NeverCalled;

    impl TokenCodec for NeverCalled {
        fn issue_at(
            &self,
            _: &str,
            _: &str,
            _: &[Permission],
            _: chrono::Duration,
            _: DateTime<Utc>,
        ) -> Result<String, TokenError> {
            unreachable!("no token is issued")
        }

        fn validate(&self, _: &str, _: DateTime<Utc>) -> Result<crate::TokenClaims, TokenError> {
            unreachable!("a lone scheme never reaches validation")
        }

        fn token_lifetime(&self) -> chrono::Duration {
            chrono::Duration::hours(1)
        }
    }

    #[test]
    fn unauthenticated_messages_are_uniform() {
        assert_eq!(
            GateError::Unauthenticated(UnauthenticatedReason::InvalidCredential).to_string(),
            "Invalid authentication credentials"
        );
        assert_eq!(
            GateError::Unauthenticated(UnauthenticatedReason::MissingCredential).to_string(),
            "Authentication credentials were not provided"
        );
    }
}
