use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Permission;

/// Bearer token claims (flat JSON payload).
///
/// Timestamps are integer seconds since the Unix epoch on both the issuing and
/// the verifying side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject / user identifier.
    #[serde(default)]
    pub sub: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    pub iss: String,

    pub aud: Audience,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

/// The `aud` claim: a bare string for a single audience, or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Audience::Single(aud) => std::slice::from_ref(aud),
            Audience::Many(auds) => auds,
        };
        slice.iter().map(|a| a.trim())
    }

    /// Case-sensitive exact match of at least one value against `accepted`.
    pub fn intersects(&self, accepted: &[String]) -> bool {
        self.values()
            .any(|aud| accepted.iter().any(|a| a.trim() == aud))
    }
}

/// Expand a comma-separated audience setting into its values.
///
/// Values are trimmed; empty segments are dropped.
pub fn parse_audience(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// What the verifying side expects of the standard claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimExpectations {
    pub issuer: String,
    pub audiences: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has expired")]
    Expired,

    #[error("token issuer '{0}' does not match the expected issuer")]
    IssuerMismatch(String),

    #[error("token audience {0:?} does not match the expected audiences")]
    AudienceMismatch(Vec<String>),
}

/// Deterministically validate the standard claims.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// the codec before this is called.
pub fn validate_claims(
    claims: &TokenClaims,
    expected: &ClaimExpectations,
    now: i64,
) -> Result<(), ClaimsError> {
    if now >= claims.exp {
        return Err(ClaimsError::Expired);
    }
    if claims.iss != expected.issuer {
        return Err(ClaimsError::IssuerMismatch(claims.iss.clone()));
    }
    if !claims.aud.intersects(&expected.audiences) {
        return Err(ClaimsError::AudienceMismatch(
            claims.aud.values().map(str::to_string).collect(),
        ));
    }
    Ok(())
}
