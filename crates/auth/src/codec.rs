//! Signed bearer tokens: issuance and validation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::Permission;
use crate::claims::{Audience, ClaimExpectations, TokenClaims, validate_claims};
use crate::config::TokenSettings;
use crate::error::{KeyError, TokenError};
use crate::keys::{self, LazyKey};

/// Issues and validates signed bearer tokens.
///
/// `validate` never panics and never distinguishes *why* a token was refused:
/// every cryptographic or claim failure is [`TokenError::Rejected`]. Only
/// unusable key material surfaces differently, as [`TokenError::Configuration`].
pub trait TokenCodec: Send + Sync {
    /// Issue a token at an explicit instant.
    fn issue_at(
        &self,
        subject: &str,
        email: &str,
        permissions: &[Permission],
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError>;

    /// Validate a presented token and return its claims.
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;

    /// Lifetime applied to tokens issued at login.
    fn token_lifetime(&self) -> Duration;

    fn issue(
        &self,
        subject: &str,
        email: &str,
        permissions: &[Permission],
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(subject, email, permissions, ttl, Utc::now())
    }
}

/// RSA-signed (RS*/PS*) token codec.
///
/// Signs with the private key and verifies with the public key, so a verifier
/// only ever needs the public half. Both keys are loaded lazily on first use and
/// cached for the lifetime of the codec.
pub struct RsaTokenCodec {
    settings: TokenSettings,
    expectations: ClaimExpectations,
    validation: Validation,
    signing_key: LazyKey<EncodingKey>,
    verifying_key: LazyKey<DecodingKey>,
}

impl RsaTokenCodec {
    pub fn new(settings: TokenSettings) -> Self {
        // Expiry, issuer and audience are checked by `validate_claims` against
        // integer seconds; the library only verifies algorithm and signature.
        let mut validation = Validation::new(settings.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let expectations = ClaimExpectations {
            issuer: settings.issuer.clone(),
            audiences: settings.audiences.clone(),
        };

        Self {
            signing_key: LazyKey::new("private", settings.private_key.clone()),
            verifying_key: LazyKey::new("public", settings.public_key.clone()),
            settings,
            expectations,
            validation,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Load both keys now instead of on first use.
    ///
    /// Useful at startup to fail fast; a key that is not configured at all is
    /// reported the same way as one that cannot be parsed.
    pub fn preload(&self) -> Result<(), KeyError> {
        self.signing_key.get_or_load(keys::parse_private)?;
        self.verifying_key.get_or_load(keys::parse_public)?;
        Ok(())
    }

    fn signing_key(&self) -> Result<&EncodingKey, KeyError> {
        self.signing_key
            .get_or_load(keys::parse_private)
            .inspect_err(|e| tracing::error!(error = %e, "cannot sign tokens"))
    }

    fn verifying_key(&self) -> Result<&DecodingKey, KeyError> {
        self.verifying_key
            .get_or_load(keys::parse_public)
            .inspect_err(|e| tracing::error!(error = %e, "cannot verify tokens"))
    }
}

impl TokenCodec for RsaTokenCodec {
    fn issue_at(
        &self,
        subject: &str,
        email: &str,
        permissions: &[Permission],
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = TokenClaims {
            sub: subject.to_string(),
            email: email.to_string(),
            permissions: permissions.to_vec(),
            iss: self.settings.issuer.clone(),
            aud: Audience::Many(self.settings.audiences.clone()),
            iat,
            exp: iat + ttl.num_seconds(),
        };

        let key = self.signing_key()?;
        jsonwebtoken::encode(&Header::new(self.settings.algorithm), &claims, key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let key = self.verifying_key()?;

        let data = jsonwebtoken::decode::<TokenClaims>(token, key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token failed verification");
            TokenError::Rejected
        })?;

        validate_claims(&data.claims, &self.expectations, now.timestamp()).map_err(|e| {
            tracing::debug!(error = %e, "token claims rejected");
            TokenError::Rejected
        })?;

        Ok(data.claims)
    }

    fn token_lifetime(&self) -> Duration {
        self.settings.lifetime
    }
}
