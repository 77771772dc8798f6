//! Token configuration surface.

use chrono::Duration;
use jsonwebtoken::Algorithm;

use crate::claims::parse_audience;
use crate::error::KeyError;
use crate::keys::KeySource;

pub const DEFAULT_ISSUER: &str = "https://localhost:8000/";
pub const DEFAULT_AUDIENCE: &str = "https://localhost:3000/";
pub const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Everything the token codec needs to know.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub algorithm: Algorithm,
    pub issuer: String,
    /// Accepted audiences; every issued token carries all of them.
    pub audiences: Vec<String>,
    pub lifetime: Duration,
    pub private_key: Option<KeySource>,
    pub public_key: Option<KeySource>,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::RS256,
            issuer: DEFAULT_ISSUER.to_string(),
            audiences: parse_audience(DEFAULT_AUDIENCE),
            lifetime: Duration::hours(DEFAULT_EXPIRATION_HOURS),
            private_key: None,
            public_key: None,
        }
    }
}

impl TokenSettings {
    /// Read settings from `JWT_*` environment variables.
    ///
    /// Missing values fall back to the defaults above. Key material is only
    /// *located* here; it is read and parsed on first use.
    pub fn from_env() -> Result<Self, KeyError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] but with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, KeyError> {
        let defaults = Self::default();

        let algorithm = match lookup("JWT_ALGORITHM") {
            Some(name) => parse_algorithm(&name)?,
            None => defaults.algorithm,
        };

        let lifetime = match lookup("JWT_EXPIRATION_HOURS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 && Duration::try_hours(hours).is_some() => Duration::hours(hours),
                _ => {
                    tracing::warn!(value = %raw, "invalid JWT_EXPIRATION_HOURS; using default");
                    defaults.lifetime
                }
            },
            None => defaults.lifetime,
        };

        let issuer = lookup("JWT_ISSUER").unwrap_or(defaults.issuer);
        let audiences = lookup("JWT_AUDIENCE")
            .map(|raw| parse_audience(&raw))
            .unwrap_or(defaults.audiences);
        if audiences.is_empty() {
            tracing::warn!("JWT_AUDIENCE is empty; every token will be rejected");
        }

        let private_key = KeySource::from_parts(lookup("JWT_PRIVATE_KEY"), lookup("JWT_PRIVATE_KEY_PATH"));
        let public_key = KeySource::from_parts(lookup("JWT_PUBLIC_KEY"), lookup("JWT_PUBLIC_KEY_PATH"));
        if private_key.is_none() {
            tracing::warn!("no JWT private key configured; token issuance will fail");
        }
        if public_key.is_none() {
            tracing::warn!("no JWT public key configured; token validation will fail");
        }

        Ok(Self {
            algorithm,
            issuer,
            audiences,
            lifetime,
            private_key,
            public_key,
        })
    }

    pub fn with_keys(mut self, private_key: Option<KeySource>, public_key: Option<KeySource>) -> Self {
        self.private_key = private_key;
        self.public_key = public_key;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the accepted audiences from a comma-separated list.
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.audiences = parse_audience(audience);
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }
}

/// Parse an algorithm name, accepting only the RSA family.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, KeyError> {
    let algorithm: Algorithm = name
        .trim()
        .parse()
        .map_err(|_| KeyError::UnsupportedAlgorithm(name.to_string()))?;
    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Ok(algorithm),
        _ => Err(KeyError::UnsupportedAlgorithm(name.to_string())),
    }
}
