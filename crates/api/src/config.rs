//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use thiserror::Error;

use soundvault_auth::{KeyError, TokenSettings};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_MAX_AUDIO_FILE_SIZE_MB: u64 = 100;
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "Admin@password123";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error(transparent)]
    Token(#[from] KeyError),
}

/// Credentials of the administrator account seeded at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub token: TokenSettings,
    /// `None` means uploads land in an unnamed bucket; a warning is logged.
    pub s3_bucket: Option<String>,
    pub aws_region: String,
    pub max_audio_file_size_mb: u64,
    pub admin: AdminSeed,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse_or("BIND_ADDR", lookup("BIND_ADDR"), DEFAULT_BIND_ADDR)?;

        let max_audio_file_size_mb = match lookup("MAX_AUDIO_FILE_SIZE_MB") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(mb) if mb > 0 => mb,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "MAX_AUDIO_FILE_SIZE_MB",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_MAX_AUDIO_FILE_SIZE_MB,
        };

        let s3_bucket = lookup("S3_BUCKET_NAME").filter(|b| !b.trim().is_empty());

        let admin = AdminSeed {
            email: lookup("ADMIN_EMAIL").unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            password: lookup("ADMIN_PASSWORD").unwrap_or_else(|| {
                tracing::warn!("ADMIN_PASSWORD not set; using insecure dev default");
                DEFAULT_ADMIN_PASSWORD.to_string()
            }),
        };

        Ok(Self {
            bind_addr,
            token: TokenSettings::from_lookup(&lookup)?,
            s3_bucket,
            aws_region: lookup("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            max_audio_file_size_mb,
            admin,
        })
    }

    pub fn max_audio_file_size_bytes(&self) -> u64 {
        self.max_audio_file_size_mb * 1024 * 1024
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: &str,
) -> Result<T, ConfigError> {
    let raw = raw.unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(cfg.aws_region, "us-east-1");
        assert_eq!(cfg.max_audio_file_size_mb, 100);
        assert_eq!(cfg.max_audio_file_size_bytes(), 100 * 1024 * 1024);
        assert_eq!(cfg.s3_bucket, None);
        assert_eq!(cfg.admin.email, DEFAULT_ADMIN_EMAIL);
    }

    #[test]
    fn explicit_values_win() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("S3_BUCKET_NAME", "audio-prod"),
            ("AWS_REGION", "eu-central-1"),
            ("MAX_AUDIO_FILE_SIZE_MB", "5"),
            ("ADMIN_EMAIL", "root@example.com"),
            ("JWT_ISSUER", "https://issuer.example/"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.s3_bucket.as_deref(), Some("audio-prod"));
        assert_eq!(cfg.max_audio_file_size_bytes(), 5 * 1024 * 1024);
        assert_eq!(cfg.admin.email, "root@example.com");
        assert_eq!(cfg.token.issuer, "https://issuer.example/");
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(
            config(&[("BIND_ADDR", "not-an-addr")]),
            Err(ConfigError::Invalid { name: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            config(&[("MAX_AUDIO_FILE_SIZE_MB", "0")]),
            Err(ConfigError::Invalid { name: "MAX_AUDIO_FILE_SIZE_MB", .. })
        ));
        assert!(matches!(
            config(&[("JWT_ALGORITHM", "HS256")]),
            Err(ConfigError::Token(KeyError::UnsupportedAlgorithm(_)))
        ));
    }
}
