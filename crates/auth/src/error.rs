use thiserror::Error;

/// Key material could not be loaded.
///
/// This is a configuration fault: it is fatal for issuance/validation and is
/// never reported to clients as an authentication failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("no {0} key configured (set the inline PEM or the key file path)")]
    NotConfigured(&'static str),

    #[error("{kind} key file {path} could not be read: {reason}")]
    Unreadable {
        kind: &'static str,
        path: String,
        reason: String,
    },

    #[error("{kind} key is not a valid RSA PEM: {reason}")]
    Invalid { kind: &'static str, reason: String },

    #[error("unsupported signing algorithm '{0}' (an RSA algorithm is required)")]
    UnsupportedAlgorithm(String),
}

/// Outcome of a failed codec operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The presented token failed a cryptographic or claim check.
    ///
    /// Deliberately carries no detail about *which* check failed.
    #[error("token rejected")]
    Rejected,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Configuration(#[from] KeyError),
}

/// Credential hashing failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("password hashing failed")]
    HashingFailed,
}
