//! `soundvault-auth`: stateless authentication/authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage: it hashes
//! passwords, issues and validates RSA-signed bearer tokens, and evaluates
//! permission policies. Callers hand it header values and get back an
//! [`Identity`] or a typed rejection.

pub mod claims;
pub mod codec;
pub mod config;
pub mod error;
pub mod gate;
pub mod identity;
pub mod keys;
pub mod password;
pub mod permissions;
pub mod policy;

pub use claims::{Audience, ClaimExpectations, ClaimsError, TokenClaims, parse_audience, validate_claims};
pub use codec::{RsaTokenCodec, TokenCodec};
pub use config::TokenSettings;
pub use error::{AuthError, KeyError, TokenError};
pub use gate::{AuthGate, GateError, UnauthenticatedReason, extract_bearer};
pub use identity::Identity;
pub use keys::KeySource;
pub use password::PasswordHasher;
pub use permissions::{InvalidPermissions, Permission, PermissionSet, has_all, has_any, validate_permissions};
pub use policy::{AuthzError, PermissionPolicy};
