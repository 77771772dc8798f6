//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are opaque strings carrying a type prefix (`user_…`, `file_…`) so
//! they stay readable in logs, object keys and token subjects.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Identifier of a stored audio file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

macro_rules! impl_prefixed_id {
    ($t:ty, $prefix:literal, $name:literal) => {
        impl $t {
            pub const PREFIX: &'static str = $prefix;

            /// Create a new identifier (`<prefix>_<uuidv7 hex>`).
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7().simple()))
            }

            /// Whether the identifier carries the expected type prefix.
            pub fn has_prefix(&self) -> bool {
                self.0
                    .strip_prefix($prefix)
                    .is_some_and(|rest| rest.starts_with('_'))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        /// Non-strict parse: any non-blank value is accepted (legacy ids may lack
        /// the prefix). Use [`Self::has_prefix`] for the strict check.
        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if s.is_empty() {
                    return Err(DomainError::invalid_id(format!("{} cannot be empty", $name)));
                }
                Ok(Self(s.to_string()))
            }
        }
    };
}

impl_prefixed_id!(UserId, "user", "UserId");
impl_prefixed_id!(FileId, "file", "FileId");
