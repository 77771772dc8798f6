use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permission identifier.
///
/// Permissions are `resource:action` strings drawn from a closed vocabulary
/// ([`Permission::ALL`]). The special permission `"admin"` implies every other
/// permission.
///
/// Values decoded from a token are kept as-is (opaque strings); the vocabulary is
/// enforced when a credential record is created or updated, see
/// [`validate_permissions`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const READ_AUDIO: Permission = Permission::from_static("read:audio");
    pub const WRITE_AUDIO: Permission = Permission::from_static("write:audio");
    pub const DELETE_AUDIO: Permission = Permission::from_static("delete:audio");
    pub const READ_USER: Permission = Permission::from_static("read:user");
    pub const WRITE_USER: Permission = Permission::from_static("write:user");
    pub const DELETE_USER: Permission = Permission::from_static("delete:user");
    pub const ADMIN: Permission = Permission::from_static("admin");

    /// The complete vocabulary, in display order.
    pub const ALL: [Permission; 7] = [
        Self::READ_AUDIO,
        Self::WRITE_AUDIO,
        Self::DELETE_AUDIO,
        Self::READ_USER,
        Self::WRITE_USER,
        Self::DELETE_USER,
        Self::ADMIN,
    ];

    /// Granted to new accounts when the creator does not specify permissions.
    pub const DEFAULTS: [Permission; 2] = [Self::READ_AUDIO, Self::WRITE_AUDIO];

    const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Parse a permission string, rejecting anything outside the vocabulary.
    pub fn parse(name: &str) -> Result<Self, UnknownPermission> {
        Self::ALL
            .iter()
            .find(|p| p.as_str() == name)
            .cloned()
            .ok_or_else(|| UnknownPermission(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN.as_str()
    }

    pub fn is_known(&self) -> bool {
        Self::ALL.iter().any(|p| p == self)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

/// Check a requested permission list against the vocabulary.
///
/// Called at record-creation/update time. The error lists every offending entry.
pub fn validate_permissions(permissions: &[String]) -> Result<Vec<Permission>, InvalidPermissions> {
    let mut valid = Vec::with_capacity(permissions.len());
    let mut invalid = Vec::new();
    for p in permissions {
        match Permission::parse(p) {
            Ok(p) => valid.push(p),
            Err(UnknownPermission(name)) => invalid.push(name),
        }
    }
    if invalid.is_empty() {
        Ok(valid)
    } else {
        Err(InvalidPermissions(invalid))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "Invalid permissions: {}. Valid permissions are: {}",
    .0.join(", "),
    valid_permission_list()
)]
pub struct InvalidPermissions(pub Vec<String>);

fn valid_permission_list() -> String {
    let all = Permission::ALL;
    let mut names: Vec<&str> = all.iter().map(Permission::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

/// The set of permissions held by an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    pub fn is_admin(&self) -> bool {
        self.0.contains(&Permission::ADMIN)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Permission> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// True if the identity holds `admin`, or every required permission.
///
/// An empty requirement trivially passes.
pub fn has_all(identity: &PermissionSet, required: &[Permission]) -> bool {
    if identity.is_admin() {
        return true;
    }
    required.iter().all(|p| identity.contains(p))
}

/// True if the identity holds `admin`, or at least one required permission.
pub fn has_any(identity: &PermissionSet, required: &[Permission]) -> bool {
    if identity.is_admin() {
        return true;
    }
    required.iter().any(|p| identity.contains(p))
}

/// Required permissions the identity lacks (empty for admins).
pub fn missing(identity: &PermissionSet, required: &[Permission]) -> Vec<Permission> {
    if identity.is_admin() {
        return Vec::new();
    }
    let mut out: Vec<Permission> = required
        .iter()
        .filter(|p| !identity.contains(p))
        .cloned()
        .collect();
    out.sort();
    out.dedup();
    out
}
