//! RSA key material: where it comes from and how it is cached.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::error::KeyError;

/// Where a PEM key is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Path to a PEM file.
    Path(PathBuf),
    /// Inline PEM text.
    Pem(String),
}

impl KeySource {
    /// Pick the configured source; inline PEM wins over a file path.
    pub fn from_parts(pem: Option<String>, path: Option<String>) -> Option<Self> {
        let pem = pem.filter(|s| !s.trim().is_empty());
        let path = path.filter(|s| !s.trim().is_empty());
        match (pem, path) {
            (Some(pem), _) => Some(Self::Pem(pem)),
            (None, Some(path)) => Some(Self::Path(PathBuf::from(path))),
            (None, None) => None,
        }
    }

    /// Read the PEM bytes.
    ///
    /// Inline PEM copied into a single-line env var usually has its newlines
    /// escaped as `\n`; those are expanded back.
    pub fn read(&self, kind: &'static str) -> Result<Vec<u8>, KeyError> {
        match self {
            KeySource::Pem(pem) => Ok(pem.replace("\\n", "\n").into_bytes()),
            KeySource::Path(path) => std::fs::read(path).map_err(|e| KeyError::Unreadable {
                kind,
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// A key that is loaded on first use and then kept for the owner's lifetime.
///
/// First use is serialised by a mutex so concurrent callers load the key at most
/// once; once populated, reads go straight to the `OnceLock`.
pub(crate) struct LazyKey<K> {
    kind: &'static str,
    source: Option<KeySource>,
    cell: OnceLock<K>,
    init: Mutex<()>,
}

impl<K> LazyKey<K> {
    pub(crate) fn new(kind: &'static str, source: Option<KeySource>) -> Self {
        Self {
            kind,
            source,
            cell: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub(crate) fn get_or_load(
        &self,
        parse: impl FnOnce(&[u8]) -> Result<K, jsonwebtoken::errors::Error>,
    ) -> Result<&K, KeyError> {
        if let Some(key) = self.cell.get() {
            return Ok(key);
        }

        let _guard = self.init.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(key) = self.cell.get() {
            return Ok(key);
        }

        let source = self.source.as_ref().ok_or(KeyError::NotConfigured(self.kind))?;
        let pem = source.read(self.kind)?;
        let key = parse(&pem).map_err(|e| KeyError::Invalid {
            kind: self.kind,
            reason: e.to_string(),
        })?;

        tracing::info!(kind = self.kind, "loaded RSA key");
        Ok(self.cell.get_or_init(|| key))
    }
}

pub(crate) fn parse_private(pem: &[u8]) -> Result<EncodingKey, jsonwebtoken::errors::Error> {
    EncodingKey::from_rsa_pem(pem)
}

pub(crate) fn parse_public(pem: &[u8]) -> Result<DecodingKey, jsonwebtoken::errors::Error> {
    DecodingKey::from_rsa_pem(pem)
}
