//! Infrastructure layer: credential records, audio-file metadata, object storage.
//!
//! Each collaborator is a trait with an in-memory adapter. Production document
//! and bucket adapters plug in behind the same traits.

pub mod error;
pub mod files;
pub mod object_store;
pub mod users;

pub use error::StoreError;
pub use files::{AudioFileRecord, FileMetadata, FileStore, InMemoryFileStore};
pub use object_store::{
    InMemoryObjectStore, ObjectStore, ObjectUpload, StoredObject, object_key, object_url,
    parse_bucket_and_key,
};
pub use users::{InMemoryUserStore, UserRecord, UserStore};

/// One page of a listing plus the total number of matching records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Page<T> {
    pub(crate) fn slice(all: Vec<T>, skip: usize, limit: usize) -> Self {
        let total = all.len();
        let items = all.into_iter().skip(skip).take(limit).collect();
        Self { items, total }
    }
}
