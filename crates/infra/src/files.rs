//! Audio-file metadata records.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use soundvault_core::FileId;

use crate::Page;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size: u64,
    pub content_type: String,
}

/// Metadata for an uploaded audio object. The bytes live in the object store
/// under `file_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFileRecord {
    pub id: FileId,
    pub file_type: String,
    pub file_name: String,
    pub file_url: String,
    pub file_metadata: FileMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn find_by_id(&self, id: &FileId) -> Result<Option<AudioFileRecord>, StoreError>;

    /// Newest first.
    async fn find_all(&self, skip: usize, limit: usize)
    -> Result<Page<AudioFileRecord>, StoreError>;

    /// Insert a record under its pre-assigned id (the id is part of the object key).
    async fn create(&self, file: AudioFileRecord) -> Result<AudioFileRecord, StoreError>;

    /// Replace an existing record and bump `updated_at`.
    async fn update(&self, file: AudioFileRecord) -> Result<AudioFileRecord, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &FileId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> FileStore for Arc<S>
where
    S: FileStore + ?Sized,
{
    async fn find_by_id(&self, id: &FileId) -> Result<Option<AudioFileRecord>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_all(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Page<AudioFileRecord>, StoreError> {
        (**self).find_all(skip, limit).await
    }

    async fn create(&self, file: AudioFileRecord) -> Result<AudioFileRecord, StoreError> {
        (**self).create(file).await
    }

    async fn update(&self, file: AudioFileRecord) -> Result<AudioFileRecord, StoreError> {
        (**self).update(file).await
    }

    async fn delete(&self, id: &FileId) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }
}

/// In-memory file metadata store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    inner: RwLock<HashMap<FileId, AudioFileRecord>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn find_by_id(&self, id: &FileId) -> Result<Option<AudioFileRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.get(id).cloned())
    }

    async fn find_all(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Page<AudioFileRecord>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut all: Vec<AudioFileRecord> = map.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(Page::slice(all, skip, limit))
    }

    async fn create(&self, file: AudioFileRecord) -> Result<AudioFileRecord, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if map.contains_key(&file.id) {
            return Err(StoreError::Conflict(format!("file id {}", file.id)));
        }
        map.insert(file.id.clone(), file.clone());
        tracing::info!(file_id = %file.id, "created file record");
        Ok(file)
    }

    async fn update(&self, mut file: AudioFileRecord) -> Result<AudioFileRecord, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if !map.contains_key(&file.id) {
            return Err(StoreError::NotFound("file"));
        }
        file.updated_at = Utc::now();
        map.insert(file.id.clone(), file.clone());
        Ok(file)
    }

    async fn delete(&self, id: &FileId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        Ok(map.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(name: &str, created_at: DateTime<Utc>) -> AudioFileRecord {
        let id = FileId::new();
        AudioFileRecord {
            file_url: format!("s3://bucket/users/user_1/{id}/{name}"),
            id,
            file_type: "audio/mpeg".into(),
            file_name: name.into(),
            file_metadata: FileMetadata {
                size: 1024,
                content_type: "audio/mpeg".into(),
            },
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn create_keeps_the_preassigned_id() {
        let store = InMemoryFileStore::new();
        let file = record("song.mp3", Utc::now());
        let id = file.id.clone();

        store.create(file).await.unwrap();
        let found = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(found.file_url.contains(id.as_str()));

        let dup = found.clone();
        assert!(matches!(store.create(dup).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let store = InMemoryFileStore::new();
        let base = Utc::now();
        store.create(record("old.mp3", base)).await.unwrap();
        store
            .create(record("new.mp3", base + Duration::minutes(1)))
            .await
            .unwrap();

        let page = store.find_all(0, 100).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].file_name, "new.mp3");
        assert_eq!(page.items[1].file_name, "old.mp3");
    }

    #[tokio::test]
    async fn update_and_delete() {
        let store = InMemoryFileStore::new();
        let mut file = store.create(record("a.mp3", Utc::now())).await.unwrap();

        file.file_name = "b.mp3".into();
        let saved = store.update(file.clone()).await.unwrap();
        assert_eq!(saved.file_name, "b.mp3");
        assert!(saved.updated_at >= saved.created_at);

        assert!(store.delete(&file.id).await.unwrap());
        assert_eq!(store.update(file).await, Err(StoreError::NotFound("file")));
    }

    #[test]
    fn metadata_serializes_as_an_object() {
        let meta = FileMetadata {
            size: 42,
            content_type: "audio/ogg".into(),
        };
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            serde_json::json!({ "size": 42, "content_type": "audio/ogg" })
        );
    }
}
