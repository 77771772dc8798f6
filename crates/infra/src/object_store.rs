//! Object storage for audio bytes, addressed by `s3://bucket/key` URLs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use soundvault_core::{FileId, UserId};

use crate::error::StoreError;

/// Object key for an upload: `users/{user_id}/{file_id}/{file_name}` with
/// spaces and slashes in the file name replaced by `_`.
pub fn object_key(user_id: &UserId, file_id: &FileId, file_name: &str) -> String {
    let safe_name = file_name.replace([' ', '/'], "_");
    format!("users/{user_id}/{file_id}/{safe_name}")
}

pub fn object_url(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// Split an `s3://bucket/key` URL. Anything else is taken as a bare key in
/// `default_bucket`.
pub fn parse_bucket_and_key<'a>(file_url: &'a str, default_bucket: &'a str) -> (&'a str, &'a str) {
    match file_url.strip_prefix("s3://") {
        Some(rest) => rest.split_once('/').unwrap_or((rest, "")),
        None => (default_bucket, file_url),
    }
}

pub struct ObjectUpload<'a> {
    pub user_id: &'a UserId,
    pub file_id: &'a FileId,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the bytes and return the object's `s3://` URL.
    async fn upload(&self, upload: ObjectUpload<'_>) -> Result<String, StoreError>;

    /// Time-limited URL for reading the object.
    async fn signed_url(&self, file_url: &str, expires_in_secs: u64) -> Result<String, StoreError>;

    /// Returns whether the object was removed.
    async fn delete(&self, file_url: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// In-memory bucket for tests/dev. Signed URLs point at the regional S3
/// endpoint but are not actually signed.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    bucket: String,
    region: String,
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn get(&self, file_url: &str) -> Option<StoredObject> {
        let (bucket, key) = parse_bucket_and_key(file_url, &self.bucket);
        let objects = self.objects.read().ok()?;
        objects.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(&self, upload: ObjectUpload<'_>) -> Result<String, StoreError> {
        let key = object_key(upload.user_id, upload.file_id, upload.file_name);
        let url = object_url(&self.bucket, &key);

        let mut objects = self.objects.write().map_err(|_| StoreError::poisoned())?;
        objects.insert(
            (self.bucket.clone(), key),
            StoredObject {
                content_type: upload.content_type.to_string(),
                body: upload.body,
            },
        );
        tracing::info!(file_url = %url, "object uploaded");
        Ok(url)
    }

    async fn signed_url(&self, file_url: &str, expires_in_secs: u64) -> Result<String, StoreError> {
        let (bucket, key) = parse_bucket_and_key(file_url, &self.bucket);
        if bucket.is_empty() || key.is_empty() {
            return Err(StoreError::ObjectStorage(format!(
                "cannot sign malformed object url {file_url}"
            )));
        }
        tracing::info!(key, expires_in_secs, "generated signed url");
        Ok(format!(
            "https://{bucket}.s3.{}.amazonaws.com/{key}?X-Amz-Expires={expires_in_secs}",
            self.region
        ))
    }

    async fn delete(&self, file_url: &str) -> Result<bool, StoreError> {
        let (bucket, key) = parse_bucket_and_key(file_url, &self.bucket);
        let mut objects = self.objects.write().map_err(|_| StoreError::poisoned())?;
        let removed = objects
            .remove(&(bucket.to_string(), key.to_string()))
            .is_some();
        if removed {
            tracing::info!(key, "object deleted");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_by_user_and_file_and_sanitised() {
        let user: UserId = "user_1".parse().unwrap();
        let file: FileId = "file_9".parse().unwrap();
        assert_eq!(
            object_key(&user, &file, "my song/live take.mp3"),
            "users/user_1/file_9/my_song_live_take.mp3"
        );
    }

    #[test]
    fn parses_s3_urls_and_bare_keys() {
        assert_eq!(
            parse_bucket_and_key("s3://my-bucket/path/to/file.mp3", "default"),
            ("my-bucket", "path/to/file.mp3")
        );
        assert_eq!(
            parse_bucket_and_key("path/to/file.mp3", "default"),
            ("default", "path/to/file.mp3")
        );
        assert_eq!(parse_bucket_and_key("s3://only-bucket", "default"), ("only-bucket", ""));
    }

    #[tokio::test]
    async fn upload_sign_delete() {
        let store = InMemoryObjectStore::new("audio", "eu-west-1");
        let user = UserId::new();
        let file = FileId::new();

        let url = store
            .upload(ObjectUpload {
                user_id: &user,
                file_id: &file,
                file_name: "a b.mp3",
                content_type: "audio/mpeg",
                body: vec![1, 2, 3],
            })
            .await
            .unwrap();
        assert_eq!(url, format!("s3://audio/users/{user}/{file}/a_b.mp3"));
        assert_eq!(
            store.get(&url),
            Some(StoredObject {
                content_type: "audio/mpeg".into(),
                body: vec![1, 2, 3],
            })
        );

        let signed = store.signed_url(&url, 3600).await.unwrap();
        assert!(signed.starts_with("https://audio.s3.eu-west-1.amazonaws.com/users/"));
        assert!(signed.ends_with("X-Amz-Expires=3600"));

        assert!(store.delete(&url).await.unwrap());
        assert!(!store.delete(&url).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn signing_a_bucketless_url_fails() {
        let store = InMemoryObjectStore::new("", "us-east-1");
        assert!(matches!(
            store.signed_url("users/x/y/z.mp3", 60).await,
            Err(StoreError::ObjectStorage(_))
        ));
    }
}
