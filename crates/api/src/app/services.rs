//! Application services: login, user administration, audio files.
//!
//! Each service owns `Arc`s to the collaborator traits it needs, so the router
//! can be built over in-memory adapters in tests and real ones in production.

use std::sync::Arc;

use soundvault_auth::{Identity, PasswordHasher, Permission, TokenCodec};
use soundvault_core::{FileId, UserId};
use soundvault_infra::{
    AudioFileRecord, FileMetadata, FileStore, ObjectStore, ObjectUpload, UserRecord, UserStore,
};

use crate::app::dto::{
    AudioFileListResponse, AudioFileResponse, AudioPlayResponse, CreateUserRequest,
    TokenResponse, UpdateAudioRequest, UpdateUserRequest, UserResponse,
};
use crate::app::errors::ServiceError;
use crate::app::validation;
use crate::config::AdminSeed;

/// Lifetime of a playback URL, in seconds.
pub const PLAY_URL_TTL_SECS: u64 = 3600;
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Everything the router needs, shared behind one `Arc`.
pub struct AppServices {
    pub auth: AuthService,
    pub users: UserService,
    pub audio: AudioService,
}

impl AppServices {
    pub fn new(
        users: Arc<dyn UserStore>,
        files: Arc<dyn FileStore>,
        objects: Arc<dyn ObjectStore>,
        codec: Arc<dyn TokenCodec>,
        max_upload_bytes: u64,
    ) -> Self {
        let hasher = PasswordHasher::new();
        Self {
            auth: AuthService {
                users: users.clone(),
                hasher: hasher.clone(),
                codec,
            },
            users: UserService { users, hasher },
            audio: AudioService {
                files,
                objects,
                max_upload_bytes,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    codec: Arc<dyn TokenCodec>,
}

impl AuthService {
    /// Exchange credentials for a bearer token carrying the stored permissions.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ServiceError> {
        let email = validation::email(email).map_err(ServiceError::Validation)?;
        tracing::info!(email = %email, "login attempt");

        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::warn!(email = %email, "login failed: unknown email");
            return Err(ServiceError::invalid_login());
        };

        if !self.hasher.verify_password(password, &user.password_hash) {
            tracing::warn!(email = %email, "login failed: wrong password");
            return Err(ServiceError::invalid_login());
        }

        let token = self.codec.issue(
            user.id.as_str(),
            &user.email,
            &user.permissions,
            self.codec.token_lifetime(),
        )?;

        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(TokenResponse::bearer(token))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

pub struct UserService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

/// `read:audio` is always granted on top of whatever was requested.
fn with_read_audio(mut permissions: Vec<Permission>) -> Vec<Permission> {
    if !permissions.contains(&Permission::READ_AUDIO) {
        permissions.push(Permission::READ_AUDIO);
    }
    permissions
}

fn parse_user_id(raw: &str) -> Result<UserId, ServiceError> {
    Ok(raw.parse::<UserId>()?)
}

impl UserService {
    pub async fn create(&self, req: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        let first_name = validation::name("First name", &req.first_name).map_err(ServiceError::Validation)?;
        let last_name = validation::name("Last name", &req.last_name).map_err(ServiceError::Validation)?;
        let email = validation::email(&req.email).map_err(ServiceError::Validation)?;
        let password = validation::password(&req.password).map_err(ServiceError::Validation)?;
        if password != req.confirm_password.trim() {
            return Err(ServiceError::validation(
                "Password and confirm_password do not match",
            ));
        }
        let permissions = match &req.permissions {
            Some(raw) => validation::permissions(raw).map_err(ServiceError::Validation)?,
            None => Permission::DEFAULTS.to_vec(),
        };

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "User with this email already exists.".to_string(),
            ));
        }

        let hash = self.hasher.hash_password(&password)?;
        let record = UserRecord::new(first_name, last_name, email, hash, with_read_audio(permissions));
        let created = self.users.create(record).await?;

        tracing::info!(user_id = %created.id, "user created");
        Ok(created.into())
    }

    pub async fn list(&self, skip: usize, limit: usize) -> Result<Vec<UserResponse>, ServiceError> {
        let page = self.users.find_all(skip, limit).await?;
        tracing::info!(returned = page.items.len(), total = page.total, "listed users");
        Ok(page.items.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: &str) -> Result<UserResponse, ServiceError> {
        let id = parse_user_id(id)?;
        self.users
            .find_by_id(&id)
            .await?
            .map(Into::into)
            .ok_or(ServiceError::NotFound("User"))
    }

    pub async fn update(&self, id: &str, req: UpdateUserRequest) -> Result<UserResponse, ServiceError> {
        let id = parse_user_id(id)?;
        let mut user = self
            .users
            .find_by_id(&id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        if let Some(first_name) = &req.first_name {
            user.first_name = validation::name("First name", first_name).map_err(ServiceError::Validation)?;
        }
        if let Some(last_name) = &req.last_name {
            user.last_name = validation::name("Last name", last_name).map_err(ServiceError::Validation)?;
        }
        if let Some(email) = &req.email {
            let email = validation::email(email).map_err(ServiceError::Validation)?;
            if email != user.email && self.users.find_by_email(&email).await?.is_some() {
                return Err(ServiceError::Conflict("Email already exists".to_string()));
            }
            user.email = email;
        }
        if let Some(password) = &req.password {
            let password = validation::password(password).map_err(ServiceError::Validation)?;
            user.password_hash = self.hasher.hash_password(&password)?;
        }
        if let Some(raw) = &req.permissions {
            user.permissions = validation::permissions(raw).map_err(ServiceError::Validation)?;
        }
        user.permissions = with_read_audio(std::mem::take(&mut user.permissions));

        let updated = self.users.update(user).await?;
        tracing::info!(user_id = %updated.id, "user updated");
        Ok(updated.into())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_user_id(id)?;
        if self.users.find_by_id(&id).await?.is_none() {
            return Err(ServiceError::NotFound("User"));
        }
        if !self.users.delete(&id).await? {
            return Err(ServiceError::NotFound("User"));
        }
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Create the administrator account unless a user with that email exists.
    ///
    /// Returns whether an account was created.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> Result<bool, ServiceError> {
        let email = validation::email(&seed.email).map_err(ServiceError::Validation)?;
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(false);
        }

        let hash = self.hasher.hash_password(&seed.password)?;
        let record = UserRecord::new("Admin", "User", email, hash, Permission::ALL.to_vec());
        let created = self.users.create(record).await?;
        tracing::info!(user_id = %created.id, email = %created.email, "default admin user created");
        Ok(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audio files
// ─────────────────────────────────────────────────────────────────────────────

pub struct AudioService {
    files: Arc<dyn FileStore>,
    objects: Arc<dyn ObjectStore>,
    max_upload_bytes: u64,
}

/// A file received from a multipart upload.
#[derive(Debug, Clone, Default)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

fn parse_file_id(raw: &str) -> Result<FileId, ServiceError> {
    Ok(raw.parse::<FileId>()?)
}

impl AudioService {
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub async fn list(&self, skip: usize, limit: usize) -> Result<AudioFileListResponse, ServiceError> {
        let page = self.files.find_all(skip, limit).await?;
        Ok(AudioFileListResponse {
            files: page.items.into_iter().map(Into::into).collect(),
        })
    }

    pub async fn play(&self, id: &str) -> Result<AudioPlayResponse, ServiceError> {
        let id = parse_file_id(id)?;
        let file = self
            .files
            .find_by_id(&id)
            .await?
            .ok_or(ServiceError::NotFound("File"))?;

        let signed_url = self.objects.signed_url(&file.file_url, PLAY_URL_TTL_SECS).await?;
        Ok(AudioPlayResponse {
            signed_url,
            expires_in: PLAY_URL_TTL_SECS,
        })
    }

    pub async fn upload(
        &self,
        uploader: &Identity,
        file: IncomingFile,
    ) -> Result<AudioFileResponse, ServiceError> {
        let size = file.body.len() as u64;
        validation::audio_file(
            file.file_name.as_deref(),
            file.content_type.as_deref(),
            size,
            self.max_upload_bytes,
        )
        .map_err(ServiceError::Validation)?;

        // Validated above; both are present.
        let file_name = file.file_name.unwrap_or_default();
        let content_type = file.content_type.unwrap_or_default();

        let user_id: UserId = uploader.id().parse()?;
        // The id is fixed before upload so the object key and the record agree.
        let file_id = FileId::new();

        let file_url = self
            .objects
            .upload(ObjectUpload {
                user_id: &user_id,
                file_id: &file_id,
                file_name: &file_name,
                content_type: &content_type,
                body: file.body,
            })
            .await
            .inspect_err(|e| tracing::error!(error = %e, "upload to object storage failed"))?;

        let now = chrono::Utc::now();
        let record = AudioFileRecord {
            id: file_id,
            file_type: content_type.clone(),
            file_name,
            file_url,
            file_metadata: FileMetadata { size, content_type },
            created_at: now,
            updated_at: now,
        };
        let created = self.files.create(record).await?;

        tracing::info!(file_id = %created.id, user_id = %user_id, size, "file uploaded");
        Ok(created.into())
    }

    pub async fn update(&self, id: &str, req: UpdateAudioRequest) -> Result<AudioFileResponse, ServiceError> {
        let id = parse_file_id(id)?;
        let mut file = self
            .files
            .find_by_id(&id)
            .await?
            .ok_or(ServiceError::NotFound("File"))?;

        if let Some(new_name) = &req.file_name {
            if new_name.chars().count() > MAX_FILE_NAME_LENGTH {
                return Err(ServiceError::validation(format!(
                    "File name cannot exceed {MAX_FILE_NAME_LENGTH} characters"
                )));
            }
            file.file_name = validation::rename(&file.file_name, new_name).map_err(ServiceError::Validation)?;
        }

        let updated = self.files.update(file).await?;
        tracing::info!(file_id = %updated.id, "file updated");
        Ok(updated.into())
    }

    /// Remove the object and then the record. The record is deleted even when
    /// the object store fails, so no metadata is left pointing at nothing.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_file_id(id)?;
        let file = self
            .files
            .find_by_id(&id)
            .await?
            .ok_or(ServiceError::NotFound("File"))?;

        match self.objects.delete(&file.file_url).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                file_url = %file.file_url,
                "object was not deleted; continuing with record deletion"
            ),
            Err(e) => tracing::error!(
                error = %e,
                file_url = %file.file_url,
                "object deletion failed; continuing with record deletion"
            ),
        }

        if !self.files.delete(&id).await? {
            return Err(ServiceError::NotFound("File"));
        }
        tracing::info!(file_id = %id, "file deleted");
        Ok(())
    }
}
