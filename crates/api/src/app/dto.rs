use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use soundvault_auth::Permission;
use soundvault_infra::{AudioFileRecord, FileMetadata, UserRecord};

use crate::app::errors::ServiceError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    /// `None` means the default permission set.
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAudioRequest {
    pub file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Resolve to `(skip, limit)`: `skip >= 0`, `1 <= limit <= 100`.
    pub fn resolve(&self, default_limit: usize) -> Result<(usize, usize), ServiceError> {
        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(ServiceError::validation("skip must be greater than or equal to 0"));
        }
        let limit = match self.limit {
            None => default_limit,
            Some(l) if (1..=100).contains(&l) => l as usize,
            Some(_) => return Err(ServiceError::validation("limit must be between 1 and 100")),
        };
        Ok((skip as usize, limit))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id.into(),
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            permissions: u.permissions,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Serialize)]
pub struct AudioFileResponse {
    pub id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub file_metadata: FileMetadata,
    pub created_at: DateTime<Utc>,
}

impl From<AudioFileRecord> for AudioFileResponse {
    fn from(f: AudioFileRecord) -> Self {
        Self {
            id: f.id.into(),
            file_name: f.file_name,
            file_url: f.file_url,
            file_type: f.file_type,
            file_metadata: f.file_metadata,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AudioFileListResponse {
    pub files: Vec<AudioFileResponse>,
}

#[derive(Debug, Serialize)]
pub struct AudioPlayResponse {
    pub signed_url: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
