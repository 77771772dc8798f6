use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query},
    http::StatusCode,
    routing::{delete, get, post, put},
};

use soundvault_auth::{AuthGate, Identity, Permission, PermissionPolicy};

use crate::app::dto::{AudioFileListResponse, AudioFileResponse, AudioPlayResponse, PageQuery, UpdateAudioRequest};
use crate::app::errors::ServiceError;
use crate::app::services::{AppServices, IncomingFile};
use crate::authz::guarded;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const UPLOAD_FIELD: &str = "file";

/// Extra room on top of the file size limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(gate: &AuthGate, max_upload_bytes: u64) -> Router {
    let read = PermissionPolicy::require(Permission::READ_AUDIO);
    let write = PermissionPolicy::require(Permission::WRITE_AUDIO);
    let remove = PermissionPolicy::require(Permission::DELETE_AUDIO);

    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", guarded(get(list_files), gate, read.clone()))
        .route("/:id/play", guarded(get(play_file), gate, read))
        .route(
            "/upload",
            guarded(post(upload_file), gate, write.clone()).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/:id", guarded(put(update_file), gate, write))
        .route("/:id", guarded(delete(delete_file), gate, remove))
}

pub async fn list_files(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<AudioFileListResponse>, ServiceError> {
    let (skip, limit) = query.resolve(DEFAULT_PAGE_SIZE)?;
    Ok(Json(services.audio.list(skip, limit).await?))
}

pub async fn play_file(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<AudioPlayResponse>, ServiceError> {
    Ok(Json(services.audio.play(&id).await?))
}

pub async fn upload_file(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AudioFileResponse>), ServiceError> {
    let mut incoming = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::validation(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let body = field
            .bytes()
            .await
            .map_err(|e| ServiceError::validation(e.body_text()))?;
        incoming = Some(IncomingFile {
            file_name,
            content_type,
            body: body.to_vec(),
        });
        break;
    }

    let file = incoming
        .ok_or_else(|| ServiceError::validation(format!("multipart field '{UPLOAD_FIELD}' is required")))?;
    let created = services.audio.upload(&identity, file).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_file(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAudioRequest>,
) -> Result<Json<AudioFileResponse>, ServiceError> {
    Ok(Json(services.audio.update(&id, body).await?))
}

pub async fn delete_file(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    services.audio.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
