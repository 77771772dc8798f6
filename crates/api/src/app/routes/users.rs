use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{delete, get, post, put},
};

use soundvault_auth::{AuthGate, Identity, Permission, PermissionPolicy};

use crate::app::dto::{CreateUserRequest, PageQuery, PermissionsResponse, UpdateUserRequest, UserResponse};
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::authz::guarded;

pub const DEFAULT_PAGE_SIZE: usize = 20;

pub fn router(gate: &AuthGate) -> Router {
    let read = PermissionPolicy::require(Permission::READ_USER);
    let write = PermissionPolicy::require(Permission::WRITE_USER);
    let remove = PermissionPolicy::require(Permission::DELETE_USER);

    // Same path, separate method routers: each method carries its own guard.
    Router::new()
        .route("/permissions", get(list_permissions))
        .route("/", guarded(post(create_user), gate, write.clone()))
        .route("/", guarded(get(list_users), gate, read.clone()))
        .route("/:id", guarded(get(get_user), gate, read))
        .route("/:id", guarded(put(update_user), gate, write))
        .route("/:id", guarded(delete(delete_user), gate, remove))
}

/// The full permission vocabulary; any authenticated caller may read it.
pub async fn list_permissions(Extension(identity): Extension<Identity>) -> Json<PermissionsResponse> {
    tracing::info!(user_id = identity.id(), "listing permissions");
    Json(PermissionsResponse {
        permissions: Permission::ALL.to_vec(),
    })
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServiceError> {
    let user = services.users.create(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<UserResponse>>, ServiceError> {
    let (skip, limit) = query.resolve(DEFAULT_PAGE_SIZE)?;
    Ok(Json(services.users.list(skip, limit).await?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(services.users.get(&id).await?))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    Ok(Json(services.users.update(&id, body).await?))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    services.users.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
