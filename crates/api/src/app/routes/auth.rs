use std::sync::Arc;

use axum::{Json, extract::Extension};

use crate::app::dto::{LoginRequest, TokenResponse};
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    let token = services.auth.login(&body.email, &body.password).await?;
    Ok(Json(token))
}
