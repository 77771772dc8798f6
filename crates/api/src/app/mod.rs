//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: login, user and audio-file services over the store traits
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `validation.rs`: request field checks
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use soundvault_auth::{AuthGate, RsaTokenCodec, TokenCodec};
use soundvault_infra::{InMemoryFileStore, InMemoryObjectStore, InMemoryUserStore};

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod validation;

use errors::ServiceError;
use services::AppServices;

/// Build the full HTTP router over in-memory stores (public entrypoint used by `main.rs`).
///
/// Seeds the administrator account before returning.
pub async fn build_app(config: &AppConfig) -> Result<Router, ServiceError> {
    let bucket = config.s3_bucket.clone().unwrap_or_else(|| {
        tracing::warn!("S3_BUCKET_NAME is not set; uploads go to an unnamed bucket");
        String::new()
    });

    let codec: Arc<dyn TokenCodec> = Arc::new(RsaTokenCodec::new(config.token.clone()));
    let services = Arc::new(AppServices::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryFileStore::new()),
        Arc::new(InMemoryObjectStore::new(bucket, config.aws_region.clone())),
        codec.clone(),
        config.max_audio_file_size_bytes(),
    ));

    services.users.seed_admin(&config.admin).await?;

    Ok(router(services, AuthGate::new(codec)))
}

/// Wire routes over already-built services.
pub fn router(services: Arc<AppServices>, gate: AuthGate) -> Router {
    let max_upload_bytes = services.audio.max_upload_bytes();
    let auth_state = middleware::AuthState { gate: gate.clone() };

    // Protected routes: require a valid bearer token.
    let protected = routes::router(&gate, max_upload_bytes).layer(
        axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware),
    );

    let api = Router::new()
        .route("/health", get(routes::system::health))
        .route("/login", post(routes::auth::login))
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
