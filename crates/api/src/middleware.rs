use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use soundvault_auth::{AuthGate, GateError, UnauthenticatedReason};

use crate::app::errors::ServiceError;

#[derive(Clone)]
pub struct AuthState {
    pub gate: AuthGate,
}

/// Authenticate the request and attach the caller's [`Identity`] as an extension.
///
/// [`Identity`]: soundvault_auth::Identity
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| {
            GateError::Unauthenticated(UnauthenticatedReason::InvalidCredential)
        })?),
    };

    let identity = state.gate.authenticate(header, Utc::now())?;
    tracing::debug!(user_id = identity.id(), "request authenticated");

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
