//! Per-route permission checks.
//!
//! Each protected handler is wrapped with a [`RouteGuard`] carrying its
//! [`PermissionPolicy`]. The guard runs after [`auth_middleware`] has attached
//! the caller's identity.
//!
//! [`auth_middleware`]: crate::middleware::auth_middleware

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use soundvault_auth::{AuthGate, GateError, Identity, PermissionPolicy, UnauthenticatedReason};

use crate::app::errors::ServiceError;

#[derive(Clone)]
pub struct RouteGuard {
    gate: AuthGate,
    policy: PermissionPolicy,
}

/// Wrap a route so it only runs when the caller satisfies `policy`.
pub fn guarded<S>(route: MethodRouter<S>, gate: &AuthGate, policy: PermissionPolicy) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let guard = RouteGuard {
        gate: gate.clone(),
        policy,
    };
    route.layer(middleware::from_fn_with_state(guard, require_permissions))
}

pub async fn require_permissions(
    State(guard): State<RouteGuard>,
    req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    // Missing identity means the route was mounted outside the auth middleware.
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(GateError::Unauthenticated(UnauthenticatedReason::MissingCredential))?;

    guard.gate.authorize(identity, &guard.policy)?;
    Ok(next.run(req).await)
}
