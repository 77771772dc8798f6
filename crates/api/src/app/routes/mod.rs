use axum::Router;

use soundvault_auth::AuthGate;

pub mod audio;
pub mod auth;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints; each route carries its own policy.
pub fn router(gate: &AuthGate, max_upload_bytes: u64) -> Router {
    Router::new()
        .nest("/users", users::router(gate))
        .nest("/audio", audio::router(gate, max_upload_bytes))
}
