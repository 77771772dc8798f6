use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use soundvault_auth::{AuthError, GateError, KeyError, TokenError};
use soundvault_core::DomainError;
use soundvault_infra::StoreError;

pub const INVALID_LOGIN: &str = "Invalid email or password";

/// Everything a handler can fail with, mapped onto one HTTP response shape.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("{0}")]
    InvalidLogin(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Hashing(#[from] AuthError),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn invalid_login() -> Self {
        ServiceError::InvalidLogin(INVALID_LOGIN)
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<KeyError> for ServiceError {
    fn from(err: KeyError) -> Self {
        ServiceError::Token(TokenError::Configuration(err))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Gate(GateError::Unauthenticated(reason)) => {
                unauthorized(reason.message())
            }
            ServiceError::Gate(GateError::Forbidden(e)) => {
                let missing: Vec<&str> = e.permissions().iter().map(|p| p.as_str()).collect();
                (
                    StatusCode::FORBIDDEN,
                    axum::Json(json!({
                        "error": "forbidden",
                        "message": e.to_string(),
                        "missing_permissions": missing,
                    })),
                )
                    .into_response()
            }
            ServiceError::Gate(GateError::Configuration(e)) => internal("auth_misconfigured", &e),
            ServiceError::InvalidLogin(msg) => unauthorized(msg),
            ServiceError::Validation(msg) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
            }
            ServiceError::NotFound(what) => {
                json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
            }
            ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            ServiceError::Store(StoreError::NotFound(what)) => {
                json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
            }
            ServiceError::Store(StoreError::Conflict(msg)) => {
                json_error(StatusCode::CONFLICT, "conflict", msg)
            }
            ServiceError::Store(e) => internal("store_error", &e),
            ServiceError::Token(e) => internal("token_error", &e),
            ServiceError::Hashing(e) => internal("hashing_error", &e),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn unauthorized(message: &str) -> Response {
    let mut res = json_error(StatusCode::UNAUTHORIZED, "unauthorized", message);
    res.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

/// Server-side faults are logged in full and reported generically.
fn internal(code: &'static str, err: &dyn std::error::Error) -> Response {
    tracing::error!(error = %err, code, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, "internal server error")
}
