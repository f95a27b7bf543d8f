// @zen-component: AUTH-RequestGate
//
//! Authentication middleware. Extracts the bearer token, verifies it, and
//! injects the caller's [`Identity`] into request extensions.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use fleet_core::auth::TokenVerifier;
use fleet_core::models::auth::Identity;
use thiserror::Error;

use crate::AppState;
use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Key used to store the verified [`Identity`] in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

/// Why the gate rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization scheme")]
    InvalidScheme,

    #[error("Invalid or expired token")]
    InvalidToken,
}

impl From<GateError> for AppError {
    fn from(e: GateError) -> Self {
        AppError::Unauthorized(e.to_string())
    }
}

/// Resolve the caller from the `Authorization` header.
///
/// The scheme prefix is case-sensitive and the token is everything after it.
/// A header that is present but not visible ASCII counts as a bad scheme.
pub fn authenticate(headers: &HeaderMap, verifier: &TokenVerifier) -> Result<Identity, GateError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(GateError::MissingHeader)?
        .to_str()
        .map_err(|_| GateError::InvalidScheme)?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(GateError::InvalidScheme)?;

    verifier.identity(token).ok_or(GateError::InvalidToken)
}

/// Axum middleware: rejects unauthenticated requests with a JSON 401 and
/// injects [`AuthenticatedUser`] for everything downstream.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = authenticate(request.headers(), &state.verifier)?;
    request.extensions_mut().insert(AuthenticatedUser(identity));
    Ok(next.run(request).await)
}
