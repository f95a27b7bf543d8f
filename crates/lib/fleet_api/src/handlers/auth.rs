// @zen-component: AUTH-LoginEndpoint
//
//! Authentication request handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{LoginRequest, TokenResponse};
use crate::services::auth;

/// `POST /api/users/login`: exchange username + password for a bearer token.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(
        state.users.as_ref(),
        state.codec(),
        &body.username,
        &body.password,
    )
    .await?;
    Ok(Json(resp))
}
