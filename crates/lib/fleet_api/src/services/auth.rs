// @zen-component: AUTH-CredentialService
//
//! Login flow: check credentials against the user store, then issue a token.

use fleet_core::auth::password::verify_password;
use fleet_core::auth::{AuthError, TokenCodec};
use fleet_core::store::UserStore;
use tracing::info;

use crate::error::AppResult;
use crate::models::TokenResponse;

/// Authenticate with username + password.
///
/// Unknown users and wrong passwords fail identically.
pub async fn login(
    users: &dyn UserStore,
    codec: &TokenCodec,
    username: &str,
    password: &str,
) -> AppResult<TokenResponse> {
    let Some(user) = users.find_user_by_username(username).await? else {
        info!(username, "login rejected");
        return Err(AuthError::Credentials.into());
    };

    if !verify_password(password, &user.password_hash)? {
        info!(username, "login rejected");
        return Err(AuthError::Credentials.into());
    }

    let token = codec
        .issue(&user.username, user.role)
        .map_err(AuthError::from)?;
    info!(username, role = %user.role, "login succeeded");

    Ok(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: codec.ttl().num_seconds(),
    })
}
