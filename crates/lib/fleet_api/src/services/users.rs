//! User account management.

use fleet_core::auth::DenyReason;
use fleet_core::auth::password::hash_password;
use fleet_core::models::auth::{Identity, Role};
use fleet_core::models::user::{NewUser, User, UserChanges};
use fleet_core::store::UserStore;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::UpdateUserRequest;

const MIN_PASSWORD_LEN: usize = 8;

fn validate_username(username: &str) -> AppResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Create a user with a freshly hashed password.
pub async fn create_user(
    users: &dyn UserStore,
    username: &str,
    password: &str,
    role: Role,
) -> AppResult<User> {
    let username = validate_username(username)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let user = users
        .create_user(NewUser {
            username,
            password_hash,
            role,
        })
        .await?;
    info!(user_id = user.id, username = %user.username, %role, "user created");
    Ok(user)
}

/// Create an admin account unless `username` already exists.
///
/// Returns `true` when a user was created.
pub async fn ensure_admin(users: &dyn UserStore, username: &str, password: &str) -> AppResult<bool> {
    if users.find_user_by_username(username.trim()).await?.is_some() {
        return Ok(false);
    }
    create_user(users, username, password, Role::Admin).await?;
    Ok(true)
}

/// Partially update user `id` on behalf of `caller`.
///
/// Only admins may set a role. `Ok(None)` when the user does not exist.
pub async fn update_user(
    users: &dyn UserStore,
    caller: &Identity,
    id: i64,
    req: UpdateUserRequest,
) -> AppResult<Option<User>> {
    if req.role.is_some() && !caller.is_admin() {
        return Err(AppError::Forbidden(DenyReason::AdminRequired));
    }

    let mut changes = UserChanges {
        role: req.role,
        ..UserChanges::default()
    };
    if let Some(username) = req.username.as_deref() {
        changes.username = Some(validate_username(username)?);
    }
    if let Some(password) = req.password.as_deref() {
        validate_password(password)?;
        changes.password_hash = Some(hash_password(password)?);
    }

    let updated = users.update_user(id, changes).await?;
    if let Some(user) = &updated {
        info!(user_id = user.id, by = caller.subject(), "user updated");
    }
    Ok(updated)
}
