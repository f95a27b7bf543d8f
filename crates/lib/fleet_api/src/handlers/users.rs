//! User request handlers.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use fleet_core::models::auth::Role;
use fleet_core::models::vehicle::Vehicle;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::services::users;

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User {id} not found"))
}

/// `GET /api/users`: all users with their vehicles.
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let all = state.users.list_users().await?;

    let mut by_owner: HashMap<i64, Vec<Vehicle>> = HashMap::new();
    for vehicle in state.vehicles.list_vehicles().await? {
        if let Some(owner) = &vehicle.owner {
            by_owner.entry(owner.id).or_default().push(vehicle);
        }
    }

    let resp = all
        .into_iter()
        .map(|user| {
            let vehicles = by_owner.remove(&user.id).unwrap_or_default();
            UserResponse::new(user, &vehicles)
        })
        .collect();
    Ok(Json(resp))
}

/// `GET /api/users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .users
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let vehicles = state.vehicles.list_vehicles_by_user(id).await?;
    Ok(Json(UserResponse::new(user, &vehicles)))
}

/// `POST /api/users`: admin only. Role defaults to USER.
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = users::create_user(
        state.users.as_ref(),
        &body.username,
        &body.password,
        body.role.unwrap_or(Role::User),
    )
    .await?;
    Ok(Json(UserResponse::new(user, &[])))
}

/// `PUT /api/users/{id}`: self or admin; partial update.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = users::update_user(state.users.as_ref(), &caller, id, body)
        .await?
        .ok_or_else(|| not_found(id))?;
    let vehicles = state.vehicles.list_vehicles_by_user(id).await?;
    Ok(Json(UserResponse::new(user, &vehicles)))
}

/// `DELETE /api/users/{id}`: self or admin. Also removes the user's vehicles.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !state.users.delete_user(id).await? {
        return Err(not_found(id));
    }
    info!(user_id = id, by = caller.subject(), "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
