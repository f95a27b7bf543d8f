//! Vehicle request handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fleet_core::models::vehicle::NewVehicle;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{VehicleRequest, VehicleResponse};

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Vehicle {id} not found"))
}

fn to_new_vehicle(body: VehicleRequest) -> AppResult<NewVehicle> {
    let plate = body.plate.trim();
    let model = body.model.trim();
    if plate.is_empty() || model.is_empty() {
        return Err(AppError::Validation(
            "Plate and model must not be empty".into(),
        ));
    }
    Ok(NewVehicle {
        plate: plate.to_string(),
        model: model.to_string(),
        user_id: body.user_id,
    })
}

/// `GET /api/vehicles`
pub async fn list_vehicles_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<VehicleResponse>>> {
    let vehicles = state.vehicles.list_vehicles().await?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}

/// `GET /api/vehicles/{id}`
pub async fn get_vehicle_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<VehicleResponse>> {
    let vehicle = state
        .vehicles
        .find_vehicle_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(vehicle.into()))
}

/// `GET /api/vehicles/user/{userId}`: self or admin.
pub async fn list_vehicles_by_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<VehicleResponse>>> {
    let vehicles = state.vehicles.list_vehicles_by_user(user_id).await?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}

/// `POST /api/vehicles`: admin only.
pub async fn create_vehicle_handler(
    State(state): State<AppState>,
    Json(body): Json<VehicleRequest>,
) -> AppResult<Json<VehicleResponse>> {
    let vehicle = state.vehicles.create_vehicle(to_new_vehicle(body)?).await?;
    info!(vehicle_id = vehicle.id, plate = %vehicle.plate, "vehicle created");
    Ok(Json(vehicle.into()))
}

/// `PUT /api/vehicles/{id}`: admin only; replaces plate, model and owner.
pub async fn update_vehicle_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<VehicleRequest>,
) -> AppResult<Json<VehicleResponse>> {
    let vehicle = state
        .vehicles
        .update_vehicle(id, to_new_vehicle(body)?)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(vehicle.into()))
}

/// `DELETE /api/vehicles/{id}`: admin only.
pub async fn delete_vehicle_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if !state.vehicles.delete_vehicle(id).await? {
        return Err(not_found(id));
    }
    info!(vehicle_id = id, "vehicle deleted");
    Ok(StatusCode::NO_CONTENT)
}
