//! Request and response bodies.
//!
//! Wire shapes use camelCase and never expose password hashes.

use fleet_core::models::auth::Role;
use fleet_core::models::user::{User, UserSummary};
use fleet_core::models::vehicle::{Vehicle, VehicleSummary};
use serde::{Deserialize, Serialize};

/// Error body for JSON error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub vehicles: Vec<VehicleSummary>,
}

impl UserResponse {
    pub fn new(user: User, vehicles: &[Vehicle]) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            vehicles: vehicles.iter().map(VehicleSummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRequest {
    pub plate: String,
    pub model: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleResponse {
    pub id: i64,
    pub plate: String,
    pub model: String,
    pub user: Option<UserSummary>,
}

impl From<Vehicle> for VehicleResponse {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            id: vehicle.id,
            plate: vehicle.plate,
            model: vehicle.model,
            user: vehicle.owner,
        }
    }
}
