//! Vehicle domain models.

use serde::{Deserialize, Serialize};

use super::user::UserSummary;

/// Stored vehicle with its owner resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    pub id: i64,
    pub plate: String,
    pub model: String,
    pub owner: Option<UserSummary>,
}

/// Short form of a vehicle embedded in a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub id: i64,
    pub plate: String,
    pub model: String,
}

impl From<&Vehicle> for VehicleSummary {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id,
            plate: vehicle.plate.clone(),
            model: vehicle.model.clone(),
        }
    }
}

/// Input for creating or replacing a vehicle.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub plate: String,
    pub model: String,
    pub user_id: Option<i64>,
}
