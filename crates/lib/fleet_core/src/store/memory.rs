//! In-process store.
//!
//! Both tables live behind one `RwLock` so that username uniqueness and the
//! user → vehicles cascade are applied atomically.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, UserStore, VehicleStore};
use crate::models::user::{NewUser, User, UserChanges, UserSummary};
use crate::models::vehicle::{NewVehicle, Vehicle};

#[derive(Debug, Clone)]
struct VehicleRow {
    plate: String,
    model: String,
    user_id: Option<i64>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    vehicles: BTreeMap<i64, VehicleRow>,
    next_user_id: i64,
    next_vehicle_id: i64,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn check_owner(&self, user_id: Option<i64>) -> Result<(), StoreError> {
        match user_id {
            Some(id) if !self.users.contains_key(&id) => Err(StoreError::UnknownOwner(id)),
            _ => Ok(()),
        }
    }

    fn hydrate(&self, id: i64, row: &VehicleRow) -> Vehicle {
        Vehicle {
            id,
            plate: row.plate.clone(),
            model: row.model.clone(),
            owner: row
                .user_id
                .and_then(|uid| self.users.get(&uid))
                .map(UserSummary::from),
        }
    }
}

/// Store holding everything in memory; contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&user.username, None) {
            return Err(StoreError::Duplicate(user.username));
        }
        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(
        &self,
        id: i64,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(username) = &changes.username
            && tables.username_taken(username, Some(id))
        {
            return Err(StoreError::Duplicate(username.clone()));
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(user);
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.vehicles.retain(|_, v| v.user_id != Some(id));
        Ok(true)
    }
}

#[async_trait]
impl VehicleStore for MemoryStore {
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .iter()
            .map(|(id, row)| tables.hydrate(*id, row))
            .collect())
    }

    async fn find_vehicle_by_id(&self, id: i64) -> Result<Option<Vehicle>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.vehicles.get(&id).map(|row| tables.hydrate(id, row)))
    }

    async fn list_vehicles_by_user(&self, user_id: i64) -> Result<Vec<Vehicle>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .iter()
            .filter(|(_, row)| row.user_id == Some(user_id))
            .map(|(id, row)| tables.hydrate(*id, row))
            .collect())
    }

    async fn create_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_owner(vehicle.user_id)?;
        tables.next_vehicle_id += 1;
        let id = tables.next_vehicle_id;
        let row = VehicleRow {
            plate: vehicle.plate,
            model: vehicle.model,
            user_id: vehicle.user_id,
        };
        let created = tables.hydrate(id, &row);
        tables.vehicles.insert(id, row);
        Ok(created)
    }

    async fn update_vehicle(
        &self,
        id: i64,
        vehicle: NewVehicle,
    ) -> Result<Option<Vehicle>, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.vehicles.contains_key(&id) {
            return Ok(None);
        }
        tables.check_owner(vehicle.user_id)?;
        let row = VehicleRow {
            plate: vehicle.plate,
            model: vehicle.model,
            user_id: vehicle.user_id,
        };
        let updated = tables.hydrate(id, &row);
        tables.vehicles.insert(id, row);
        Ok(Some(updated))
    }

    async fn delete_vehicle(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.vehicles.remove(&id).is_some())
    }
}
