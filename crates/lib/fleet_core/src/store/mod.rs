//! Storage collaborators for users and vehicles.
//!
//! The HTTP layer and the access decision engine only see these traits.
//! [`MemoryStore`] backs tests and database-less runs; [`PgStore`] is the
//! PostgreSQL implementation.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::OwnerLookup;
use crate::models::user::{NewUser, User, UserChanges};
use crate::models::vehicle::{NewVehicle, Vehicle};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Username already taken: {0}")]
    Duplicate(String),

    #[error("Unknown owner: {0}")]
    UnknownOwner(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// All users ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Apply `changes` to user `id`. `None` when the user does not exist.
    async fn update_user(&self, id: i64, changes: UserChanges)
    -> Result<Option<User>, StoreError>;

    /// Delete user `id` and the vehicles they own. `false` when absent.
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError>;
}

/// Vehicle persistence.
#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// All vehicles ordered by id.
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError>;

    async fn find_vehicle_by_id(&self, id: i64) -> Result<Option<Vehicle>, StoreError>;

    async fn list_vehicles_by_user(&self, user_id: i64) -> Result<Vec<Vehicle>, StoreError>;

    async fn create_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError>;

    /// Replace vehicle `id`. `None` when the vehicle does not exist.
    async fn update_vehicle(
        &self,
        id: i64,
        vehicle: NewVehicle,
    ) -> Result<Option<Vehicle>, StoreError>;

    async fn delete_vehicle(&self, id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
impl<T: UserStore + ?Sized> OwnerLookup for T {
    async fn username_for_id(&self, id: i64) -> Result<Option<String>, StoreError> {
        Ok(self.find_user_by_id(id).await?.map(|user| user.username))
    }
}
