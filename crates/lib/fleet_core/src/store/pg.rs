//! PostgreSQL-backed store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use super::{StoreError, UserStore, VehicleStore};
use crate::models::auth::Role;
use crate::models::user::{NewUser, User, UserChanges, UserSummary};
use crate::models::vehicle::{NewVehicle, Vehicle};

type UserRow = (i64, String, String, String);
type VehicleRow = (i64, String, String, Option<i64>, Option<String>);

const SELECT_USER: &str = "SELECT id, username, password_hash, role FROM users";

const SELECT_VEHICLE: &str = "SELECT v.id, v.plate, v.model, u.id, u.username \
     FROM vehicles v LEFT JOIN users u ON u.id = v.user_id";

fn user_from_row((id, username, password_hash, role): UserRow) -> Result<User, StoreError> {
    let role = role
        .parse::<Role>()
        .map_err(|e| StoreError::Corrupt(format!("user {id}: {e}")))?;
    Ok(User {
        id,
        username,
        password_hash,
        role,
    })
}

fn vehicle_from_row((id, plate, model, owner_id, owner_name): VehicleRow) -> Vehicle {
    let owner = match (owner_id, owner_name) {
        (Some(id), Some(username)) => Some(UserSummary { id, username }),
        _ => None,
    };
    Vehicle {
        id,
        plate,
        model,
        owner,
    }
}

/// Map constraint violations onto domain errors.
fn classify(e: sqlx::Error, username: Option<&str>, owner: Option<i64>) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation()
            && let Some(name) = username
        {
            return StoreError::Duplicate(name.to_string());
        }
        if db.is_foreign_key_violation()
            && let Some(id) = owner
        {
            return StoreError::UnknownOwner(id);
        }
    }
    StoreError::Db(e)
}

/// Store over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool. The schema must already be migrated.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, run the embedded migrations from `fleet_core/migrations/`,
    /// and return a ready store.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Run all embedded database migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_vehicle(&self, id: i64) -> Result<Option<Vehicle>, StoreError> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!("{SELECT_VEHICLE} WHERE v.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(vehicle_from_row))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(user_from_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(user_from_row).collect()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) \
             RETURNING id, username, password_hash, role",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, Some(&user.username), None))?;
        user_from_row(row)
    }

    async fn update_user(
        &self,
        id: i64,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET \
               username = COALESCE($2, username), \
               password_hash = COALESCE($3, password_hash), \
               role = COALESCE($4, role) \
             WHERE id = $1 \
             RETURNING id, username, password_hash, role",
        )
        .bind(id)
        .bind(changes.username.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(changes.role.map(|r| r.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, changes.username.as_deref(), None))?;
        row.map(user_from_row).transpose()
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        // vehicles.user_id cascades on delete.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VehicleStore for PgStore {
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, StoreError> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!("{SELECT_VEHICLE} ORDER BY v.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(vehicle_from_row).collect())
    }

    async fn find_vehicle_by_id(&self, id: i64) -> Result<Option<Vehicle>, StoreError> {
        self.fetch_vehicle(id).await
    }

    async fn list_vehicles_by_user(&self, user_id: i64) -> Result<Vec<Vehicle>, StoreError> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "{SELECT_VEHICLE} WHERE v.user_id = $1 ORDER BY v.id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(vehicle_from_row).collect())
    }

    async fn create_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO vehicles (plate, model, user_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&vehicle.plate)
        .bind(&vehicle.model)
        .bind(vehicle.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, None, vehicle.user_id))?;
        self.fetch_vehicle(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("vehicle {id} vanished after insert")))
    }

    async fn update_vehicle(
        &self,
        id: i64,
        vehicle: NewVehicle,
    ) -> Result<Option<Vehicle>, StoreError> {
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE vehicles SET plate = $2, model = $3, user_id = $4 WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(&vehicle.plate)
        .bind(&vehicle.model)
        .bind(vehicle.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, None, vehicle.user_id))?;
        match updated {
            Some(id) => self.fetch_vehicle(id).await,
            None => Ok(None),
        }
    }

    async fn delete_vehicle(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
