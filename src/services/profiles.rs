use async_trait::async_trait;
use chrono::Utc;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{Profile, ProfileRow, Vehicle},
};

/// User profiles, owned by the account side of the system. Trips only read
/// the name and the registered vehicle.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<Profile>, AppError>;

    async fn upsert(&self, user_id: &str, name: &str, email: Option<&str>) -> Result<(), AppError>;

    async fn register_vehicle(&self, user_id: &str, vehicle: &Vehicle) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SqliteProfileRepository {
    db: DbPool,
}

impl SqliteProfileRepository {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepository for SqliteProfileRepository {
    async fn find(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT id, name, email, vehicle_plate, vehicle_color, vehicle_brand,
                vehicle_model, vehicle_seats, created_at
            FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn upsert(&self, user_id: &str, name: &str, email: Option<&str>) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email",
        )
        .bind(user_id)
        .bind(name)
        .bind(email)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn register_vehicle(&self, user_id: &str, vehicle: &Vehicle) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET
                vehicle_plate = ?, vehicle_color = ?, vehicle_brand = ?,
                vehicle_model = ?, vehicle_seats = ?
            WHERE id = ?",
        )
        .bind(&vehicle.plate)
        .bind(&vehicle.color)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(vehicle.seats)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("user"));
        }
        Ok(())
    }
}
