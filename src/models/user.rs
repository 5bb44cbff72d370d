use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub plate: String,
    pub color: String,
    pub brand: String,
    pub model: String,
    pub seats: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub vehicle: Option<Vehicle>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub vehicle_plate: Option<String>,
    pub vehicle_color: Option<String>,
    pub vehicle_brand: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_seats: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        let vehicle = match (
            row.vehicle_plate,
            row.vehicle_color,
            row.vehicle_brand,
            row.vehicle_model,
            row.vehicle_seats,
        ) {
            (Some(plate), Some(color), Some(brand), Some(model), Some(seats)) => Some(Vehicle {
                plate,
                color,
                brand,
                model,
                seats,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            vehicle,
            created_at: row.created_at,
        }
    }
}
