use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::{
    catalog::PaymentMethod,
    db::DbPool,
    error::AppError,
    models::{
        trip::{hhmm, NewTrip, Trip, TripDetails, TripFilter, TripStatus},
        user::Vehicle,
    },
};

/// Field-wise merge applied by [`TripRepository::update`]; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TripPatch {
    pub trip_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub arrival_time: Option<NaiveTime>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub cost: Option<f64>,
    pub payment_methods: Option<Vec<PaymentMethod>>,
    pub route_tag: Option<String>,
    pub affinity: Option<String>,
    pub description: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<TripDetails> for TripPatch {
    fn from(details: TripDetails) -> Self {
        Self {
            trip_date: Some(details.trip_date),
            departure_time: Some(details.departure_time),
            arrival_time: Some(details.arrival_time),
            origin: Some(details.origin),
            destination: Some(details.destination),
            cost: Some(details.cost),
            payment_methods: Some(details.payment_methods),
            route_tag: Some(details.route_tag),
            affinity: details.affinity,
            description: details.description,
            updated_at: None,
        }
    }
}

/// Document-level access to trips. Every method is a single statement against
/// the store, so each one is atomic on its own.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Trip, AppError>;

    async fn create(&self, trip: &NewTrip) -> Result<String, AppError>;

    /// Merges `patch` into the trip if it is still owned by `driver_id`.
    async fn update(&self, id: &str, driver_id: &str, patch: &TripPatch) -> Result<(), AppError>;

    async fn delete(&self, id: &str, driver_id: &str) -> Result<(), AppError>;

    async fn list(&self, filter: &TripFilter) -> Result<Vec<Trip>, AppError>;

    /// Appends `user_id` to the passengers and takes one seat, only if a seat is
    /// free and the user is not already aboard. Returns the seats left, or
    /// `None` when the guard rejected the update.
    async fn reserve_seat(&self, id: &str, user_id: &str) -> Result<Option<i64>, AppError>;

    /// Inverse of [`TripRepository::reserve_seat`], guarded by membership.
    async fn release_seat(&self, id: &str, user_id: &str) -> Result<Option<i64>, AppError>;
}

#[derive(Clone)]
pub struct SqliteTripRepository {
    db: DbPool,
}

impl SqliteTripRepository {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct TripRow {
    id: String,
    driver_id: String,
    driver_name: String,
    vehicle_plate: String,
    vehicle_color: String,
    vehicle_brand: String,
    vehicle_model: String,
    vehicle_seats: i64,
    trip_date: NaiveDate,
    departure_time: String,
    arrival_time: String,
    origin: String,
    destination: String,
    cost: f64,
    payment_methods: Json<Vec<PaymentMethod>>,
    route_tag: String,
    affinity: String,
    description: String,
    status: String,
    passengers: Json<Vec<String>>,
    available_seats: i64,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TripRow> for Trip {
    type Error = AppError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, value: &str| {
            AppError::PersistenceInconsistency(format!(
                "trip {} has unreadable {field} {value:?}",
                row.id
            ))
        };
        let departure_time = NaiveTime::parse_from_str(&row.departure_time, hhmm::FORMAT)
            .map_err(|_| corrupt("departure_time", &row.departure_time))?;
        let arrival_time = NaiveTime::parse_from_str(&row.arrival_time, hhmm::FORMAT)
            .map_err(|_| corrupt("arrival_time", &row.arrival_time))?;
        let status = TripStatus::parse(&row.status).ok_or_else(|| corrupt("status", &row.status))?;

        Ok(Trip {
            id: row.id,
            driver_id: row.driver_id,
            driver_name: row.driver_name,
            driver_vehicle: Vehicle {
                plate: row.vehicle_plate,
                color: row.vehicle_color,
                brand: row.vehicle_brand,
                model: row.vehicle_model,
                seats: row.vehicle_seats,
            },
            details: TripDetails {
                trip_date: row.trip_date,
                departure_time,
                arrival_time,
                origin: row.origin,
                destination: row.destination,
                cost: row.cost,
                payment_methods: row.payment_methods.0,
                route_tag: row.route_tag,
                affinity: Some(row.affinity),
                description: Some(row.description),
            },
            status,
            passengers: row.passengers.0,
            available_seats: row.available_seats,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn format_time(time: NaiveTime) -> String {
    time.format(hhmm::FORMAT).to_string()
}

#[async_trait]
impl TripRepository for SqliteTripRepository {
    async fn get(&self, id: &str) -> Result<Trip, AppError> {
        let row: Option<TripRow> = sqlx::query_as("SELECT * FROM trips WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.ok_or_else(|| AppError::not_found("trip"))?.try_into()
    }

    async fn create(&self, trip: &NewTrip) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        let details = &trip.details;

        sqlx::query(
            "INSERT INTO trips (
                id, driver_id, driver_name,
                vehicle_plate, vehicle_color, vehicle_brand, vehicle_model, vehicle_seats,
                trip_date, departure_time, arrival_time, origin, destination, cost,
                payment_methods, route_tag, affinity, description,
                status, passengers, available_seats, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', ?, ?)",
        )
        .bind(&id)
        .bind(&trip.driver_id)
        .bind(&trip.driver_name)
        .bind(&trip.vehicle.plate)
        .bind(&trip.vehicle.color)
        .bind(&trip.vehicle.brand)
        .bind(&trip.vehicle.model)
        .bind(trip.vehicle.seats)
        .bind(details.trip_date)
        .bind(format_time(details.departure_time))
        .bind(format_time(details.arrival_time))
        .bind(&details.origin)
        .bind(&details.destination)
        .bind(details.cost)
        .bind(Json(&details.payment_methods))
        .bind(&details.route_tag)
        .bind(details.affinity.as_deref().unwrap_or_default())
        .bind(details.description.as_deref().unwrap_or_default())
        .bind(TripStatus::Scheduled.as_str())
        .bind(trip.vehicle.seats)
        .bind(trip.created_at)
        .execute(&self.db)
        .await?;

        Ok(id)
    }

    async fn update(&self, id: &str, driver_id: &str, patch: &TripPatch) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE trips SET
                trip_date = COALESCE(?, trip_date),
                departure_time = COALESCE(?, departure_time),
                arrival_time = COALESCE(?, arrival_time),
                origin = COALESCE(?, origin),
                destination = COALESCE(?, destination),
                cost = COALESCE(?, cost),
                payment_methods = COALESCE(?, payment_methods),
                route_tag = COALESCE(?, route_tag),
                affinity = COALESCE(?, affinity),
                description = COALESCE(?, description),
                updated_at = COALESCE(?, updated_at)
            WHERE id = ? AND driver_id = ?",
        )
        .bind(patch.trip_date)
        .bind(patch.departure_time.map(format_time))
        .bind(patch.arrival_time.map(format_time))
        .bind(&patch.origin)
        .bind(&patch.destination)
        .bind(patch.cost)
        .bind(patch.payment_methods.as_ref().map(Json))
        .bind(&patch.route_tag)
        .bind(&patch.affinity)
        .bind(&patch.description)
        .bind(patch.updated_at)
        .bind(id)
        .bind(driver_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("trip"));
        }
        Ok(())
    }

    async fn delete(&self, id: &str, driver_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM trips WHERE id = ? AND driver_id = ?")
            .bind(id)
            .bind(driver_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("trip"));
        }
        Ok(())
    }

    async fn list(&self, filter: &TripFilter) -> Result<Vec<Trip>, AppError> {
        let rows: Vec<TripRow> = sqlx::query_as(
            "SELECT * FROM trips
            WHERE (?1 IS NULL OR route_tag = ?1)
              AND (?2 IS NULL OR trip_date = ?2)
              AND (?3 IS NULL OR cost <= ?3)
            ORDER BY trip_date, departure_time, created_at",
        )
        .bind(&filter.route_tag)
        .bind(filter.date)
        .bind(filter.max_cost)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Trip::try_from).collect()
    }

    async fn reserve_seat(&self, id: &str, user_id: &str) -> Result<Option<i64>, AppError> {
        let seats = sqlx::query_scalar::<_, i64>(
            "UPDATE trips SET
                passengers = json_insert(passengers, '$[#]', ?1),
                available_seats = available_seats - 1
            WHERE id = ?2
              AND available_seats > 0
              AND NOT EXISTS (
                  SELECT 1 FROM json_each(trips.passengers) WHERE json_each.value = ?1
              )
            RETURNING available_seats",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(seats)
    }

    async fn release_seat(&self, id: &str, user_id: &str) -> Result<Option<i64>, AppError> {
        let seats = sqlx::query_scalar::<_, i64>(
            "UPDATE trips SET
                passengers = (
                    SELECT json_group_array(json_each.value)
                    FROM json_each(trips.passengers)
                    WHERE json_each.value <> ?1
                ),
                available_seats = available_seats + 1
            WHERE id = ?2
              AND EXISTS (
                  SELECT 1 FROM json_each(trips.passengers) WHERE json_each.value = ?1
              )
            RETURNING available_seats",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(seats)
    }
}
