use std::sync::Arc;

use chrono::{FixedOffset, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    error::AppError,
    models::trip::{NewTrip, Trip, TripFilter, DEFAULT_AFFINITY},
    services::{
        profiles::ProfileRepository,
        storage::{TripPatch, TripRepository},
    },
    validation::validate_trip,
};

/// The single authorization rule for mutating a trip.
pub fn ensure_owner(trip: &Trip, user_id: &str) -> Result<(), AppError> {
    if trip.is_owner(user_id) {
        Ok(())
    } else {
        warn!(trip_id = %trip.id, user_id, "trip mutation by non-owner refused");
        Err(AppError::Forbidden(
            "only the driver who published this trip may change it".into(),
        ))
    }
}

#[derive(Clone)]
pub struct TripService {
    trips: Arc<dyn TripRepository>,
    profiles: Arc<dyn ProfileRepository>,
    offset: FixedOffset,
}

impl TripService {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        profiles: Arc<dyn ProfileRepository>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            trips,
            profiles,
            offset,
        }
    }

    /// Wall-clock time in the zone trips are scheduled in.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }

    pub async fn create_trip(&self, driver_id: &str, payload: &Value) -> Result<Trip, AppError> {
        let mut details = validate_trip(payload, self.local_now())?;

        let profile = self
            .profiles
            .find(driver_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;
        let vehicle = profile.vehicle.ok_or(AppError::NoVehicleRegistered)?;

        if details.affinity.as_deref().map_or(true, str::is_empty) {
            details.affinity = Some(DEFAULT_AFFINITY.to_string());
        }
        details.description.get_or_insert_with(String::new);
        let route_tag = details.route_tag.clone();

        let new_trip = NewTrip {
            driver_id: driver_id.to_string(),
            driver_name: profile.name,
            vehicle,
            details,
            created_at: Utc::now(),
        };
        let id = self.trips.create(&new_trip).await?;

        let saved = self.trips.get(&id).await?;
        if saved.details.route_tag != route_tag {
            return Err(AppError::PersistenceInconsistency(format!(
                "trip {id} was stored without its route tag"
            )));
        }

        info!(
            trip_id = %id,
            driver_id,
            route_tag = %route_tag,
            status = %saved.status,
            seats = saved.capacity(),
            "trip created"
        );
        Ok(saved)
    }

    pub async fn list_trips(&self, filter: &TripFilter) -> Result<Vec<Trip>, AppError> {
        self.trips.list(filter).await
    }

    pub async fn get_trip(&self, id: &str) -> Result<Trip, AppError> {
        self.trips.get(id).await
    }

    pub async fn update_trip(
        &self,
        id: &str,
        driver_id: &str,
        payload: &Value,
    ) -> Result<Trip, AppError> {
        let trip = self.trips.get(id).await?;
        ensure_owner(&trip, driver_id)?;
        let details = validate_trip(payload, self.local_now())?;

        let mut patch = TripPatch::from(details);
        patch.updated_at = Some(Utc::now());
        self.trips.update(id, driver_id, &patch).await?;

        info!(trip_id = id, driver_id, "trip updated");
        self.trips.get(id).await
    }

    pub async fn delete_trip(&self, id: &str, driver_id: &str) -> Result<(), AppError> {
        let trip = self.trips.get(id).await?;
        ensure_owner(&trip, driver_id)?;
        self.trips.delete(id, driver_id).await?;

        info!(trip_id = id, driver_id, passengers = trip.passengers.len(), "trip deleted");
        Ok(())
    }
}
