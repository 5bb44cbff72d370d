use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{AppError, BookingConflict},
    services::storage::TripRepository,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub trip_id: String,
    pub passenger_id: String,
    pub available_seats: i64,
}

/// Seat accounting on trips. Passengers and the seat counter are only ever
/// changed here, through the repository's guarded single-statement updates.
#[derive(Clone)]
pub struct BookingEngine {
    trips: Arc<dyn TripRepository>,
}

impl BookingEngine {
    pub fn new(trips: Arc<dyn TripRepository>) -> Self {
        Self { trips }
    }

    pub async fn book(
        &self,
        trip_id: &str,
        user_id: &str,
    ) -> Result<BookingConfirmation, AppError> {
        let trip = self.trips.get(trip_id).await?;
        if trip.has_passenger(user_id) {
            debug!(trip_id, user_id, "booking refused: already aboard");
            return Err(BookingConflict::AlreadyBooked.into());
        }
        if trip.available_seats <= 0 {
            debug!(
                trip_id,
                user_id,
                capacity = trip.capacity(),
                "booking refused: trip is full"
            );
            return Err(BookingConflict::SeatsUnavailable.into());
        }

        // The snapshot above may be stale by now; the guarded update decides.
        match self.trips.reserve_seat(trip_id, user_id).await? {
            Some(available_seats) => {
                info!(trip_id, user_id, available_seats, "seat reserved");
                Ok(BookingConfirmation {
                    trip_id: trip_id.to_string(),
                    passenger_id: user_id.to_string(),
                    available_seats,
                })
            }
            None => Err(self.explain_reserve_refusal(trip_id, user_id).await),
        }
    }

    pub async fn cancel(
        &self,
        trip_id: &str,
        user_id: &str,
    ) -> Result<BookingConfirmation, AppError> {
        let trip = self.trips.get(trip_id).await?;
        if !trip.has_passenger(user_id) {
            return Err(BookingConflict::NotBooked.into());
        }

        match self.trips.release_seat(trip_id, user_id).await? {
            Some(available_seats) => {
                info!(trip_id, user_id, available_seats, "seat released");
                Ok(BookingConfirmation {
                    trip_id: trip_id.to_string(),
                    passenger_id: user_id.to_string(),
                    available_seats,
                })
            }
            None => match self.trips.get(trip_id).await {
                Ok(_) => Err(BookingConflict::NotBooked.into()),
                Err(err) => Err(err),
            },
        }
    }

    /// Re-reads the trip after a rejected reservation to name the reason.
    async fn explain_reserve_refusal(&self, trip_id: &str, user_id: &str) -> AppError {
        match self.trips.get(trip_id).await {
            Ok(trip) if trip.has_passenger(user_id) => BookingConflict::AlreadyBooked.into(),
            Ok(_) => {
                debug!(trip_id, user_id, "lost the race for the last seat");
                BookingConflict::SeatsUnavailable.into()
            }
            Err(err) => err,
        }
    }
}
