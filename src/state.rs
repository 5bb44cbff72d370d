use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        booking::BookingEngine,
        lifecycle::TripService,
        profiles::{ProfileRepository, SqliteProfileRepository},
        storage::{SqliteTripRepository, TripRepository},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub profiles: Arc<dyn ProfileRepository>,
    pub trips: TripService,
    pub booking: BookingEngine,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let trip_repo: Arc<dyn TripRepository> = Arc::new(SqliteTripRepository::new(db.clone()));
        let profiles: Arc<dyn ProfileRepository> =
            Arc::new(SqliteProfileRepository::new(db.clone()));

        let trips = TripService::new(trip_repo.clone(), profiles.clone(), config.trip_offset);
        let booking = BookingEngine::new(trip_repo);

        Self {
            config,
            db,
            profiles,
            trips,
            booking,
        }
    }
}
