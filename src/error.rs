use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::validation::TripValidationError;

/// Business-rule refusals from the booking engine. None of them mutate the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookingConflict {
    #[error("user is already a passenger on this trip")]
    AlreadyBooked,
    #[error("no seats available on this trip")]
    SeatsUnavailable,
    #[error("user holds no seat on this trip")]
    NotBooked,
}

impl BookingConflict {
    pub fn reason(&self) -> &'static str {
        match self {
            BookingConflict::AlreadyBooked => "already_booked",
            BookingConflict::SeatsUnavailable => "seats_unavailable",
            BookingConflict::NotBooked => "not_booked",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error(transparent)]
    Validation(#[from] TripValidationError),
    #[error(transparent)]
    Booking(#[from] BookingConflict),
    #[error("{0} not found")]
    NotFound(String),
    #[error("the user has no registered vehicle")]
    NoVehicleRegistered,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("persisted state is inconsistent: {0}")]
    PersistenceInconsistency(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("request timed out")]
    Timeout,
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Booking(_)
            | AppError::NoVehicleRegistered
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migrate(_)
            | AppError::Other(_)
            | AppError::PersistenceInconsistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable body placed under `error` in the response envelope.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        let reason = match self {
            AppError::Validation(err) => {
                body.extend(err.details());
                err.reason()
            }
            AppError::Booking(conflict) => conflict.reason(),
            AppError::NoVehicleRegistered => "no_vehicle_registered",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::PersistenceInconsistency(_) => "persistence_inconsistency",
            AppError::Timeout => "request_timeout",
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migrate(_)
            | AppError::Other(_) => "internal",
        };
        body.insert("reason".into(), json!(reason));
        if self.status().is_server_error() {
            body.insert("detail".into(), json!(self.to_string()));
        }
        Value::Object(body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let message = match &self {
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migrate(_)
            | AppError::Other(_)
            | AppError::PersistenceInconsistency(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(json!({
                "success": false,
                "message": message,
                "error": self.body(),
            })),
        )
            .into_response()
    }
}
