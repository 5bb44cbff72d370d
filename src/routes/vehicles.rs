use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::{
    auth::CurrentUser,
    error::AppError,
    routes::{json_body, respond},
    state::AppState,
    validation::{validate_vehicle, VehiclePayload},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register_vehicle))
        .route("/me", get(my_vehicle))
}

async fn register_vehicle(
    State(state): State<AppState>,
    current: CurrentUser,
    payload: Result<Json<VehiclePayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let vehicle = validate_vehicle(json_body(payload)?)?;
    state.profiles.register_vehicle(&user.id, &vehicle).await?;

    info!(user_id = %user.id, plate = %vehicle.plate, seats = vehicle.seats, "vehicle registered");
    Ok(respond(StatusCode::OK, "vehicle registered", Some(vehicle)))
}

async fn my_vehicle(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let profile = state
        .profiles
        .find(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    let vehicle = profile.vehicle.ok_or(AppError::NoVehicleRegistered)?;
    Ok(respond(StatusCode::OK, "vehicle", Some(vehicle)))
}
