use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::{
    auth::CurrentUser,
    error::AppError,
    routes::{json_body, query_params, respond},
    state::AppState,
    validation::{validate_search, TripSearchParams},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/:id", get(get_trip).put(update_trip).delete(delete_trip))
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let payload = json_body(payload)?;
    let trip = state.trips.create_trip(&user.id, &payload).await?;
    Ok(respond(StatusCode::CREATED, "trip created", Some(trip)))
}

async fn list_trips(
    State(state): State<AppState>,
    params: Result<Query<TripSearchParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let filter = validate_search(&query_params(params)?)?;
    let trips = state.trips.list_trips(&filter).await?;
    Ok(respond(StatusCode::OK, "trips", Some(trips)))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Response, AppError> {
    let trip = state.trips.get_trip(&trip_id).await?;
    Ok(respond(StatusCode::OK, "trip", Some(trip)))
}

async fn update_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let payload = json_body(payload)?;
    let trip = state.trips.update_trip(&trip_id, &user.id, &payload).await?;
    Ok(respond(StatusCode::OK, "trip updated", Some(trip)))
}

async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    state.trips.delete_trip(&trip_id, &user.id).await?;
    Ok(respond::<()>(StatusCode::OK, "trip deleted", None))
}
