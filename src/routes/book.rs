use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Router,
};

use crate::{auth::CurrentUser, error::AppError, routes::respond, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/:trip_id", post(book_trip).delete(cancel_booking))
}

async fn book_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let confirmation = state.booking.book(&trip_id, &user.id).await?;
    Ok(respond(StatusCode::OK, "trip booked", Some(confirmation)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let confirmation = state.booking.cancel(&trip_id, &user.id).await?;
    Ok(respond(StatusCode::OK, "booking cancelled", Some(confirmation)))
}
