use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::{catalog, routes::respond, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/routes", get(list_routes))
        .route("/payment-methods", get(list_payment_methods))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn list_routes() -> impl IntoResponse {
    respond(StatusCode::OK, "routes", Some(catalog::list_routes()))
}

async fn list_payment_methods() -> impl IntoResponse {
    respond(
        StatusCode::OK,
        "payment methods",
        Some(catalog::payment_method_names()),
    )
}
