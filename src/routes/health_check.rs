use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub const SERVICE_NAME: &str = "kao-notify-api";

pub async fn check_health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "ok": true, "service": SERVICE_NAME })),
    )
}
