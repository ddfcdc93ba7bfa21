//! Demo routes exercising the limiter policies.
//!
//! Stand-ins for the application routes a deployment would protect; the
//! limiter neither knows nor cares what runs behind it.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn index() -> &'static str {
    "floodgate"
}

/// No authentication backend is wired into this binary, so every attempt
/// fails. Failed responses are exactly what the login policy counts.
pub async fn login() -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "invalid_credentials",
            "message": "Authentication is not configured.",
        })),
    )
}
