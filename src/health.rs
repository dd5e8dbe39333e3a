use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Portfolio Builder API",
        "status": "running",
    }))
}

pub async fn check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
