//! Liveness check. Not behind the gate.

use axum::Json;

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "status": "ok" }))
}
