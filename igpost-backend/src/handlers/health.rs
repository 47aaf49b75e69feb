use axum::Json;
use serde_json::{json, Value};

/// GET /health
///
/// Liveness only: returns 200 whenever the process is alive, regardless of
/// session file state or credential presence.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
