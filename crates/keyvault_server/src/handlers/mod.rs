//! HTTP request handlers.

/// Identity provider endpoints.
pub mod auth;
/// Paste document endpoints.
pub mod paste;

use axum::Json;
use serde_json::{json, Value};

/// Liveness check, also used by clients as a reconnect check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
