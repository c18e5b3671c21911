use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::json;
use tracing::error;

use crate::server::AppState;

/// Health check endpoint handler.
///
/// Served at both `/` and `/health` so load balancers and uptime monitors
/// can verify the worker is alive without knowing its route layout. Probes
/// store connectivity; a failing probe reports 503 with `status: degraded`.
///
/// # Response Format
/// ```json
/// {"status": "ok", "service": "league-worker", "version": "v1"}
/// ```
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let status = match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            error!("Health check failed: {:#}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };

    (
        status.0,
        Json(json!({
            "status": status.1,
            "service": state.service,
            "version": state.version,
        })),
    )
}
