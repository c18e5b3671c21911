//! Trade analysis lookup endpoints
//!
//! Read-only API consumed by the fan site: one endpoint for a single
//! transaction id and one batched endpoint. A missing analysis is a 404 with
//! a friendly message on the single endpoint, and an explicit null in the
//! batched response, so the client can tell "checked, absent" from "not yet
//! checked".

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::server::AppState;

/// Upper bound on ids per batched request.
const MAX_BATCH_IDS: usize = 100;

/// Shown while the discovery job has not analyzed a trade yet.
const PENDING_MESSAGE: &str = "Mike & Jim are in the film room... Check back soon!";

type ApiResponse = (StatusCode, Json<Value>);

fn bad_request(message: &str) -> ApiResponse {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn internal_error() -> ApiResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
}

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    transaction_id: Option<String>,
}

/// Handle `GET /api/trade-analysis?transaction_id=...`
pub async fn get_analysis(
    State(state): State<AppState>,
    Query(query): Query<AnalysisQuery>,
) -> ApiResponse {
    let Some(transaction_id) = query
        .transaction_id
        .filter(|id| !id.trim().is_empty())
    else {
        return bad_request("transaction_id parameter is required");
    };

    match state.store.get(&transaction_id).await {
        Ok(Some(analysis)) => match serde_json::to_value(&analysis) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => {
                error!("Failed to serialize analysis {}: {}", transaction_id, e);
                internal_error()
            }
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Analysis not found",
                "message": PENDING_MESSAGE,
            })),
        ),
        Err(e) => {
            error!("Error fetching analysis {}: {:#}", transaction_id, e);
            internal_error()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    ids: Option<String>,
}

/// Handle `GET /api/trade-analyses?ids=id1,id2,id3`
pub async fn get_batch_analyses(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
) -> ApiResponse {
    let Some(ids_param) = query.ids else {
        return bad_request("ids parameter is required");
    };

    let ids: Vec<String> = ids_param
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return bad_request("At least one transaction ID is required");
    }
    if ids.len() > MAX_BATCH_IDS {
        return bad_request("Maximum 100 IDs allowed per request");
    }

    match state.store.get_batch(&ids).await {
        Ok(results) => {
            let mut body = serde_json::Map::new();
            for (id, analysis) in results {
                let value = match analysis {
                    Some(analysis) => match serde_json::to_value(&analysis) {
                        Ok(value) => value,
                        Err(e) => {
                            error!("Failed to serialize analysis {}: {}", id, e);
                            return internal_error();
                        }
                    },
                    None => Value::Null,
                };
                body.insert(id, value);
            }
            (StatusCode::OK, Json(Value::Object(body)))
        }
        Err(e) => {
            error!("Error fetching batch analyses: {:#}", e);
            internal_error()
        }
    }
}

/// JSON 404 for unknown paths.
pub async fn not_found() -> ApiResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// JSON 405 for known paths hit with the wrong method.
pub async fn method_not_allowed() -> ApiResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}
