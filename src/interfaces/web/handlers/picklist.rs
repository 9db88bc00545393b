use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use super::super::AppState;
use crate::core::records::MeasureRecord;

#[derive(serde::Deserialize)]
pub struct PicklistMappingRequest {
    sobject: String,
    #[serde(default)]
    records: Vec<MeasureRecord>,
}

/// Fan a measure batch out onto the lookup queue. The enriched results
/// appear later in the program aggregates; the response only reports how
/// many lookups were queued.
pub async fn query_picklist_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<PicklistMappingRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let sobject = payload.sobject.trim().to_string();
    if sobject.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": "sobject is required" })),
        );
    }

    let batch_size = payload.records.len();
    info!("Fanning out picklist lookups for {batch_size} {sobject} records");

    match state
        .fanout
        .enqueue_batch(&sobject, payload.records, state.salesforce.access_token())
        .await
    {
        Ok(queued) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "queued": queued })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": format!("{e:#}") })),
        ),
    }
}
