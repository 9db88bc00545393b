use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use super::super::AppState;
use crate::core::records::ProgramPicks;
use crate::core::salesforce::bulk;

#[derive(serde::Deserialize)]
pub struct InsertMappedRequest {
    #[serde(default)]
    mapped_records: ProgramPicks,
}

/// Push mapped picklist records back into the platform through the UI API
/// batch endpoint.
pub async fn insert_mapped_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<InsertMappedRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if payload.mapped_records.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": "mapped_records is empty" })),
        );
    }

    match state
        .salesforce
        .insert_mapped_batch(&payload.mapped_records)
        .await
    {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "result": result })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": format!("{e:#}") })),
        ),
    }
}

#[derive(serde::Deserialize)]
pub struct BulkInsertRequest {
    target_sobject: String,
    #[serde(default)]
    records_to_insert: serde_json::Value,
}

/// Larger inserts go through the Bulk API: create a CSV job, upload the
/// rows, close the job so the platform starts processing.
pub async fn insert_bulk_mapped_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<BulkInsertRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let rows = match bulk::ingest_rows(&payload.target_sobject, &payload.records_to_insert) {
        Ok(rows) => rows,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "success": false, "error": format!("{e:#}") })),
            );
        }
    };
    if rows.len() <= 1 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": "records_to_insert is empty" })),
        );
    }

    let result = async {
        let job_id = state
            .salesforce
            .create_ingest_job(&payload.target_sobject)
            .await?;
        state.salesforce.upload_ingest_batch(&job_id, &rows).await?;
        state.salesforce.close_ingest_job(&job_id).await?;
        Ok::<String, anyhow::Error>(job_id)
    }
    .await;

    match result {
        Ok(job_id) => {
            info!(
                "Bulk insert job {job_id} submitted with {} rows",
                rows.len() - 1
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({ "success": true, "job_id": job_id })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": format!("{e:#}") })),
        ),
    }
}
