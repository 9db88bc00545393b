use axum::{Json, extract::State, http::StatusCode};

use super::super::AppState;

#[derive(serde::Deserialize)]
pub struct QueryRequest {
    query: String,
}

/// SOQL passthrough. The query arrives in the request body and goes out
/// url-encoded to the platform query endpoint.
pub async fn query_records_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let soql = payload.query.trim();
    if soql.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": "query is required" })),
        );
    }

    match state.salesforce.query(soql).await {
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
