use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::{insert, picklist, query};

fn build_localhost_cors(port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_api_router(state: AppState, port: u16) -> Router {
    Router::new()
        .route("/api/queryrecords", get(query::query_records_endpoint))
        .route("/api/querypicklist", get(picklist::query_picklist_endpoint))
        .route(
            "/api/insertmappedrecords",
            post(insert::insert_mapped_endpoint),
        )
        .route(
            "/api/insertbulkmappedrecords",
            post(insert::insert_bulk_mapped_endpoint),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(build_localhost_cors(port))
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fanout::RequestFanout;
    use crate::core::salesforce::SalesforceClient;
    use crate::core::transport::memory::MemoryTransport;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn test_state() -> (AppState, Arc<MemoryTransport>) {
        let salesforce = Arc::new(
            SalesforceClient::new("https://example.my.salesforce.com", "00D-token".to_string())
                .expect("client builds"),
        );
        let transport = Arc::new(MemoryTransport::new());
        let fanout = Arc::new(RequestFanout::new(
            transport.clone(),
            salesforce.uiapi_url().to_string(),
        ));
        (AppState { salesforce, fanout }, transport)
    }

    async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));
        (status, json)
    }

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let (state, _) = test_state();
        let app = build_api_router(state, 9090);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/insertmappedrecords")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn querypicklist_fans_out_a_mixed_batch() {
        let (state, transport) = test_state();
        let app = build_api_router(state, 9090);

        let body = serde_json::json!({
            "sobject": "Custom_Measure__c",
            "records": [
                {
                    "Id": "a0X1",
                    "Measure_Name_New__c": "HVAC Recommendation",
                    "Record_Type_Id__c": "012REC",
                    "Program__r": { "Name": "Alpha" }
                },
                {
                    "Id": "a0X2",
                    "Measure_Name_New__c": "Duct Sealing",
                    "Record_Type_Id__c": "012DIR",
                    "Program__r": { "Name": "Alpha" }
                }
            ]
        });
        let (status, json) = json_request(app, Method::GET, "/api/querypicklist", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["queued"], 2);
        assert_eq!(transport.published().await.len(), 2);
    }

    #[tokio::test]
    async fn querypicklist_skips_a_single_category_batch() {
        let (state, transport) = test_state();
        let app = build_api_router(state, 9090);

        let body = serde_json::json!({
            "sobject": "Custom_Measure__c",
            "records": [
                {
                    "Id": "a0X2",
                    "Measure_Name_New__c": "Duct Sealing",
                    "Record_Type_Id__c": "012DIR",
                    "Program__r": { "Name": "Alpha" }
                }
            ]
        });
        let (status, json) = json_request(app, Method::GET, "/api/querypicklist", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["queued"], 0);
        assert!(transport.published().await.is_empty());
    }

    #[tokio::test]
    async fn querypicklist_requires_an_sobject() {
        let (state, _) = test_state();
        let app = build_api_router(state, 9090);

        let body = serde_json::json!({ "sobject": "", "records": [] });
        let (status, json) = json_request(app, Method::GET, "/api/querypicklist", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn queryrecords_requires_a_query() {
        let (state, _) = test_state();
        let app = build_api_router(state, 9090);

        let body = serde_json::json!({ "query": "  " });
        let (status, json) = json_request(app, Method::GET, "/api/queryrecords", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn insertmapped_rejects_an_empty_payload() {
        let (state, _) = test_state();
        let app = build_api_router(state, 9090);

        let body = serde_json::json!({ "mapped_records": {} });
        let (status, json) =
            json_request(app, Method::POST, "/api/insertmappedrecords", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn insertbulk_rejects_an_unknown_target() {
        let (state, _) = test_state();
        let app = build_api_router(state, 9090);

        let body = serde_json::json!({
            "target_sobject": "Account",
            "records_to_insert": []
        });
        let (status, json) =
            json_request(app, Method::POST, "/api/insertbulkmappedrecords", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("unsupported bulk insert target")
        );
    }

    #[tokio::test]
    async fn insertbulk_rejects_an_empty_batch() {
        let (state, _) = test_state();
        let app = build_api_router(state, 9090);

        let body = serde_json::json!({
            "target_sobject": "Measure_Recommendation__c",
            "records_to_insert": []
        });
        let (status, json) =
            json_request(app, Method::POST, "/api/insertbulkmappedrecords", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn api_route_contract_has_all_expected_paths() {
        let paths = [
            "/api/queryrecords",
            "/api/querypicklist",
            "/api/insertmappedrecords",
            "/api/insertbulkmappedrecords",
        ];

        let (state, _) = test_state();
        let app = build_api_router(state, 9090);
        for path in paths {
            let req = Request::builder()
                .method(Method::PUT)
                .uri(path)
                .body(Body::empty())
                .expect("request should build");
            let resp = app
                .clone()
                .oneshot(req)
                .await
                .expect("router oneshot should succeed");
            assert_ne!(
                resp.status(),
                StatusCode::NOT_FOUND,
                "Route missing from router: {}",
                path
            );
        }
    }
}
