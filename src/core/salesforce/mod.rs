pub mod auth;
pub mod bulk;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SalesforceConfig;
use crate::core::records::ProgramPicks;

const API_VERSION: &str = "v58.0";
const INGEST_API_VERSION: &str = "v61.0";

/// Authenticated CRM client. Endpoint URLs are derived from the instance
/// URL once; the access token is acquired through the jwt-bearer flow at
/// startup and reused for the process lifetime.
pub struct SalesforceClient {
    client: Client,
    access_token: String,
    query_url: String,
    uiapi_url: String,
    uiapi_batch_url: String,
    ingest_url: String,
}

impl SalesforceClient {
    /// Build a client around an already-acquired token. `authenticate` is
    /// the production path; this constructor performs no network calls.
    pub fn new(instance_url: &str, access_token: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("pickstream/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("build salesforce http client")?;

        let instance = instance_url.trim_end_matches('/');
        Ok(Self {
            client,
            access_token,
            query_url: format!("{instance}/services/data/{API_VERSION}/query?q="),
            uiapi_url: format!("{instance}/services/data/{API_VERSION}/ui-api/object-info/"),
            uiapi_batch_url: format!("{instance}/services/data/{API_VERSION}/ui-api/records/batch"),
            ingest_url: format!("{instance}/services/data/{INGEST_API_VERSION}/jobs/ingest"),
        })
    }

    /// Acquire an access token with the jwt-bearer flow, then build the
    /// client against the configured instance.
    pub async fn authenticate(config: &SalesforceConfig) -> Result<Self> {
        let token = auth::fetch_access_token(config).await?;
        Self::new(&config.instance_url, token)
    }

    /// Bearer credential embedded into queued lookup requests.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Object-info base the fan-out composes picklist URLs from.
    pub fn uiapi_url(&self) -> &str {
        &self.uiapi_url
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Run a SOQL query and return the raw result page.
    pub async fn query(&self, soql: &str) -> Result<QueryResponse> {
        let url = format!("{}{}", self.query_url, urlencoding::encode(soql));
        let res = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .context("salesforce query request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("salesforce query returned HTTP {status}: {body}"));
        }
        res.json().await.context("decode salesforce query response")
    }

    /// Insert mapped picklist records through the UI API batch endpoint,
    /// one CREATE operation per non-empty category list.
    pub async fn insert_mapped_batch(&self, picks: &ProgramPicks) -> Result<serde_json::Value> {
        let payload = batch_insert_payload(picks)?;
        let res = self
            .client
            .post(&self.uiapi_batch_url)
            .header("Authorization", self.bearer())
            .json(&payload)
            .send()
            .await
            .context("ui api batch insert request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("ui api batch insert returned HTTP {status}: {body}"));
        }
        res.json().await.context("decode ui api batch response")
    }
}

/// One page of SOQL query results. Records pass through untyped.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(rename = "totalSize")]
    pub total_size: i64,
    pub done: bool,
    #[serde(default)]
    pub records: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct BatchInsert {
    #[serde(rename = "allOrNone")]
    all_or_none: bool,
    operations: Vec<BatchOperation>,
}

#[derive(Debug, Serialize)]
struct BatchOperation {
    #[serde(rename = "type")]
    op_type: String,
    records: Vec<BatchRecord>,
}

#[derive(Debug, Serialize)]
struct BatchRecord {
    #[serde(rename = "apiName")]
    api_name: String,
    fields: serde_json::Value,
}

impl BatchOperation {
    fn create(api_name: &str, fields: Vec<serde_json::Value>) -> Self {
        Self {
            op_type: "CREATE".to_string(),
            records: fields
                .into_iter()
                .map(|fields| BatchRecord {
                    api_name: api_name.to_string(),
                    fields,
                })
                .collect(),
        }
    }
}

fn batch_insert_payload(picks: &ProgramPicks) -> Result<BatchInsert> {
    let mut operations = Vec::new();
    if !picks.equipment_records.is_empty() {
        let fields = picks
            .equipment_records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        operations.push(BatchOperation::create("Measure_Equipment_Type__c", fields));
    }
    if !picks.recommendation_records.is_empty() {
        let fields = picks
            .recommendation_records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        operations.push(BatchOperation::create("Measure_Recommendation__c", fields));
    }
    if operations.is_empty() {
        return Err(anyhow!("no mapped records to insert"));
    }
    Ok(BatchInsert {
        all_or_none: false,
        operations,
    })
}
