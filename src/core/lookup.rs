use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::records::{LookupRequest, PicklistQueryResponse, PicklistValue};

/// Remote picklist metadata lookup. The worker only sees this trait, so
/// the consumer loop is testable without a CRM instance.
#[async_trait]
pub trait PicklistLookup: Send + Sync {
    async fn fetch(&self, request: &LookupRequest) -> Result<Vec<PicklistValue>>;
}

/// Performs the HTTP request described by a queued lookup against the live
/// metadata endpoint, using the bearer credential the message carries.
pub struct HttpPicklistClient {
    client: Client,
}

impl HttpPicklistClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build picklist http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PicklistLookup for HttpPicklistClient {
    async fn fetch(&self, request: &LookupRequest) -> Result<Vec<PicklistValue>> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| anyhow!("invalid http method in lookup request: {}", request.method))?;

        let mut req = self
            .client
            .request(method, &request.url)
            .header("Authorization", format!("Bearer {}", request.access_token));
        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let res = req.send().await.context("picklist lookup request failed")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("picklist lookup returned HTTP {status}: {body}"));
        }

        let parsed: PicklistQueryResponse =
            res.json().await.context("decode picklist lookup response")?;
        Ok(parsed.values)
    }
}
