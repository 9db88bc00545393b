use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use super::records::{LookupRequest, MeasureRecord, RecordCategory};
use super::transport::QueueTransport;

/// A batch partitioned by category. Classification is total, so every
/// input record lands in exactly one bucket.
#[derive(Debug, Default)]
pub struct CategoryBuckets {
    pub recommendation: Vec<MeasureRecord>,
    pub direct_install: Vec<MeasureRecord>,
}

pub fn partition_records(records: Vec<MeasureRecord>) -> CategoryBuckets {
    let mut buckets = CategoryBuckets::default();
    for record in records {
        match RecordCategory::of(&record) {
            RecordCategory::Recommendation => buckets.recommendation.push(record),
            RecordCategory::DirectInstall => buckets.direct_install.push(record),
        }
    }
    buckets
}

/// Producer side of the pipeline: turns a record batch into one queued
/// lookup request per record.
pub struct RequestFanout {
    transport: Arc<dyn QueueTransport>,
    uiapi_url: String,
}

impl RequestFanout {
    /// `uiapi_url` is the object-info base the per-record picklist URLs are
    /// composed from, trailing slash included.
    pub fn new(transport: Arc<dyn QueueTransport>, uiapi_url: String) -> Self {
        Self {
            transport,
            uiapi_url,
        }
    }

    /// Fan a batch out onto the queue. Publishes nothing unless both
    /// categories are present in the batch. Returns the number of requests
    /// published. The first publish failure in a bucket abandons that
    /// bucket's remainder; requests already published stand.
    pub async fn enqueue_batch(
        &self,
        sobject: &str,
        records: Vec<MeasureRecord>,
        access_token: &str,
    ) -> Result<usize> {
        let buckets = partition_records(records);
        if buckets.recommendation.is_empty() || buckets.direct_install.is_empty() {
            info!(
                "Skipping fan-out for {sobject}: batch has {} recommendation and {} direct-install records",
                buckets.recommendation.len(),
                buckets.direct_install.len()
            );
            return Ok(0);
        }

        let mut published = 0;
        published += self
            .publish_bucket(
                RecordCategory::Recommendation,
                sobject,
                buckets.recommendation,
                access_token,
            )
            .await?;
        published += self
            .publish_bucket(
                RecordCategory::DirectInstall,
                sobject,
                buckets.direct_install,
                access_token,
            )
            .await?;

        info!("Queued {published} picklist lookups for {sobject}");
        Ok(published)
    }

    async fn publish_bucket(
        &self,
        category: RecordCategory,
        sobject: &str,
        records: Vec<MeasureRecord>,
        access_token: &str,
    ) -> Result<usize> {
        let mut published = 0;
        for record in records {
            let url = format!(
                "{}{}/picklist-values/{}/{}",
                self.uiapi_url,
                sobject,
                record.record_type_id,
                category.lookup_field()
            );
            let request = LookupRequest {
                method: "GET".to_string(),
                url,
                body: None,
                access_token: access_token.to_string(),
                record,
                record_type: category,
            };
            let payload = serde_json::to_vec(&request).context("serialize lookup request")?;
            self.transport
                .publish(&payload)
                .await
                .with_context(|| format!("publish {} lookup request", category.label()))?;
            published += 1;
        }
        Ok(published)
    }
}
