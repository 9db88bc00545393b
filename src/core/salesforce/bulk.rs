use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;

use super::SalesforceClient;
use crate::core::records::{EquipmentRecord, RecommendationRecord};

#[derive(Debug, Deserialize)]
struct IngestJob {
    id: String,
}

/// Bulk API v2 ingest: create a CSV job, upload the batch, then mark the
/// upload complete so the platform processes it.
impl SalesforceClient {
    pub async fn create_ingest_job(&self, sobject: &str) -> Result<String> {
        let payload = json!({
            "object": sobject,
            "operation": "insert",
            "contentType": "CSV",
        });
        let res = self
            .client
            .post(&self.ingest_url)
            .header("Authorization", self.bearer())
            .json(&payload)
            .send()
            .await
            .context("create ingest job request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("create ingest job returned HTTP {status}: {body}"));
        }

        let job: IngestJob = res.json().await.context("decode ingest job response")?;
        Ok(job.id)
    }

    pub async fn upload_ingest_batch(&self, job_id: &str, rows: &[Vec<String>]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.write_record(row).context("encode csv row")?;
        }
        let body = writer.into_inner().context("flush csv batch")?;

        let url = format!("{}/{}/batches", self.ingest_url, job_id);
        let res = self
            .client
            .put(&url)
            .header("Authorization", self.bearer())
            .header("Content-Type", "text/csv")
            .body(body)
            .send()
            .await
            .context("upload ingest batch request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("upload ingest batch returned HTTP {status}: {body}"));
        }
        Ok(())
    }

    pub async fn close_ingest_job(&self, job_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.ingest_url, job_id);
        let res = self
            .client
            .patch(&url)
            .header("Authorization", self.bearer())
            .json(&json!({ "state": "UploadComplete" }))
            .send()
            .await
            .context("close ingest job request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("close ingest job returned HTTP {status}: {body}"));
        }
        Ok(())
    }
}

/// Lay mapped records out as CSV rows, header first, for a bulk insert
/// against the given target object.
pub fn ingest_rows(target_sobject: &str, records: &serde_json::Value) -> Result<Vec<Vec<String>>> {
    match target_sobject {
        "Measure_Recommendation__c" => {
            let records: Vec<RecommendationRecord> = serde_json::from_value(records.clone())
                .context("records_to_insert must be recommendation records")?;
            let mut rows = vec![header("Recommendation__c")];
            for r in records {
                rows.push(vec![r.program_name, r.measure_description, r.recommendation]);
            }
            Ok(rows)
        }
        "Measure_Equipment_Type__c" => {
            let records: Vec<EquipmentRecord> = serde_json::from_value(records.clone())
                .context("records_to_insert must be equipment records")?;
            let mut rows = vec![header("Equipment_Type__c")];
            for r in records {
                rows.push(vec![r.program_name, r.measure_description, r.equipment_type]);
            }
            Ok(rows)
        }
        other => Err(anyhow!("unsupported bulk insert target {other}")),
    }
}

fn header(value_field: &str) -> Vec<String> {
    vec![
        "Program_Name__c".to_string(),
        "Measure_Description__c".to_string(),
        value_field.to_string(),
    ]
}
