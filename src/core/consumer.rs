use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{error, info};

use super::lookup::PicklistLookup;
use super::records::{EnrichedRecord, LookupRequest};
use super::store::PickStore;
use super::transport::QueueTransport;

/// Worker side of the pipeline: drains the queue and folds every looked-up
/// picklist value into the program aggregates. Messages are taken one at a
/// time; a failed message is logged and dropped, never retried.
pub struct PickWorker {
    transport: Arc<dyn QueueTransport>,
    lookup: Arc<dyn PicklistLookup>,
    store: Arc<PickStore>,
}

impl PickWorker {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        lookup: Arc<dyn PicklistLookup>,
        store: Arc<PickStore>,
    ) -> Self {
        Self {
            transport,
            lookup,
            store,
        }
    }

    /// Consume until the transport stream ends. Deliveries are acknowledged
    /// on receipt, so anything that fails mid-flight is lost rather than
    /// redelivered.
    pub async fn run(&self) -> Result<()> {
        let mut messages = self.transport.subscribe().await?;
        info!("Worker listening on the picklist query queue");
        while let Some(payload) = messages.next().await {
            if let Err(e) = self.process(&payload).await {
                error!("Dropping lookup request: {e:#}");
            }
        }
        info!("Queue stream ended, worker stopping");
        Ok(())
    }

    async fn process(&self, payload: &[u8]) -> Result<()> {
        let request: LookupRequest =
            serde_json::from_slice(payload).context("decode queued lookup request")?;
        let category = request.record_type;

        let values = self.lookup.fetch(&request).await.with_context(|| {
            format!(
                "lookup {} values for record {}",
                category.label(),
                request.record.id
            )
        })?;
        info!(
            "Fetched {} {} values for record {}",
            values.len(),
            category.label(),
            request.record.id
        );

        let program_name = &request.record.program.name;
        for value in values {
            let decoded = html_escape::decode_html_entities(&value.value).into_owned();
            let record = EnrichedRecord::from_value(
                category,
                program_name,
                &request.record.measure_name,
                decoded,
            );
            if let Err(e) = self.store.merge(program_name, record).await {
                error!(
                    "Failed to merge {} pick for program {program_name}: {e:#}",
                    category.label()
                );
            }
        }
        Ok(())
    }
}
