pub mod amqp;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// The one queue shared by every record category.
pub const PICKLIST_QUERY_QUEUE: &str = "picklistquery.created";

pub type MessageStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Durable queue between the API process and the workers. Delivery is
/// at-least-once; subscribers consume with automatic acknowledgment, so a
/// delivered message counts as handled whether or not processing succeeds.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Publish one serialized lookup request onto the shared queue.
    async fn publish(&self, payload: &[u8]) -> Result<()>;

    /// Attach to the queue and stream message payloads until the
    /// connection closes.
    async fn subscribe(&self) -> Result<MessageStream>;
}
