use anyhow::{Result, anyhow};
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{MessageStream, QueueTransport};
use async_trait::async_trait;

/// In-process stand-in for the broker with the same auto-ack contract.
/// Every published payload is retained for inspection.
pub struct MemoryTransport {
    sender: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    published: Mutex<Vec<Vec<u8>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every payload published so far, in order.
    pub async fn published(&self) -> Vec<Vec<u8>> {
        self.published.lock().await.clone()
    }

    /// Close the queue. Buffered messages still drain, then the subscriber
    /// stream ends.
    pub async fn close(&self) {
        self.sender.lock().await.take();
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueTransport for MemoryTransport {
    async fn publish(&self, payload: &[u8]) -> Result<()> {
        let guard = self.sender.lock().await;
        let sender = guard.as_ref().ok_or_else(|| anyhow!("queue is closed"))?;
        sender
            .send(payload.to_vec())
            .map_err(|_| anyhow!("queue subscriber dropped"))?;
        drop(guard);

        self.published.lock().await.push(payload.to_vec());
        Ok(())
    }

    async fn subscribe(&self) -> Result<MessageStream> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("queue already has a subscriber"))?;
        Ok(Box::pin(UnboundedReceiverStream::new(receiver)))
    }
}
