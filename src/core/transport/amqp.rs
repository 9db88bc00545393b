use anyhow::{Context, Result};
use async_trait::async_trait;
use lapin::options::{BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio_stream::StreamExt;
use tracing::{info, warn};

use super::{MessageStream, PICKLIST_QUERY_QUEUE, QueueTransport};
use crate::config::AmqpConfig;

/// RabbitMQ-backed transport. The shared durable queue is declared on
/// connect so either side of the pipeline can start first.
pub struct AmqpTransport {
    channel: Channel,
    _connection: Connection,
}

impl AmqpTransport {
    pub async fn connect(config: &AmqpConfig) -> Result<Self> {
        let connection = Connection::connect(&config.address(), ConnectionProperties::default())
            .await
            .with_context(|| format!("connect to broker at {}:{}", config.host, config.port))?;
        let channel = connection.create_channel().await?;
        channel
            .queue_declare(
                PICKLIST_QUERY_QUEUE,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("declare picklist query queue")?;

        info!(
            "Connected to AMQP broker at {}:{}",
            config.host, config.port
        );
        Ok(Self {
            channel,
            _connection: connection,
        })
    }
}

#[async_trait]
impl QueueTransport for AmqpTransport {
    async fn publish(&self, payload: &[u8]) -> Result<()> {
        self.channel
            .basic_publish(
                "",
                PICKLIST_QUERY_QUEUE,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .context("publish lookup request")?
            .await
            .context("broker refused lookup request")?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<MessageStream> {
        let consumer = self
            .channel
            .basic_consume(
                PICKLIST_QUERY_QUEUE,
                "pickstream-worker",
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("attach consumer to picklist query queue")?;

        let stream = consumer.filter_map(|delivery| match delivery {
            Ok(d) => Some(d.data),
            Err(e) => {
                warn!("Dropping broken delivery from broker: {e}");
                None
            }
        });
        Ok(Box::pin(stream))
    }
}
