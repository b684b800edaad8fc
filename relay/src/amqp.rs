use crate::errors::PublishError;
use crate::fanout::Publisher;
use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

/// AMQP-backed publish capability.
///
/// One connection and one channel per process, opened at startup and shared
/// by every request. Publishes go to the default exchange, so the routing
/// key addresses a queue directly.
pub struct AmqpPublisher {
    connection: Connection,
    channel: Channel,
}

impl AmqpPublisher {
    pub async fn connect(url: &str) -> Result<Self, lapin::Error> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        tracing::info!("broker connection established");
        Ok(Self { connection, channel })
    }

    pub async fn close(&self) {
        if let Err(error) = self.connection.close(200, "shutting down").await {
            tracing::warn!(error = %error, "error while closing broker connection");
        }
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), PublishError> {
        self.channel
            .basic_publish(
                "",
                routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default(),
            )
            .await?
            .await?;
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), PublishError> {
        if self.connection.status().connected() && self.channel.status().connected() {
            Ok(())
        } else {
            Err(PublishError::Unavailable("broker connection lost".to_string()))
        }
    }
}
