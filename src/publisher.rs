use lapin::{options::BasicPublishOptions, BasicProperties, Channel};
use serde::Serialize;
use crate::{
    error::{AmqpError, Result},
    message::RequestMessage,
    traits::AmqpPublisher,
};

/// Publishes onto one exchange through a channel it does not own.
pub struct Publisher {
    channel: Channel,
    exchange: String,
}

impl Publisher {
    pub fn new(channel: Channel, exchange: impl Into<String>) -> Self {
        Self {
            channel,
            exchange: exchange.into(),
        }
    }
}

#[async_trait::async_trait]
impl AmqpPublisher for Publisher {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<()> {
        // Fire-and-forget: the returned confirm is dropped unawaited.
        let _confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(AmqpError::ConnectionError)?;

        Ok(())
    }
}

/// Wrap `parameters` in a request envelope and publish it as JSON.
pub async fn publish_request<T, P>(
    publisher: &T,
    routing_key: &str,
    request_id: &str,
    procedure: &str,
    parameters: P,
) -> Result<()>
where
    T: AmqpPublisher + ?Sized,
    P: Serialize,
{
    if routing_key.is_empty() {
        return Err(AmqpError::ChannelError("routing key must not be empty".to_string()));
    }

    let message = RequestMessage::new(request_id, procedure, parameters);
    let payload = serde_json::to_vec(&message).map_err(AmqpError::SerializationError)?;

    publisher.publish(routing_key, &payload).await?;

    tracing::info!("Published request '{}' to '{}'", request_id, routing_key);
    Ok(())
}
