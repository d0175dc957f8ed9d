//! Exchange and queue layout shared with the picturas tool workers.
//!
//! Declarations are idempotent on the broker: redeclaring an identical
//! entity is a no-op, while a redeclaration with different arguments is
//! refused with `406 PRECONDITION_FAILED` and surfaced as
//! [`AmqpError::TopologyConflict`].

use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, ExchangeKind,
};
use crate::error::{AmqpError, Result};

pub const TOOLS_EXCHANGE: &str = "picturas.tools";
pub const RESULTS_QUEUE: &str = "results";
pub const RESULTS_ROUTING_KEY: &str = "results";
pub const CHANGE_BRIGHTNESS_QUEUE: &str = "change-brightness-requests";
pub const CHANGE_BRIGHTNESS_ROUTING_KEY: &str = "requests.change-brightness";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub queue: String,
    pub routing_key: String,
}

impl QueueBinding {
    pub fn new(queue: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            routing_key: routing_key.into(),
        }
    }
}

/// One durable exchange and the durable queues bound to it.
#[derive(Debug, Clone)]
pub struct Topology {
    pub exchange: String,
    pub exchange_kind: ExchangeKind,
    pub bindings: Vec<QueueBinding>,
}

impl Topology {
    pub fn picturas() -> Self {
        Self {
            exchange: TOOLS_EXCHANGE.to_string(),
            exchange_kind: ExchangeKind::Direct,
            bindings: vec![
                QueueBinding::new(RESULTS_QUEUE, RESULTS_ROUTING_KEY),
                QueueBinding::new(CHANGE_BRIGHTNESS_QUEUE, CHANGE_BRIGHTNESS_ROUTING_KEY),
            ],
        }
    }

    /// Declare the exchange, every queue, and every binding on `channel`.
    pub async fn declare(&self, channel: &Channel) -> Result<()> {
        self.declare_exchange(channel).await?;

        for binding in &self.bindings {
            self.declare_queue(channel, &binding.queue).await?;
            self.bind_queue(channel, binding).await?;
        }

        Ok(())
    }

    async fn declare_exchange(&self, channel: &Channel) -> Result<()> {
        channel
            .exchange_declare(
                &self.exchange,
                self.exchange_kind.clone(),
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| conflict_or_connection(format!("exchange '{}'", self.exchange), e))?;

        tracing::info!("✓ Exchange '{}' declared ({:?})", self.exchange, self.exchange_kind);
        Ok(())
    }

    async fn declare_queue(&self, channel: &Channel, queue: &str) -> Result<()> {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| conflict_or_connection(format!("queue '{}'", queue), e))?;

        tracing::info!("✓ Queue '{}' declared", queue);
        Ok(())
    }

    async fn bind_queue(&self, channel: &Channel, binding: &QueueBinding) -> Result<()> {
        channel
            .queue_bind(
                &binding.queue,
                &self.exchange,
                &binding.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(AmqpError::ConnectionError)?;

        tracing::info!(
            "✓ Queue '{}' bound to '{}' with key '{}'",
            binding.queue,
            self.exchange,
            binding.routing_key
        );
        Ok(())
    }
}

fn conflict_or_connection(entity: String, error: lapin::Error) -> AmqpError {
    if AmqpError::is_precondition_failed(&error) {
        tracing::error!("Conflicting declaration of {}: {:?}", entity, error);
        AmqpError::TopologyConflict { entity, source: error }
    } else {
        AmqpError::ConnectionError(error)
    }
}
