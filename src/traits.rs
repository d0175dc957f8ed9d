use async_trait::async_trait;
use crate::error::Result;

/// Sends a raw payload to the publisher's exchange.
#[async_trait]
pub trait AmqpPublisher: Send + Sync {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<()>;
}

/// A broker session that is released once, when the run ends.
#[async_trait]
pub trait Closeable: Send + Sized {
    async fn close(self) -> Result<()>;
}
