use deadpool::managed::Object;
use lapin::Channel;
use crate::{
    error::{AmqpError, Result},
    pool::AmqpConnectionManager,
    publisher::Publisher,
    topology::Topology,
    traits::Closeable,
};

/// The single connection/channel pair used for a whole run.
///
/// The channel is never re-created: once the broker drops it, every later
/// publish fails.
pub struct Session {
    connection: Object<AmqpConnectionManager>,
    channel: Channel,
}

impl Session {
    pub(crate) async fn open(connection: Object<AmqpConnectionManager>) -> Result<Self> {
        let channel = connection
            .create_channel()
            .await
            .map_err(AmqpError::ConnectionError)?;

        Ok(Self { connection, channel })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn is_connected(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    pub async fn setup_topology(&self, topology: &Topology) -> Result<()> {
        topology.declare(&self.channel).await
    }

    pub fn publisher(&self, exchange: impl Into<String>) -> Publisher {
        Publisher::new(self.channel.clone(), exchange)
    }

    /// Close the connection if it is still open. Consumes the session, so
    /// it runs at most once.
    pub async fn close(self) -> Result<()> {
        let connection = Object::take(self.connection);

        if !connection.status().connected() {
            tracing::debug!("Connection already closed");
            return Ok(());
        }

        connection
            .close(200, "mock publisher shutting down")
            .await
            .map_err(AmqpError::ConnectionError)?;

        tracing::info!("Connection closed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Closeable for Session {
    async fn close(self) -> Result<()> {
        Session::close(self).await
    }
}
