pub mod config;
pub mod error;
pub mod generator;
pub mod message;
pub mod pool;
pub mod publisher;
pub mod session;
pub mod topology;
pub mod traits;

pub use config::Config;
pub use error::{AmqpError, Result};
pub use generator::MockRequestGenerator;
pub use message::{
    ChangeBrightnessParameters, ImageOutput, RequestMessage, ResultError, ResultMessage, ResultStatus,
};
pub use pool::{create_pool, AmqpConnectionManager, AmqpPool};
pub use publisher::{publish_request, Publisher};
pub use session::Session;
pub use topology::{QueueBinding, Topology, TOOLS_EXCHANGE};
pub use traits::{AmqpPublisher, Closeable};

use std::future::Future;

/// Hands out the one broker session a run needs.
pub struct BrokerClient {
    pool: AmqpPool,
}

impl BrokerClient {
    /// No connection is made until [`BrokerClient::connect`].
    pub fn new(uri: String) -> Result<Self> {
        let pool = create_pool(uri, 1)?;
        Ok(Self { pool })
    }

    pub async fn connect(&self) -> Result<Session> {
        let connection = self.pool.get().await.map_err(pool::pool_error)?;
        Session::open(connection).await
    }
}

/// Connect, declare the topology, and publish mock requests until an error
/// or Ctrl-C. The connection is closed on every exit path.
pub async fn run(config: Config) -> Result<()> {
    tracing::info!("Connecting to RabbitMQ at {}:{}", config.host, config.port);

    let client = BrokerClient::new(config.amqp_uri())?;
    let session = client.connect().await?;
    tracing::info!("✓ Connected");

    let channel = session.channel().clone();
    let publisher = session.publisher(TOOLS_EXCHANGE);
    let work = async move {
        Topology::picturas().declare(&channel).await?;

        let mut generator = MockRequestGenerator::new(publisher, config.src_folder, config.out_folder);
        until_interrupted(generator.run(), tokio::signal::ctrl_c()).await
    };

    run_with(session, work).await
}

/// Await `work`, then close `session` exactly once whatever the outcome.
///
/// A failed close is logged and never replaces the error that ended `work`.
pub async fn run_with<S, W>(session: S, work: W) -> Result<()>
where
    S: Closeable,
    W: Future<Output = Result<()>>,
{
    let result = work.await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close connection: {}", e);
    }

    result
}

/// Drive `work` until it finishes or `shutdown` resolves.
pub async fn until_interrupted<W, S>(work: W, shutdown: S) -> Result<()>
where
    W: Future<Output = Result<()>>,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = work => result,
        signal = shutdown => {
            signal?;
            tracing::info!("🛑 Interrupted, shutting down");
            Err(AmqpError::Interrupted)
        }
    }
}
