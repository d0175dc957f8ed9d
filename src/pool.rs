use deadpool::managed::{Manager, Metrics, Pool, PoolError, RecycleError, RecycleResult};
use lapin::{Connection, ConnectionProperties};
use crate::error::{AmqpError, Result};

/// Opens lapin connections on the current tokio runtime.
pub struct AmqpConnectionManager {
    uri: String,
}

impl AmqpConnectionManager {
    pub fn new(uri: String) -> Self {
        Self { uri }
    }
}

#[async_trait::async_trait]
impl Manager for AmqpConnectionManager {
    type Type = Connection;
    type Error = lapin::Error;

    async fn create(&self) -> std::result::Result<Self::Type, Self::Error> {
        let opts = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);

        Connection::connect(&self.uri, opts).await
    }

    async fn recycle(&self, conn: &mut Self::Type, _metrics: &Metrics) -> RecycleResult<Self::Error> {
        if conn.status().connected() {
            Ok(())
        } else {
            Err(RecycleError::StaticMessage("connection is no longer open"))
        }
    }
}

pub type AmqpPool = Pool<AmqpConnectionManager>;

/// Build a lazy pool; no connection is attempted until the first `get`.
pub fn create_pool(uri: String, max_size: usize) -> Result<AmqpPool> {
    let manager = AmqpConnectionManager::new(uri);
    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| AmqpError::PoolError(e.to_string()))
}

/// Keep broker failures distinguishable from pool bookkeeping failures.
pub(crate) fn pool_error(error: PoolError<lapin::Error>) -> AmqpError {
    match error {
        PoolError::Backend(e) => AmqpError::ConnectionError(e),
        other => AmqpError::PoolError(other.to_string()),
    }
}
