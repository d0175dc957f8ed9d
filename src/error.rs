use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmqpError {
    #[error("Connection error: {0}")]
    ConnectionError(#[from] lapin::Error),

    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Topology conflict on {entity}: {source}")]
    TopologyConflict {
        entity: String,
        #[source]
        source: lapin::Error,
    },

    #[error("Cannot list source folder {}: {source}", path.display())]
    SourceFolderError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Interrupted")]
    Interrupted,
}

impl AmqpError {
    /// True when the broker refused a redeclaration with different arguments.
    pub fn is_precondition_failed(error: &lapin::Error) -> bool {
        match error {
            lapin::Error::ProtocolError(e) => {
                matches!(e.kind(), AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED))
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AmqpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::protocol::AMQPError;

    fn soft_error(kind: AMQPSoftError, message: &str) -> lapin::Error {
        lapin::Error::ProtocolError(AMQPError::new(AMQPErrorKind::Soft(kind), message.into()))
    }

    #[test]
    fn test_precondition_failed_is_detected() {
        let error = soft_error(
            AMQPSoftError::PRECONDITIONFAILED,
            "PRECONDITION_FAILED - inequivalent arg 'type' for exchange 'picturas.tools'",
        );
        assert!(AmqpError::is_precondition_failed(&error));
    }

    #[test]
    fn test_other_protocol_errors_are_not_conflicts() {
        let error = soft_error(AMQPSoftError::NOTFOUND, "NOT_FOUND - no exchange 'picturas.tools'");
        assert!(!AmqpError::is_precondition_failed(&error));
    }

    #[test]
    fn test_closed_channel_is_not_a_conflict() {
        let error = lapin::Error::InvalidChannelState(lapin::ChannelState::Closed);
        assert!(!AmqpError::is_precondition_failed(&error));
    }
}
