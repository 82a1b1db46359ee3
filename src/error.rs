/// Unified error handling for the reparto routing layer.
///
/// Failures split into two classes: fatal configuration/contract errors,
/// after which the router can no longer guarantee it points at the right
/// shard or table, and recoverable operational errors that are handed back
/// to the caller untouched.
use thiserror::Error;

/// Errors produced by the external database client. The routing layer never
/// retries, wraps, or reinterprets them.
pub type ClientError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for routing operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Topology or configuration mistakes
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sharding key arity or type violation for the default selectors
    #[error("sharding key contract violation: {message}")]
    KeyContract { message: String },

    /// The database selector produced an index outside the shard list
    #[error("selected shard index {index} exceeds configured shard count {shard_count}")]
    ShardIndexOutOfRange { index: usize, shard_count: usize },

    /// The balancer was handed an empty replica list
    #[error("no replica available for read routing")]
    NoReplica,

    /// An operation was attempted on a node whose connection was never opened
    #[error("connection to {node} has not been opened")]
    NotOpen { node: String },

    /// Database client error, passed through verbatim
    #[error("{0}")]
    Client(ClientError),
}

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias for routing operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

impl ClusterError {
    /// Create a sharding key contract violation
    pub fn key_contract<S: Into<String>>(message: S) -> Self {
        ClusterError::KeyContract {
            message: message.into(),
        }
    }

    /// Fatal errors indicate a setup or usage mistake; continuing would risk
    /// routing to the wrong shard or table. Everything else is an ordinary
    /// operational failure the caller may retry or report.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClusterError::Config(_)
                | ClusterError::KeyContract { .. }
                | ClusterError::ShardIndexOutOfRange { .. }
                | ClusterError::NoReplica
        )
    }
}
