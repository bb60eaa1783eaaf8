//! Error types for the connection manager.
//!
//! Two layers: [`ConfigError`] for credential problems, always fatal under
//! either failure policy, and [`Error`] for everything the manager itself
//! can report. Connectivity errors (`CreatePool`, `Checkout`, `Redis`) are
//! absorbed into a disabled manager at connect time under
//! [`FailurePolicy::Lenient`]; the remaining variants always surface.
//!
//! [`FailurePolicy::Lenient`]: crate::FailurePolicy::Lenient

use deadpool_redis::{CreatePoolError, PoolError};
use redis::RedisError;
use tokio::task::JoinError;

/// Credential parsing and lookup failures.
///
/// These represent deployment mistakes and are never downgraded to a
/// warning, regardless of failure policy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The credentials environment variable is unset or blank.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// The delimited form had neither 3 nor 4 colon-separated fields.
    #[error("expected host:port:password or host:port:user:password, found {found} fields")]
    FieldCount {
        /// Number of fields the input split into.
        found: usize,
    },

    /// The port field is not a valid `u16`.
    #[error("invalid port {value:?}")]
    InvalidPort {
        /// The offending port field.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: std::num::ParseIntError,
    },

    /// A required field was present but empty.
    #[error("credential field {0:?} is empty")]
    EmptyField(&'static str),
}

/// Error type for manager construction and command execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credentials could not be parsed or looked up.
    #[error("invalid redis credentials: {0}")]
    Config(#[from] ConfigError),

    /// The connection pool could not be created from the credentials.
    #[error("failed to create connection pool: {0}")]
    CreatePool(#[from] CreatePoolError),

    /// A pooled connection could not be checked out.
    #[error("failed to check out pooled connection: {0}")]
    Checkout(#[from] PoolError),

    /// The underlying client reported a command or protocol error.
    #[error("redis command failed: {0}")]
    Redis(#[from] RedisError),

    /// A manager is already installed in the process-wide slot.
    #[error("redis manager is already installed")]
    AlreadyInstalled,

    /// No manager has been installed in the process-wide slot yet.
    #[error("redis manager is not installed")]
    NotInstalled,

    /// A submitted command task panicked or was aborted by the runtime.
    #[error("submitted command task failed: {0}")]
    Join(#[from] JoinError),
}
