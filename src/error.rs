//! Error taxonomy shared by the builder, compilers and execution layer.
//!
//! Nothing here is retried internally; retry policy belongs to whatever
//! owns the connection pool.

use std::time::Duration;

use crate::config::SettingsError;

/// Result type for polyql operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by driver and pool collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No resolvable dialect, unknown client name, or unusable settings.
    #[error("{0}")]
    Configuration(String),

    /// Caller supplied something the builder refuses to render
    /// (operator outside the whitelist, bad chunk size, binding count mismatch).
    #[error("{0}")]
    Validation(String),

    /// An undefined value reached a binding position.
    #[error("{0}")]
    Binding(String),

    /// The target dialect lacks the requested feature.
    #[error("{message}")]
    Capability {
        dialect: &'static str,
        message: String,
    },

    /// The driver or pool failed while running a statement.
    ///
    /// `message` carries the interpolated SQL followed by the driver message.
    #[error("{message}")]
    Execution {
        message: String,
        #[source]
        source: BoxError,
    },

    /// No connection could be acquired within the configured timeout.
    #[error("Timeout acquiring a connection. The pool is probably full. Are you missing a .transacting(trx) call?")]
    PoolTimeout(Duration),

    /// A statement ran longer than its compiled timeout.
    #[error("Defined query timeout of {}ms exceeded when running query.", .0.as_millis())]
    QueryTimeout(Duration),

    /// Settings file could not be read or parsed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a binding error.
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a capability error naming the dialect.
    pub fn capability(dialect: &'static str, message: impl Into<String>) -> Self {
        Self::Capability {
            dialect,
            message: message.into(),
        }
    }

    /// Whether this error came from a timeout (pool or query).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PoolTimeout(_) | Self::QueryTimeout(_))
    }
}
