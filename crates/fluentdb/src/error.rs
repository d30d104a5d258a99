//! Error types for fluentdb

use std::time::Duration;
use thiserror::Error;

/// Result type alias for fluentdb operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Connection could not be opened, pinged or kept alive
    #[error("Connection error: {0}")]
    Connection(String),

    /// COMMIT/ROLLBACK requested with no transaction running
    #[error("Transaction state error: {0}")]
    TransactionState(String),

    /// The accumulated query state could not be rendered into SQL
    #[error("Render error: {0}")]
    Render(String),

    /// Error reported by the database driver, passed through unchanged
    #[cfg(feature = "mysql")]
    #[error("Driver error: {0}")]
    Driver(#[from] sqlx::Error),

    /// Error reported by a non-sqlx driver implementation
    #[error("Driver error: {0}")]
    Backend(String),

    /// A result value could not be turned into text or parsed
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Operation exceeded the configured deadline
    #[error("Operation timeout after {0:?}")]
    Timeout(Duration),
}

impl DbError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a driver error for drivers that do not speak `sqlx::Error`
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub(crate) fn no_transaction() -> Self {
        Self::TransactionState("no transaction running".to_string())
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a transaction state error
    pub fn is_transaction_state(&self) -> bool {
        matches!(self, Self::TransactionState(_))
    }

    /// Check if this is a render error
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the driver rejected the statement (syntax, constraint, ...)
    pub fn is_driver(&self) -> bool {
        match self {
            #[cfg(feature = "mysql")]
            Self::Driver(_) => true,
            Self::Backend(_) => true,
            _ => false,
        }
    }
}
