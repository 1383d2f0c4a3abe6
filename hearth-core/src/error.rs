/// Structured error types for hearth-core.
///
/// Library callers get composable `thiserror` enums; the `hearth` binary
/// wraps them in `anyhow` for reporting.
use std::time::Duration;

use thiserror::Error;

use crate::models::ValidationError;

/// Why a single acquisition attempt failed.
#[derive(Error, Debug)]
pub enum AcquireFailure {
    /// The attempt lost the race against its timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The driver reported an error while connecting
    #[error("{0}")]
    Driver(#[source] sqlx::Error),
}

/// Every acquisition attempt was used up.
#[derive(Error, Debug)]
#[error("failed to acquire database connection after {attempts} attempts: {cause}")]
pub struct ConnectionError {
    pub attempts: u32,
    #[source]
    pub cause: AcquireFailure,
}

/// Malformed configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for {key}: '{value}' ({reason})")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Main error type for repository operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// No connection could be acquired
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A statement inside a transaction failed; the transaction was rolled back
    #[error("transaction '{operation}' rolled back: {source}")]
    Transaction {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Caller input rejected before reaching the database
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Target row does not exist
    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// Child collections of one listed property could not be loaded
    #[error("failed to load children of property {property_id}: {source}")]
    PartialFetch {
        property_id: uuid::Uuid,
        #[source]
        source: sqlx::Error,
    },

    /// A standalone statement failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Cached payload could not be encoded or decoded
    #[error("cache payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for repository operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create a not found error
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Create a transaction error
    pub fn transaction(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Transaction { operation, source }
    }

    /// Re-tag a failure that happened inside `operation`'s transaction.
    ///
    /// Deterministic errors (validation, not found) pass through untouched.
    pub fn within(self, operation: &'static str) -> Self {
        match self {
            Self::Database(source) => Self::Transaction { operation, source },
            other => other,
        }
    }

    /// True for failures caused by database reachability or statement errors
    /// rather than by the caller's input.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Transaction { .. }
                | Self::Database(_)
                | Self::PartialFetch { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl ConfigError {
    pub fn new(key: &'static str, value: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            key,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
