//! Error types for Platter

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur in the controller and statistics core
#[derive(Debug, Error)]
pub enum PlatterError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid year: {0}")]
    InvalidYear(i32),

    #[error("Statistics store failed during {operation} ({target}): {source}")]
    Store {
        operation: &'static str,
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("A statistics refresh is already in progress")]
    RefreshInProgress,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatterError {
    pub(crate) fn store(operation: &'static str, target: impl ToString, source: StoreError) -> Self {
        PlatterError::Store {
            operation,
            target: target.to_string(),
            source,
        }
    }
}
