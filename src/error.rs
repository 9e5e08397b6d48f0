//! Error types for storefront-experiments
//!
//! Nothing in this crate is fatal to the page: the engine, recorder and click
//! interceptor turn these errors into log lines. Lower layers (storage,
//! selectors, catalog loading) report them through [`Result`].

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// storefront-experiments error types
#[derive(Error, Debug)]
pub enum Error {
    /// Durable storage unavailable, denied or full
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Persisted or configured JSON could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Selector outside the supported subset (or malformed)
    #[error("Unsupported selector: {0}")]
    UnsupportedSelector(String),

    /// Experiment definition rejected at catalog load
    #[error("Invalid experiment '{experiment_id}': {reason}")]
    InvalidExperiment {
        /// Offending experiment ID
        experiment_id: String,
        /// What was wrong with it
        reason: String,
    },

    /// DOM operation failed in the host document
    #[error("DOM error: {0}")]
    Dom(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_experiment(
        experiment_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidExperiment {
            experiment_id: experiment_id.into(),
            reason: reason.into(),
        }
    }
}
