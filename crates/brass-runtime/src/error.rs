//! Runtime error types.

use brass_core::TransportError;
use brass_framework::RegistryError;
use brass_transport::FetchError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Errors that end the runtime.
///
/// Every variant is fatal; the binary logs it and exits non-zero.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage could not be opened.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// The page fetcher could not be built.
    #[error("page fetcher: {0}")]
    Fetch(#[from] FetchError),

    /// The link pattern failed to compile.
    #[error("link pattern: {0}")]
    LinkPattern(#[from] regex::Error),

    /// A command could not be registered.
    #[error("command registration: {0}")]
    Registry(#[from] RegistryError),

    /// An extension failed to initialize.
    #[error("extension: {0:#}")]
    Extension(anyhow::Error),

    /// A transport failed for good.
    #[error("transport '{name}': {source}")]
    Transport {
        name: String,
        #[source]
        source: TransportError,
    },

    /// A transport task panicked or was cancelled.
    #[error("transport task failed: {0}")]
    TransportTask(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
