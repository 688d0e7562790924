//! Brass Runtime - Orchestration layer for the Brass chat bot runtime.
//!
//! This crate provides:
//! - Runtime orchestration (`BrassRuntime`)
//! - Layered configuration (`ConfigLoader`, `BrassConfig`)
//! - Logging configuration (`LoggingBuilder`)
//! - SQLite persistence for links and accounts (`Storage`)
//! - Periodic and daily ticks (`Scheduler`)
//! - The built-in commands (`Builtins`)
//!
//! ```ignore
//! use brass_runtime::BrassRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BrassRuntime::builder().build()?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod builtins;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod scheduler;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use builtins::{Builtins, SEARCH_LIMIT};
pub use config::{BrassConfig, ConfigError, ConfigLoader, ConfigResult, Profile, TransportConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BrassRuntime, RuntimeBuilder, wait_for_shutdown};
pub use scheduler::{Scheduler, next_daily};
pub use storage::{Storage, StorageError, StorageResult, StoredLink, User};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the commonly used logging macros and `Level`.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
