//! Configuration module for the Brass runtime.
//!
//! TOML files, `BRASS_*` environment variables and programmatic overrides
//! are layered by [`ConfigLoader`] and checked by [`validate_config`].
//!
//! ```toml
//! owners = ["alice@example.org"]
//!
//! [[transports]]
//! type = "irc"
//! name = "libera"
//! server = "irc.libera.chat"
//! nick = "brass"
//! channels = ["#brass"]
//!
//! [links]
//! cooldown_secs = 300
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    BrassConfig, CommandsConfig, DatabaseConfig, LinksConfig, LogFormat, LogLevel, LogOutput,
    LogRotation, LoggingConfig, ScheduleConfig, SpanEventConfig, TransportConfig,
};
pub use validation::validate_config;
