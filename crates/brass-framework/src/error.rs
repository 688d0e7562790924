//! Error types for the Brass framework.

use thiserror::Error;

/// Errors raised while registering commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An alias is already taken by another command.
    #[error("alias '{alias}' is already registered by command '{existing}'")]
    DuplicateAlias {
        /// The colliding alias.
        alias: String,
        /// Primary name of the command that owns it.
        existing: String,
    },

    /// The command has no names, or an empty or whitespace-containing one.
    #[error("invalid command name '{0}'")]
    InvalidName(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
