//! Command registration and lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::Command;
use crate::error::{RegistryError, RegistryResult};

#[derive(Default)]
struct Inner {
    commands: Vec<Arc<Command>>,
    aliases: HashMap<String, Arc<Command>>,
}

/// All registered commands, addressable by any alias.
///
/// Aliases are case-insensitive and globally unique.
#[derive(Default)]
pub struct CommandRegistry {
    inner: RwLock<Inner>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command.
    ///
    /// Fails without changing anything if any alias is empty, contains
    /// whitespace, or is already taken.
    pub fn register(&self, command: Command) -> RegistryResult<()> {
        if command.names().is_empty() {
            return Err(RegistryError::InvalidName(String::new()));
        }
        let mut inner = self.inner.write();
        for (i, alias) in command.names().iter().enumerate() {
            if alias.is_empty() || alias.contains(char::is_whitespace) {
                return Err(RegistryError::InvalidName(alias.clone()));
            }
            if let Some(existing) = inner.aliases.get(alias) {
                return Err(RegistryError::DuplicateAlias {
                    alias: alias.clone(),
                    existing: existing.name().to_string(),
                });
            }
            if command.names()[..i].contains(alias) {
                return Err(RegistryError::DuplicateAlias {
                    alias: alias.clone(),
                    existing: command.name().to_string(),
                });
            }
        }

        let command = Arc::new(command);
        for alias in command.names() {
            inner.aliases.insert(alias.clone(), Arc::clone(&command));
        }
        debug!(command = %command.name(), aliases = ?command.names(), "Command registered");
        inner.commands.push(command);
        Ok(())
    }

    /// Finds a command by any of its names.
    pub fn lookup(&self, name: &str) -> Option<Arc<Command>> {
        self.inner.read().aliases.get(&name.to_lowercase()).cloned()
    }

    /// Every command in registration order.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.inner.read().commands.clone()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.inner.read().commands.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
