//! Extensions: feature bundles that plug into a running bot.
//!
//! An extension receives an [`ExtensionContext`] once at startup and uses it
//! to register commands and listeners. After that it only runs when one of
//! those fires.
//!
//! ```rust,ignore
//! struct Greeter;
//!
//! #[async_trait]
//! impl Extension for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     async fn init(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
//!         let bot = ctx.bot.clone();
//!         ctx.dispatcher.register_listener(EventKind::ChannelJoined, move |event| {
//!             let bot = bot.clone();
//!             async move {
//!                 bot.send_message(&event, "hello!").await?;
//!                 Ok(())
//!             }
//!         });
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use brass_core::{Bot, EventDispatcher};
use brass_transport::PageFetcher;

use crate::command::{Command, CommandRegistry};
use crate::error::RegistryResult;
use crate::links::MoreStash;
use crate::session::SessionStore;

/// Handles an extension gets at startup.
#[derive(Clone)]
pub struct ExtensionContext {
    /// Outbound facade.
    pub bot: Arc<Bot>,
    /// Event subscription.
    pub dispatcher: Arc<EventDispatcher>,
    /// Command registration.
    pub commands: Arc<CommandRegistry>,
    /// Shared page fetcher.
    pub fetcher: Arc<PageFetcher>,
    /// Text waiting for "more".
    pub stash: Arc<MoreStash>,
    /// Logged-in identities.
    pub sessions: Arc<SessionStore>,
}

impl ExtensionContext {
    /// Registers a command.
    pub fn register_command(&self, command: Command) -> RegistryResult<()> {
        self.commands.register(command)
    }
}

/// A pluggable feature bundle.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Registers the extension's commands and listeners.
    async fn init(&self, ctx: &ExtensionContext) -> anyhow::Result<()>;
}

/// Initializes every extension in order.
///
/// Stops at the first failure; a half-initialized bot would serve commands
/// inconsistently.
pub async fn init_extensions(
    extensions: &[Arc<dyn Extension>],
    ctx: &ExtensionContext,
) -> anyhow::Result<()> {
    for extension in extensions {
        if let Err(e) = extension.init(ctx).await {
            warn!(extension = %extension.name(), error = %e, "Extension failed to initialize");
            return Err(e.context(format!("extension '{}'", extension.name())));
        }
        info!(extension = %extension.name(), "Extension initialized");
    }
    Ok(())
}
