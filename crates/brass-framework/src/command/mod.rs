//! Commands addressed to the bot.
//!
//! A directed message is split on whitespace; the first token names the
//! command, the rest are its arguments. Commands are registered once in a
//! [`CommandRegistry`] and executed by the [`CommandRouter`], which applies
//! authorization gates and per-identity rate limits first.
//!
//! ```rust,ignore
//! use brass_framework::Command;
//!
//! let roll = Command::new(&["roll", "dice"], |call| async move {
//!     let sides: u32 = call.args.first().and_then(|a| a.parse().ok()).unwrap_or(6);
//!     call.reply(&format!("{}", rand::random::<u32>() % sides + 1)).await?;
//!     Ok(())
//! })
//! .usage("roll [sides]")
//! .help("Rolls a die.");
//!
//! registry.register(roll)?;
//! ```

pub mod ratelimit;
pub mod registry;
pub mod router;

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use brass_core::{Bot, Event, TransportResult};

pub use ratelimit::{RateDecision, RateLimiter};
pub use registry::CommandRegistry;
pub use router::{CommandRouter, RouteOutcome, RouterTexts};

/// Future returned by a command handler.
pub type CommandFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Type-erased command handler.
pub type CommandHandler = Arc<dyn Fn(CommandCall) -> CommandFuture + Send + Sync>;

/// Everything a handler gets to see about one invocation.
#[derive(Clone)]
pub struct CommandCall {
    /// Primary name of the invoked command.
    pub command: String,
    /// Whitespace-separated arguments after the command name.
    pub args: Vec<String>,
    /// The triggering event.
    pub event: Arc<Event>,
    /// Outbound facade.
    pub bot: Arc<Bot>,
}

impl CommandCall {
    /// Replies in the conversation the command came from.
    pub async fn reply(&self, text: &str) -> TransportResult<()> {
        self.bot.send_message(&self.event, text).await
    }

    /// Replies with a notice to the caller only.
    pub async fn notice(&self, text: &str) -> TransportResult<()> {
        self.bot.send_private_notice(&self.event, text).await
    }

    /// Arguments joined back with single spaces.
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }
}

/// A registered command.
#[derive(Clone)]
pub struct Command {
    names: Vec<String>,
    private_only: bool,
    owner_only: bool,
    admin_only: bool,
    usage: String,
    help: String,
    handler: CommandHandler,
}

impl Command {
    /// Creates a command answering to `names`; the first name is primary.
    pub fn new<F, Fut>(names: &[&str], handler: F) -> Self
    where
        F: Fn(CommandCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            names: names.iter().map(|n| n.to_lowercase()).collect(),
            private_only: false,
            owner_only: false,
            admin_only: false,
            usage: String::new(),
            help: String::new(),
            handler: Arc::new(move |call| handler(call).boxed()),
        }
    }

    /// Only runs in private conversations.
    pub fn private_only(mut self) -> Self {
        self.private_only = true;
        self
    }

    /// Only runs for owners.
    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    /// Only runs for owners and admins.
    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    /// Sets the usage line.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Sets the help text.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Primary name.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    /// All names, primary first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether the command refuses to run outside private conversations.
    pub fn is_private_only(&self) -> bool {
        self.private_only
    }

    /// Whether the command is limited to owners.
    pub fn is_owner_only(&self) -> bool {
        self.owner_only
    }

    /// Whether the command is limited to owners and admins.
    pub fn is_admin_only(&self) -> bool {
        self.admin_only
    }

    /// Usage line.
    pub fn usage_text(&self) -> &str {
        &self.usage
    }

    /// Help text.
    pub fn help_text(&self) -> &str {
        &self.help
    }

    pub(crate) fn invoke(&self, call: CommandCall) -> CommandFuture {
        (self.handler)(call)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("names", &self.names)
            .field("private_only", &self.private_only)
            .field("owner_only", &self.owner_only)
            .field("admin_only", &self.admin_only)
            .finish_non_exhaustive()
    }
}
