//! # Brass
//!
//! A chat bot runtime that connects to several chat backends at once, turns
//! everything they report into uniform events, and runs commands, link
//! announcements and plugins on top of them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌───────────────┐
//! │  Transport  │────▶│ EventDispatcher │────▶│ CommandRouter │──▶ commands
//! │ (IRC, ...)  │     │                 │────▶│ LinkEngine    │──▶ Storage
//! └─────────────┘     └─────────────────┘────▶│ extensions    │
//!        ▲                                    └───────┬───────┘
//!        └───────────────────── Bot ◀─────────────────┘
//! ```
//!
//! - **Transports**: one per backend connection, each with its own read loop
//! - **Dispatcher**: fans every event out to the listeners subscribed to its kind
//! - **Commands**: directed messages, parsed, gated and rate limited
//! - **Links**: URLs in chat, announced with their page title and saved for `search`
//! - **Extensions**: plugin code registering commands and listeners
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brass::prelude::*;
//!
//! struct Ping;
//!
//! #[async_trait]
//! impl Extension for Ping {
//!     fn name(&self) -> &str {
//!         "ping"
//!     }
//!
//!     async fn init(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
//!         ctx.register_command(Command::new(&["ping"], |call: CommandCall| async move {
//!             call.reply("pong").await?;
//!             Ok(())
//!         }))?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = BrassRuntime::builder().config_file("brass.toml").build()?;
//!     runtime.register_extension(Ping);
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `json-log`: JSON log output

pub use brass_adapter_irc as irc;
pub use brass_core as core;
pub use brass_framework as framework;
pub use brass_runtime as runtime;
pub use brass_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use brass::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use brass_runtime::{BrassConfig, BrassRuntime, RuntimeError, RuntimeResult};

    // Plugin system
    pub use brass_framework::{Command, CommandCall, Extension, ExtensionContext};

    // Event system - for listeners
    pub use brass_core::{Bot, Event, EventDispatcher, EventKind, Transport};

    pub use async_trait::async_trait;

    // Logging macros
    pub use brass_runtime::prelude::*;
}
