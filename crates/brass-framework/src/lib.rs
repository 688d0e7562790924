//! # Brass Framework
//!
//! The parts of Brass that sit between the dispatcher and plugin code:
//!
//! - **Commands**: registration, parsing, authorization gates and
//!   per-identity rate limits ([`CommandRegistry`], [`CommandRouter`])
//! - **Links**: extraction, canonicalization, throttled announcement and the
//!   "more" stash ([`LinkEngine`])
//! - **Sessions**: owner/admin privileges ([`SessionStore`])
//! - **Extensions**: the plugin entry point ([`Extension`])
//!
//! ## Wiring
//!
//! ```text
//!                      ┌──────────────▶ CommandRouter ──▶ Command task
//! EventDispatcher ─────┤
//!                      └──────────────▶ LinkEngine ─────▶ LinkStore
//! ```

pub mod command;
pub mod error;
pub mod extension;
pub mod links;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{
    Command, CommandCall, CommandFuture, CommandHandler, CommandRegistry, CommandRouter,
    RateDecision, RateLimiter, RouteOutcome, RouterTexts,
};
pub use error::{RegistryError, RegistryResult};
pub use extension::{Extension, ExtensionContext, init_extensions};
pub use links::{
    AnnounceThrottle, LinkEngine, LinkExtractor, LinkRecord, LinkStore, MoreStash, PageSummarizer,
    PageSummary, canonicalize,
};
pub use session::{Grant, SessionStore};
