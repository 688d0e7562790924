//! # Brass Core
//!
//! The core of the Brass chat bot runtime.
//!
//! This crate holds everything that every other layer agrees on:
//!
//! - **Event Model**: one normalized record per occurrence ([`Event`], [`EventKind`], [`Format`])
//! - **Dispatcher**: pub/sub fan-out with an ignore list and per-listener isolation ([`EventDispatcher`])
//! - **Transport Contract**: the capability set every backend implements ([`Transport`])
//! - **Outbound Facade**: routes replies through the originating transport ([`Bot`])
//! - **Privileges**: owner/admin lookup consumed by the command router ([`Privileges`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌────────────┐
//! │  Transport  │────▶│ EventDispatcher │────▶│  Listener  │
//! │    (IRC)    │     │                 │────▶│  Listener  │
//! └─────────────┘     └─────────────────┘     └─────┬──────┘
//!        ▲                                          │
//!        └──────────────── Bot::send_* ◀────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use brass_core::{Event, EventDispatcher, EventKind};
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.register_listener(EventKind::ChatMessage, |event| async move {
//!     tracing::info!(text = %event.text, "heard");
//!     Ok(())
//! });
//!
//! dispatcher.trigger(Event::new(EventKind::ChatMessage).sender("alice", "alice@host"));
//! ```

pub mod auth;
pub mod bot;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod transport;

pub use auth::{NoPrivileges, Privileges};
pub use bot::Bot;
pub use dispatcher::{EventDispatcher, Listener, ListenerFuture, into_listener, panic_message};
pub use error::{TransportError, TransportResult};
pub use event::{CHANNEL_ACTIVITY, CHANNEL_MESSAGES, Event, EventKind, Format};
pub use transport::{BoxedTransport, Transport, TransportState};
