//! Transport capability contract.
//!
//! A transport owns one backend connection. It translates backend-native
//! notifications into [`Event`]s, triggers them on the [`EventDispatcher`] it
//! is given in [`Transport::run`], and exposes an outbound send contract with
//! flood protection built in.
//!
//! ```text
//! wire ──▶ Transport::run ──▶ EventDispatcher::trigger ──▶ listeners
//! listeners ──▶ Bot::send_* ──▶ Transport::send_* ──▶ wire
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatcher::EventDispatcher;
use crate::error::TransportResult;
use crate::event::{Event, Format};

/// Connection state of a transport.
///
/// `Disconnected → Connecting → Connected → Disconnected` on I/O error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransportState {
    /// No connection, waiting to (re)connect.
    #[default]
    Disconnected,
    /// Connecting or registering with the backend.
    Connecting,
    /// Registered and exchanging messages.
    Connected,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// The capability set every backend implements.
///
/// All send methods may block the calling task while waiting for a flood
/// token; none of them drop messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Unique name of this transport, copied into every event it produces.
    fn name(&self) -> &str;

    /// Formatting used by this backend.
    fn format(&self) -> Format {
        Format::Plain
    }

    /// Current connection state.
    fn state(&self) -> TransportState;

    /// Blocking main loop.
    ///
    /// Returns only on unrecoverable failure; recoverable I/O errors are
    /// retried internally forever.
    async fn run(&self, dispatcher: Arc<EventDispatcher>) -> TransportResult<()>;

    /// Channels currently joined.
    fn on_channels(&self) -> HashSet<String>;

    /// Returns true if `name` is the bot's current display name.
    fn nick_is_me(&self, name: &str) -> bool;

    /// Sends a message to a channel or user.
    async fn send_message(&self, target: &str, text: &str) -> TransportResult<()>;

    /// Sends a notice to a channel or user.
    async fn send_notice(&self, target: &str, text: &str) -> TransportResult<()>;

    /// Sends a private message to a user.
    async fn send_priv_message(&self, nick: &str, text: &str) -> TransportResult<()>;

    /// Sends a private notice to a user.
    async fn send_priv_notice(&self, nick: &str, text: &str) -> TransportResult<()>;

    /// Sends a notice to every joined channel.
    async fn send_mass_notice(&self, text: &str) -> TransportResult<()> {
        let mut channels: Vec<String> = self.on_channels().into_iter().collect();
        channels.sort();
        for channel in channels {
            self.send_notice(&channel, text).await?;
        }
        Ok(())
    }

    /// Signals that a command started working on `event`.
    ///
    /// Backends with presence or typing indicators show them here.
    async fn work_started(&self, _event: &Event) {}

    /// Signals that the work started by [`Transport::work_started`] finished.
    async fn work_done(&self, _event: &Event) {}
}

/// A shared transport trait object.
pub type BoxedTransport = Arc<dyn Transport>;
