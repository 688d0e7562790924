//! Event system for the Brass runtime.
//!
//! Every transport translates its backend-native notifications into the single
//! [`Event`] shape defined here, and every listener consumes that same shape.
//!
//! - [`EventKind`] - the closed set of things that can happen
//! - [`Format`] - how the payload text is formatted on the wire
//! - [`Event`] - one immutable occurrence, shared as `Arc<Event>` once triggered
//!
//! # Example
//!
//! ```rust,ignore
//! use brass_core::{Event, EventKind, Format};
//!
//! let event = Event::new(EventKind::ChatMessage)
//!     .transport("libera")
//!     .format(Format::IrcControlCodes)
//!     .sender("alice", "alice@example.org")
//!     .channel("#rust")
//!     .text("hello there");
//!
//! assert!(!event.is_private());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Event Kind
// ============================================================================

/// Classification of an event.
///
/// This is a closed enumeration: transports map their native notifications
/// onto exactly one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A message posted in a channel.
    ChatMessage,
    /// A notice posted in a channel.
    ChatNotice,
    /// A message sent directly to the bot.
    PrivateMessage,
    /// A link worth announcing was found in a chat message.
    UrlFound,
    /// The transport finished registering with its backend.
    TransportConnected,
    /// The bot joined a channel.
    ChannelJoined,
    /// The bot rejoined a channel it had been kicked from.
    ChannelRejoinedAfterKick,
    /// The bot left a channel.
    ChannelPart,
    /// The bot was kicked from a channel.
    ChannelKicked,
    /// The bot is banned from a channel.
    ChannelBanned,
    /// Operator status changed in a channel.
    ChannelOpsChange,
    /// Housekeeping pulse, once per housekeeping window.
    PeriodicTick,
    /// Once-per-day pulse at the configured local time.
    DailyTick,
}

/// Kinds describing changes to the bot's presence in a channel.
pub const CHANNEL_ACTIVITY: &[EventKind] = &[
    EventKind::ChannelJoined,
    EventKind::ChannelRejoinedAfterKick,
    EventKind::ChannelPart,
    EventKind::ChannelKicked,
    EventKind::ChannelBanned,
    EventKind::ChannelOpsChange,
];

/// Kinds carrying text that was said in a channel.
pub const CHANNEL_MESSAGES: &[EventKind] = &[
    EventKind::ChatMessage,
    EventKind::ChatNotice,
    EventKind::UrlFound,
];

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [EventKind] = &[
        EventKind::ChatMessage,
        EventKind::ChatNotice,
        EventKind::PrivateMessage,
        EventKind::UrlFound,
        EventKind::TransportConnected,
        EventKind::ChannelJoined,
        EventKind::ChannelRejoinedAfterKick,
        EventKind::ChannelPart,
        EventKind::ChannelKicked,
        EventKind::ChannelBanned,
        EventKind::ChannelOpsChange,
        EventKind::PeriodicTick,
        EventKind::DailyTick,
    ];

    /// Returns the kebab-case name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatMessage => "chat-message",
            Self::ChatNotice => "chat-notice",
            Self::PrivateMessage => "private-message",
            Self::UrlFound => "url-found",
            Self::TransportConnected => "transport-connected",
            Self::ChannelJoined => "channel-joined",
            Self::ChannelRejoinedAfterKick => "channel-rejoined-after-kick",
            Self::ChannelPart => "channel-part",
            Self::ChannelKicked => "channel-kicked",
            Self::ChannelBanned => "channel-banned",
            Self::ChannelOpsChange => "channel-ops-change",
            Self::PeriodicTick => "periodic-tick",
            Self::DailyTick => "daily-tick",
        }
    }

    /// Returns true for the synthetic scheduler kinds.
    pub fn is_tick(&self) -> bool {
        matches!(self, Self::PeriodicTick | Self::DailyTick)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

// ============================================================================
// Formatting Hint
// ============================================================================

/// How the payload text of an event is formatted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// No markup.
    #[default]
    Plain,
    /// mIRC-style control codes (bold, colour, ...).
    IrcControlCodes,
    /// Markdown, as used by REST chat platforms.
    Markdown,
}

// ============================================================================
// Event
// ============================================================================

/// A normalized record of one inbound or synthetic occurrence.
///
/// Events are built by transports (or the scheduler), handed to
/// [`EventDispatcher::trigger`](crate::EventDispatcher::trigger) and then
/// shared read-only between listeners.
///
/// The sender identity is empty only for system-generated events such as
/// ticks; anything with a non-empty identity is subject to the ignore list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Name of the transport that produced this event.
    pub transport: String,
    /// Formatting used by the payload.
    pub format: Format,
    /// What happened.
    pub kind: EventKind,
    /// Display name of the sender.
    pub nick: String,
    /// Durable identity of the sender, stable across nick changes.
    pub identity: String,
    /// Channel or conversation identifier.
    pub channel: String,
    /// Payload text, with any bot-addressing prefix already removed.
    pub text: String,
    /// Opaque token echoed back by listeners that reply.
    pub context: String,
    /// Whether the message was addressed to the bot.
    pub directed: bool,
}

impl Event {
    /// Creates an empty event of the given kind.
    pub fn new(kind: EventKind) -> Self {
        Self {
            transport: String::new(),
            format: Format::Plain,
            kind,
            nick: String::new(),
            identity: String::new(),
            channel: String::new(),
            text: String::new(),
            context: String::new(),
            directed: false,
        }
    }

    /// Creates a system event with no sender, as used by the scheduler.
    pub fn tick(kind: EventKind) -> Self {
        Self::new(kind)
    }

    /// Sets the transport name.
    pub fn transport(mut self, transport: impl Into<String>) -> Self {
        self.transport = transport.into();
        self
    }

    /// Sets the formatting hint.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the sender display name and durable identity.
    pub fn sender(mut self, nick: impl Into<String>, identity: impl Into<String>) -> Self {
        self.nick = nick.into();
        self.identity = identity.into();
        self
    }

    /// Sets the channel.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Sets the payload text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the context token.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Marks the event as directed at the bot.
    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Returns true if this event came from a private conversation.
    pub fn is_private(&self) -> bool {
        self.kind == EventKind::PrivateMessage
    }

    /// Returns true if this event was generated by the runtime itself.
    pub fn is_system(&self) -> bool {
        self.identity.is_empty()
    }

    /// Where a reply to this event should go.
    ///
    /// Private conversations are answered to the sender, everything else to
    /// the channel the event came from.
    pub fn reply_target(&self) -> &str {
        if self.is_private() {
            &self.nick
        } else {
            &self.channel
        }
    }
}
