//! Outbound send facade.
//!
//! [`Bot`] keeps every registered transport by name and routes replies back
//! through the transport that produced the source event. Plugins and the core
//! alike send through it; nothing else talks to a transport directly.
//!
//! ```rust,ignore
//! async fn greet(bot: Arc<Bot>, event: Arc<Event>) -> anyhow::Result<()> {
//!     bot.send_message(&event, &format!("hello {}", event.nick)).await?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::event::Event;
use crate::transport::BoxedTransport;

/// Registry of transports plus the outbound send API.
#[derive(Default)]
pub struct Bot {
    transports: RwLock<HashMap<String, BoxedTransport>>,
}

impl Bot {
    /// Creates a bot with no transports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transport under its own name.
    pub fn add_transport(&self, transport: BoxedTransport) -> TransportResult<()> {
        let name = transport.name().to_string();
        let mut transports = self.transports.write();
        if transports.contains_key(&name) {
            return Err(TransportError::InvalidConfig(format!(
                "duplicate transport name '{name}'"
            )));
        }
        debug!(transport = %name, "Transport registered");
        transports.insert(name, transport);
        Ok(())
    }

    /// Looks up a transport by name.
    pub fn transport(&self, name: &str) -> TransportResult<BoxedTransport> {
        self.transports
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::UnknownTransport(name.to_string()))
    }

    /// Returns every registered transport, sorted by name.
    pub fn transports(&self) -> Vec<BoxedTransport> {
        let mut list: Vec<BoxedTransport> = self.transports.read().values().cloned().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        list
    }

    /// Replies to `source` in the conversation it came from.
    pub async fn send_message(&self, source: &Event, text: &str) -> TransportResult<()> {
        let transport = self.transport(&source.transport)?;
        transport.send_message(source.reply_target(), text).await
    }

    /// Replies to `source` with a notice in the conversation it came from.
    pub async fn send_notice(&self, source: &Event, text: &str) -> TransportResult<()> {
        let transport = self.transport(&source.transport)?;
        transport.send_notice(source.reply_target(), text).await
    }

    /// Sends a private message to the sender of `source`.
    pub async fn send_private_message(&self, source: &Event, text: &str) -> TransportResult<()> {
        let transport = self.transport(&source.transport)?;
        transport.send_priv_message(&source.nick, text).await
    }

    /// Sends a private notice to the sender of `source`.
    pub async fn send_private_notice(&self, source: &Event, text: &str) -> TransportResult<()> {
        let transport = self.transport(&source.transport)?;
        transport.send_priv_notice(&source.nick, text).await
    }

    /// Broadcasts a notice to every joined channel on every transport.
    ///
    /// A failing transport is logged and skipped; the first error is returned
    /// after all transports were attempted.
    pub async fn send_mass_notice(&self, text: &str) -> TransportResult<()> {
        let mut first_error = None;
        for transport in self.transports() {
            if let Err(e) = transport.send_mass_notice(text).await {
                warn!(transport = %transport.name(), error = %e, "Mass notice failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Returns true if `name` is the bot's own name on the source transport.
    pub fn nick_is_me(&self, source: &Event, name: &str) -> bool {
        self.transport(&source.transport)
            .map(|t| t.nick_is_me(name))
            .unwrap_or(false)
    }

    /// Forwards the "work started" signal to the source transport.
    pub async fn work_started(&self, source: &Event) {
        if let Ok(transport) = self.transport(&source.transport) {
            transport.work_started(source).await;
        }
    }

    /// Forwards the "work done" signal to the source transport.
    pub async fn work_done(&self, source: &Event) {
        if let Ok(transport) = self.transport(&source.transport) {
            transport.work_done(source).await;
        }
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.transports.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("Bot").field("transports", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::EventDispatcher;
    use crate::event::EventKind;
    use crate::transport::{Transport, TransportState};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingTransport {
        name: String,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingTransport {
        fn named(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                ..Default::default()
            })
        }

        fn record(&self, op: &str, target: &str, text: &str) -> TransportResult<()> {
            self.sent
                .lock()
                .push((op.to_string(), target.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn name(&self) -> &str {
            &self.name
        }

        fn state(&self) -> TransportState {
            TransportState::Connected
        }

        async fn run(&self, _dispatcher: Arc<EventDispatcher>) -> TransportResult<()> {
            Ok(())
        }

        fn on_channels(&self) -> HashSet<String> {
            ["#b", "#a"].into_iter().map(String::from).collect()
        }

        fn nick_is_me(&self, name: &str) -> bool {
            name == "brass"
        }

        async fn send_message(&self, target: &str, text: &str) -> TransportResult<()> {
            self.record("msg", target, text)
        }

        async fn send_notice(&self, target: &str, text: &str) -> TransportResult<()> {
            self.record("notice", target, text)
        }

        async fn send_priv_message(&self, nick: &str, text: &str) -> TransportResult<()> {
            self.record("privmsg", nick, text)
        }

        async fn send_priv_notice(&self, nick: &str, text: &str) -> TransportResult<()> {
            self.record("privnotice", nick, text)
        }
    }

    #[tokio::test]
    async fn test_replies_route_through_source_transport() {
        let bot = Bot::new();
        let one = RecordingTransport::named("one");
        let two = RecordingTransport::named("two");
        bot.add_transport(one.clone()).unwrap();
        bot.add_transport(two.clone()).unwrap();

        let public = Event::new(EventKind::ChatMessage)
            .transport("two")
            .sender("alice", "alice@host")
            .channel("#rust");
        let private = Event::new(EventKind::PrivateMessage)
            .transport("two")
            .sender("alice", "alice@host")
            .channel("brass");

        bot.send_message(&public, "hi").await.unwrap();
        bot.send_message(&private, "psst").await.unwrap();
        bot.send_private_notice(&public, "note").await.unwrap();

        assert!(one.sent.lock().is_empty());
        assert_eq!(
            *two.sent.lock(),
            vec![
                ("msg".into(), "#rust".into(), "hi".into()),
                ("msg".into(), "alice".into(), "psst".into()),
                ("privnotice".into(), "alice".into(), "note".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_mass_notice_reaches_every_channel() {
        let bot = Bot::new();
        let one = RecordingTransport::named("one");
        bot.add_transport(one.clone()).unwrap();

        bot.send_mass_notice("restarting").await.unwrap();

        let sent = one.sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, "#a");
        assert_eq!(sent[1].1, "#b");
    }

    #[tokio::test]
    async fn test_unknown_transport_and_duplicates() {
        let bot = Bot::new();
        bot.add_transport(RecordingTransport::named("one")).unwrap();
        assert!(bot.add_transport(RecordingTransport::named("one")).is_err());

        let event = Event::new(EventKind::ChatMessage).transport("nope");
        let err = bot.send_message(&event, "hi").await.unwrap_err();
        assert!(matches!(err, TransportError::UnknownTransport(name) if name == "nope"));
        assert!(!bot.nick_is_me(&event, "brass"));
    }
}
