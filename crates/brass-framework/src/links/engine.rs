//! The link announce/dedup engine.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::{debug, warn};

use brass_core::{Bot, Event, EventDispatcher, EventKind};

use super::canonical::canonicalize;
use super::extract::LinkExtractor;
use super::stash::MoreStash;
use super::summary::PageSummarizer;
use super::throttle::AnnounceThrottle;

/// One link as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Transport the link was seen on.
    pub transport: String,
    /// Channel the link was posted in.
    pub channel: String,
    /// Display name of the poster.
    pub nick: String,
    /// Durable identity of the poster.
    pub identity: String,
    /// Canonical link.
    pub link: String,
    /// The whole message the link was found in.
    pub message: String,
    /// Page title, when one could be resolved.
    pub title: Option<String>,
}

/// Durable, searchable link storage.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Persists one sighting of a link.
    async fn save_link(&self, record: &LinkRecord) -> anyhow::Result<()>;
}

/// Watches chat for links, stores them, and announces their titles.
pub struct LinkEngine {
    extractor: LinkExtractor,
    throttle: AnnounceThrottle,
    summarizer: Arc<dyn PageSummarizer>,
    store: Arc<dyn LinkStore>,
    stash: Arc<MoreStash>,
    bot: Arc<Bot>,
    dispatcher: Weak<EventDispatcher>,
}

impl LinkEngine {
    /// Creates an engine that announces through `bot` and reports
    /// url-found events on `dispatcher`.
    pub fn new(
        throttle: AnnounceThrottle,
        summarizer: Arc<dyn PageSummarizer>,
        store: Arc<dyn LinkStore>,
        stash: Arc<MoreStash>,
        bot: Arc<Bot>,
        dispatcher: &Arc<EventDispatcher>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            extractor: LinkExtractor::new()?,
            throttle,
            summarizer,
            store,
            stash,
            bot,
            dispatcher: Arc::downgrade(dispatcher),
        })
    }

    /// The announce throttle.
    pub fn throttle(&self) -> &AnnounceThrottle {
        &self.throttle
    }

    /// Subscribes the engine to chat messages.
    pub fn attach(self: &Arc<Self>) {
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            return;
        };
        let engine = Arc::clone(self);
        dispatcher.register_listener(EventKind::ChatMessage, move |event| {
            let engine = Arc::clone(&engine);
            async move {
                engine.process(&event).await;
                Ok(())
            }
        });
    }

    /// Handles one chat message and returns the links it announced.
    pub async fn process(&self, event: &Event) -> Vec<String> {
        self.throttle.observe_line();

        let mut seen = HashSet::new();
        let mut announced = Vec::new();
        for raw in self.extractor.extract(&event.text) {
            let Some(link) = canonicalize(raw) else {
                continue;
            };
            if !seen.insert(link.clone()) {
                continue;
            }
            if self.handle_link(event, &link).await {
                announced.push(link);
            }
        }
        announced
    }

    async fn handle_link(&self, event: &Event, link: &str) -> bool {
        let summary = match self.summarizer.summarize(link).await {
            Ok(summary) => summary,
            Err(e) => {
                debug!(link, error = %e, "Title lookup failed");
                None
            }
        };

        let record = LinkRecord {
            transport: event.transport.clone(),
            channel: event.channel.clone(),
            nick: event.nick.clone(),
            identity: event.identity.clone(),
            link: link.to_string(),
            message: event.text.clone(),
            title: summary.as_ref().map(|s| s.title.clone()),
        };
        if let Err(e) = self.store.save_link(&record).await {
            warn!(link, error = %e, "Failed to store link");
        }

        let Some(summary) = summary else {
            return false;
        };
        let scope = format!("{}/{}", event.transport, event.channel);
        if !self.throttle.try_announce(&scope, link) {
            debug!(link, scope = %scope, "Repeat link suppressed");
            return false;
        }

        if let Err(e) = self.bot.send_message(event, &summary.line()).await {
            warn!(link, error = %e, "Failed to announce link");
        }
        if let Some(description) = summary.description {
            self.stash.put(&event.transport, &event.channel, description);
        }
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.trigger(
                Event::new(EventKind::UrlFound)
                    .transport(&event.transport)
                    .format(event.format)
                    .sender(&event.nick, &event.identity)
                    .channel(&event.channel)
                    .text(link)
                    .context(&event.context),
            );
        }
        true
    }
}
