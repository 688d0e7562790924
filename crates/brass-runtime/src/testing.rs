//! Test doubles for the runtime unit tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use brass_core::{EventDispatcher, Transport, TransportResult, TransportState};

/// A connected transport that records outbound text and never disconnects.
#[derive(Default)]
pub struct RecordingTransport {
    name: String,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingTransport {
    pub fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// `(operation, target, text)` for every send so far.
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().clone()
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
        std::future::pending().await
    }

    fn on_channels(&self) -> HashSet<String> {
        HashSet::from(["#brass".to_string()])
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
