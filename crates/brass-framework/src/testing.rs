//! Test doubles shared by the framework's unit tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use brass_core::{Event, EventDispatcher, Transport, TransportResult, TransportState};

/// Records every outbound call instead of talking to a backend.
#[derive(Default)]
pub struct RecordingTransport {
    name: String,
    sent: Mutex<Vec<(String, String, String)>>,
    work: Mutex<(usize, usize)>,
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

    /// `(work_started, work_done)` call counts.
    pub fn work_signals(&self) -> (usize, usize) {
        *self.work.lock()
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
        HashSet::new()
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

    async fn work_started(&self, _event: &Event) {
        self.work.lock().0 += 1;
    }

    async fn work_done(&self, _event: &Event) {
        self.work.lock().1 += 1;
    }
}
