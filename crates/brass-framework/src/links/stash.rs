//! Supplementary text waiting for a "more" request.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Longer text held back per (transport, channel) until someone asks for it.
///
/// Only the most recent text per conversation is kept.
#[derive(Debug, Default)]
pub struct MoreStash {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MoreStash {
    /// Creates an empty stash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `text`, replacing anything stashed for the conversation.
    pub fn put(&self, transport: &str, channel: &str, text: impl Into<String>) {
        self.entries
            .lock()
            .insert((transport.to_string(), channel.to_string()), text.into());
    }

    /// Removes and returns the stashed text.
    pub fn take(&self, transport: &str, channel: &str) -> Option<String> {
        self.entries
            .lock()
            .remove(&(transport.to_string(), channel.to_string()))
    }
}
