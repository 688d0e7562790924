//! Configuration for the IRC transport.
//!
//! # Example Configuration
//!
//! ```toml
//! [[transports]]
//! type = "irc"
//! name = "libera"
//! server = "irc.libera.chat"
//! port = 6667
//! nick = "brass"
//! channels = ["#brass", "#rust"]
//! command_prefix = "!"
//! antiflood_delay_secs = 2
//! rejoin_delay_secs = 10
//!
//! [transports.channel_keys]
//! "#secret" = "hunter2"
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// IRC transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    /// Transport name, copied into every event.
    pub name: String,

    /// Server host name.
    pub server: String,

    /// Server port (default: 6667).
    pub port: u16,

    /// Optional server password sent with `PASS`.
    pub password: Option<String>,

    /// Preferred nickname.
    pub nick: String,

    /// User name sent with `USER`; defaults to the nick when empty.
    pub user: String,

    /// Real name sent with `USER`.
    pub real_name: String,

    /// Channels joined after registration.
    pub channels: Vec<String>,

    /// Keys for channels that need one.
    pub channel_keys: HashMap<String, String>,

    /// Prefix marking a channel message as a command (default: `!`).
    pub command_prefix: String,

    /// Seconds between flood token refills (default: 2).
    pub antiflood_delay_secs: u64,

    /// Sends allowed per refill (default: 5).
    pub flood_capacity: usize,

    /// Seconds to wait before rejoining after a rejection or kick (default: 10).
    pub rejoin_delay_secs: u64,

    /// Seconds without inbound data before the connection is dropped (default: 300).
    pub idle_timeout_secs: u64,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            name: "irc".to_string(),
            server: String::new(),
            port: 6667,
            password: None,
            nick: "brass".to_string(),
            user: String::new(),
            real_name: "Brass chat bot".to_string(),
            channels: Vec::new(),
            channel_keys: HashMap::new(),
            command_prefix: "!".to_string(),
            antiflood_delay_secs: 2,
            flood_capacity: brass_transport::DEFAULT_FLOOD_CAPACITY,
            rejoin_delay_secs: 10,
            idle_timeout_secs: 300,
        }
    }
}

impl IrcConfig {
    /// `host:port` of the server.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    /// User name for `USER`.
    pub fn user_name(&self) -> &str {
        if self.user.is_empty() {
            &self.nick
        } else {
            &self.user
        }
    }

    /// Period of the flood drain ticker.
    pub fn antiflood_delay(&self) -> Duration {
        Duration::from_secs(self.antiflood_delay_secs.max(1))
    }

    /// Delay before a rejoin attempt.
    pub fn rejoin_delay(&self) -> Duration {
        Duration::from_secs(self.rejoin_delay_secs)
    }

    /// Idle read deadline.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// `JOIN` line for a channel, with its key when one is configured.
    pub fn join_line(&self, channel: &str) -> String {
        match self.channel_keys.get(channel) {
            Some(key) => format!("JOIN {channel} {key}"),
            None => format!("JOIN {channel}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IrcConfig::default();
        assert_eq!(config.port, 6667);
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
        assert_eq!(config.user_name(), "brass");
    }

    #[test]
    fn test_join_line_uses_keys() {
        let mut config = IrcConfig::default();
        config
            .channel_keys
            .insert("#secret".to_string(), "hunter2".to_string());
        assert_eq!(config.join_line("#secret"), "JOIN #secret hunter2");
        assert_eq!(config.join_line("#open"), "JOIN #open");
    }
}
