//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use brass_adapter_irc::IrcConfig;
use brass_framework::RouterTexts;
use brass_transport::FetchConfig;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrassConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Backend connections, one transport each.
    #[serde(default)]
    pub transports: Vec<TransportConfig>,

    /// Command router settings.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Link announce settings.
    #[serde(default)]
    pub links: LinksConfig,

    /// Daily tick settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Storage settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Identities that are always treated as owners.
    #[serde(default)]
    pub owners: Vec<String>,

    /// Identities whose events are dropped before dispatch.
    #[serde(default)]
    pub ignore: Vec<String>,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to the tracing level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to compact otherwise.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation for `output = "file"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global level; `RUST_LOG` wins when set.
    pub level: LogLevel,

    pub format: LogFormat,

    pub output: LogOutput,

    /// Log file for `output = "file"`.
    pub file_path: Option<PathBuf>,

    pub rotation: LogRotation,

    pub span_events: SpanEventConfig,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include file names and line numbers.
    pub file_location: bool,

    /// Per-module levels, e.g. `brass_adapter_irc = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Transports
// =============================================================================

/// One backend connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransportConfig {
    /// IRC line protocol.
    Irc(IrcConfig),
}

impl TransportConfig {
    /// Name of the transport.
    pub fn name(&self) -> &str {
        match self {
            Self::Irc(cfg) => &cfg.name,
        }
    }

    /// Short backend type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Irc(_) => "irc",
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Command router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Uses of one command by one identity allowed per window.
    pub ceiling: u32,

    /// Housekeeping window in seconds; also the periodic tick.
    pub window_secs: u64,

    pub needs_private: String,

    pub needs_admin: String,

    pub rate_limited: String,

    /// Phrases answered to unknown commands.
    pub wrong_command: Vec<String>,

    /// Chance of answering an unknown command at all.
    pub wrong_command_probability: f64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        let texts = RouterTexts::default();
        Self {
            ceiling: 5,
            window_secs: 300,
            needs_private: texts.needs_private,
            needs_admin: texts.needs_admin,
            rate_limited: texts.rate_limited,
            wrong_command: texts.wrong_command,
            wrong_command_probability: texts.wrong_command_probability,
        }
    }
}

impl CommandsConfig {
    /// Housekeeping window as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Router texts built from this section.
    pub fn texts(&self) -> RouterTexts {
        RouterTexts {
            needs_private: self.needs_private.clone(),
            needs_admin: self.needs_admin.clone(),
            rate_limited: self.rate_limited.clone(),
            wrong_command: self.wrong_command.clone(),
            wrong_command_probability: self.wrong_command_probability,
        }
    }
}

// =============================================================================
// Links
// =============================================================================

/// Link announce and page fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Whether chat is scanned for links at all.
    pub enabled: bool,

    /// Seconds before the same link may be announced again in a channel.
    pub cooldown_secs: u64,

    /// Chat lines after which a link counts as new again.
    pub line_horizon: u32,

    pub fetch_timeout_secs: u64,

    /// Page bodies are truncated at this many bytes.
    pub max_body_size: usize,

    /// Overrides the default `User-Agent`.
    pub user_agent: Option<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_secs: 300,
            line_horizon: 100,
            fetch_timeout_secs: 10,
            max_body_size: 2 * 1024 * 1024,
            user_agent: None,
        }
    }
}

impl LinksConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Page fetcher settings built from this section.
    pub fn fetch_config(&self) -> FetchConfig {
        let mut config = FetchConfig {
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_body_size: self.max_body_size,
            ..FetchConfig::default()
        };
        if let Some(agent) = &self.user_agent {
            config.user_agent.clone_from(agent);
        }
        config
    }
}

// =============================================================================
// Schedule & Database
// =============================================================================

/// Local time of the daily tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub daily_hour: u32,
    pub daily_minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_hour: 9,
            daily_minute: 0,
        }
    }
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file, or `:memory:`.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "brass.db".to_string(),
        }
    }
}
