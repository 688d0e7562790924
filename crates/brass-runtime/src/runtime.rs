//! Runtime orchestration.
//!
//! [`BrassRuntime`] turns a [`BrassConfig`] into a running bot:
//!
//! ```text
//!  config ──▶ transports ──▶ Bot
//!         ──▶ Storage (SQLite)
//!         ──▶ CommandRouter ─┐
//!         ──▶ LinkEngine ────┼──▶ EventDispatcher ◀── transports' read loops
//!         ──▶ extensions ────┤
//!         ──▶ Scheduler ─────┘
//! ```
//!
//! It then waits for Ctrl+C / SIGTERM, or for a transport to fail fatally.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use brass_runtime::BrassRuntime;
//!
//! let mut runtime = BrassRuntime::builder()
//!     .config_file("brass.toml")
//!     .build()?;
//! runtime.register_extension(MyExtension::default());
//! runtime.run().await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use brass_adapter_irc::IrcTransport;
use brass_core::{Bot, BoxedTransport, EventDispatcher, TransportResult};
use brass_framework::{
    AnnounceThrottle, CommandRegistry, CommandRouter, Extension, ExtensionContext, LinkEngine,
    MoreStash, SessionStore, init_extensions,
};
use brass_transport::PageFetcher;

use crate::builtins::Builtins;
use crate::config::{BrassConfig, ConfigLoader, TransportConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::scheduler::Scheduler;
use crate::storage::Storage;

/// A configured bot, ready to run.
pub struct BrassRuntime {
    config: BrassConfig,
    bot: Arc<Bot>,
    dispatcher: Arc<EventDispatcher>,
    commands: Arc<CommandRegistry>,
    sessions: Arc<SessionStore>,
    stash: Arc<MoreStash>,
    fetcher: Arc<PageFetcher>,
    transports: Vec<BoxedTransport>,
    extensions: Vec<Arc<dyn Extension>>,
}

impl BrassRuntime {
    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration.
    ///
    /// Initializes logging, validates the configuration and creates one
    /// transport per `[[transports]]` entry. Nothing connects until
    /// [`BrassRuntime::run`].
    pub fn from_config(config: BrassConfig) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        validate_config(&config)?;

        let bot = Arc::new(Bot::new());
        let mut transports = Vec::with_capacity(config.transports.len());
        for transport_config in &config.transports {
            let transport: BoxedTransport = match transport_config {
                TransportConfig::Irc(irc) => Arc::new(IrcTransport::new(irc.clone())),
            };
            bot.add_transport(Arc::clone(&transport))
                .map_err(|source| RuntimeError::Transport {
                    name: transport_config.name().to_string(),
                    source,
                })?;
            info!(
                transport = %transport_config.name(),
                kind = transport_config.kind(),
                "Transport configured"
            );
            transports.push(transport);
        }

        let fetcher = Arc::new(PageFetcher::new(config.links.fetch_config())?);
        let sessions = Arc::new(SessionStore::new(config.owners.iter().cloned()));

        info!(
            log_level = %config.logging.level,
            transports = transports.len(),
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            bot,
            dispatcher: Arc::new(EventDispatcher::new()),
            commands: Arc::new(CommandRegistry::new()),
            sessions,
            stash: Arc::new(MoreStash::new()),
            fetcher,
            transports,
            extensions: Vec::new(),
        })
    }

    /// The configuration the runtime was built from.
    pub fn config(&self) -> &BrassConfig {
        &self.config
    }

    /// The outbound facade.
    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    /// The event dispatcher.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// The command registry.
    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    /// Adds a transport that is not described by the configuration.
    pub fn add_transport(&mut self, transport: BoxedTransport) -> RuntimeResult<()> {
        let name = transport.name().to_string();
        self.bot
            .add_transport(Arc::clone(&transport))
            .map_err(|source| RuntimeError::Transport { name, source })?;
        self.transports.push(transport);
        Ok(())
    }

    /// Adds an extension, initialized after the built-in commands.
    pub fn register_extension<E: Extension + 'static>(&mut self, extension: E) {
        self.extensions.push(Arc::new(extension));
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or a transport fails fatally.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let storage = Arc::new(Storage::open(&self.config.database.path).await?);
        let result = self.serve(Arc::clone(&storage), shutdown).await;
        storage.close().await;
        result
    }

    async fn serve<F>(self, storage: Arc<Storage>, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let dispatcher = Arc::clone(&self.dispatcher);
        dispatcher.set_black_list(self.config.ignore.iter().cloned());

        let router = Arc::new(CommandRouter::new(
            Arc::clone(&self.commands),
            Arc::clone(&self.bot),
            self.sessions.clone(),
            self.config.commands.ceiling,
            self.config.commands.texts(),
        ));
        router.attach(&dispatcher);

        let links = &self.config.links;
        if links.enabled {
            let engine = Arc::new(LinkEngine::new(
                AnnounceThrottle::new(links.cooldown(), links.line_horizon),
                self.fetcher.clone(),
                storage.clone(),
                Arc::clone(&self.stash),
                Arc::clone(&self.bot),
                &dispatcher,
            )?);
            engine.attach();
        } else {
            info!("Link announcements disabled");
        }

        let ctx = ExtensionContext {
            bot: Arc::clone(&self.bot),
            dispatcher: Arc::clone(&dispatcher),
            commands: Arc::clone(&self.commands),
            fetcher: Arc::clone(&self.fetcher),
            stash: Arc::clone(&self.stash),
            sessions: Arc::clone(&self.sessions),
        };
        let mut extensions: Vec<Arc<dyn Extension>> = vec![Arc::new(Builtins::new(storage))];
        extensions.extend(self.extensions.iter().cloned());
        init_extensions(&extensions, &ctx)
            .await
            .map_err(RuntimeError::Extension)?;
        info!(commands = self.commands.len(), "Commands registered");

        let schedule = &self.config.schedule;
        let scheduler = Scheduler::new(
            Arc::clone(&dispatcher),
            self.config.commands.window(),
            schedule.daily_hour,
            schedule.daily_minute,
        )?
        .start();

        let mut tasks: JoinSet<(String, TransportResult<()>)> = JoinSet::new();
        for transport in &self.transports {
            let transport = Arc::clone(transport);
            let dispatcher = Arc::clone(&dispatcher);
            info!(transport = %transport.name(), "Starting transport");
            tasks.spawn(async move {
                let name = transport.name().to_string();
                let result = transport.run(dispatcher).await;
                (name, result)
            });
        }

        info!("Brass is now running. Press Ctrl+C to stop.");

        tokio::pin!(shutdown);
        let result = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                joined = tasks.join_next(), if !tasks.is_empty() => match joined {
                    Some(Ok((name, Ok(())))) => {
                        warn!(transport = %name, "Transport stopped");
                    }
                    Some(Ok((name, Err(source)))) => {
                        error!(transport = %name, error = %source, "Transport failed");
                        break Err(RuntimeError::Transport { name, source });
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Transport task failed");
                        break Err(RuntimeError::TransportTask(e.to_string()));
                    }
                    None => {}
                },
            }
        };

        info!("Stopping Brass runtime");
        scheduler.abort();
        tasks.shutdown().await;
        info!("Runtime stopped");

        result
    }
}

impl std::fmt::Debug for BrassRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrassRuntime")
            .field("bot", &self.bot)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Waits for Ctrl+C, or SIGTERM on Unix.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`BrassRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the working and user config directories.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BrassConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<BrassRuntime> {
        let config = self.config_loader.load()?;
        BrassRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use async_trait::async_trait;
    use brass_adapter_irc::IrcConfig;
    use brass_core::{Event, EventKind, Transport, TransportError, TransportState};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn config() -> BrassConfig {
        BrassConfig {
            transports: vec![TransportConfig::Irc(IrcConfig {
                name: "offline".into(),
                server: "127.0.0.1".into(),
                port: 1,
                channels: vec!["#brass".into()],
                ..IrcConfig::default()
            })],
            database: crate::config::DatabaseConfig {
                path: ":memory:".into(),
            },
            ignore: vec!["spam@host".into()],
            ..Default::default()
        }
    }

    /// A transport whose backend rejects the nickname right away.
    struct Rejected;

    #[async_trait]
    impl Transport for Rejected {
        fn name(&self) -> &str {
            "rejected"
        }

        fn state(&self) -> TransportState {
            TransportState::Disconnected
        }

        async fn run(&self, _dispatcher: Arc<EventDispatcher>) -> TransportResult<()> {
            Err(TransportError::InvalidNickname {
                nick: "0brass".into(),
                reason: "Erroneous nickname".into(),
            })
        }

        fn on_channels(&self) -> HashSet<String> {
            HashSet::new()
        }

        fn nick_is_me(&self, _name: &str) -> bool {
            false
        }

        async fn send_message(&self, _target: &str, _text: &str) -> TransportResult<()> {
            Ok(())
        }

        async fn send_notice(&self, _target: &str, _text: &str) -> TransportResult<()> {
            Ok(())
        }

        async fn send_priv_message(&self, _nick: &str, _text: &str) -> TransportResult<()> {
            Ok(())
        }

        async fn send_priv_notice(&self, _nick: &str, _text: &str) -> TransportResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = BrassRuntime::from_config(BrassConfig::default()).unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn test_transports_from_config() {
        let runtime = BrassRuntime::from_config(config()).unwrap();
        assert!(runtime.bot().transport("offline").is_ok());

        let mut runtime = runtime;
        let err = runtime
            .add_transport(RecordingTransport::named("offline"))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Transport { name, .. } if name == "offline"));
    }

    #[tokio::test]
    async fn test_fatal_transport_error_stops_runtime() {
        let mut runtime = BrassRuntime::from_config(config()).unwrap();
        runtime.add_transport(Arc::new(Rejected)).unwrap();

        let result = runtime.run_until(std::future::pending()).await;
        match result {
            Err(RuntimeError::Transport { name, source }) => {
                assert_eq!(name, "rejected");
                assert!(source.is_fatal());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_startup_wires_everything() {
        let mut runtime = BrassRuntime::from_config(config()).unwrap();
        let recording = RecordingTransport::named("test");
        runtime.add_transport(recording.clone()).unwrap();

        let dispatcher = Arc::clone(runtime.dispatcher());
        let commands = Arc::clone(runtime.commands());
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = ticks.clone();
        dispatcher.register_multi_listener(
            &[EventKind::PeriodicTick, EventKind::DailyTick],
            move |_event| {
                let t = t.clone();
                async move {
                    t.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        );

        let trigger_handle = Arc::clone(&dispatcher);
        let shutdown = async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let ignored = trigger_handle.trigger(
                Event::new(EventKind::ChatMessage)
                    .transport("test")
                    .sender("spammer", "spam@host")
                    .channel("#brass")
                    .text("help")
                    .directed(true),
            );
            assert_eq!(ignored, 0);
            trigger_handle.trigger(
                Event::new(EventKind::PrivateMessage)
                    .transport("test")
                    .sender("alice", "alice@host")
                    .channel("alice")
                    .text("help")
                    .directed(true),
            );
            tokio::time::sleep(Duration::from_millis(200)).await;
        };

        runtime.run_until(shutdown).await.unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(commands.lookup("search").is_some());
        assert!(dispatcher.listener_count(EventKind::ChatMessage) >= 2);
        let sent = recording.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].2.starts_with("Commands: "));
    }
}
