//! Routing directed messages to commands.
//!
//! For every directed chat or private message the router:
//!
//! 1. splits the text on whitespace and looks the first token up,
//! 2. applies the per-identity rate limit (skipped for owners, admins and
//!    private conversations),
//! 3. enforces the private-only and owner/admin gates,
//! 4. runs the handler in its own task, bracketed by the transport's
//!    work-started / work-done signals.
//!
//! Handler errors and panics are logged with the command name and never
//! reach the dispatcher.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span, warn};

use brass_core::{Bot, Event, EventDispatcher, EventKind, Privileges, panic_message};

use super::{Command, CommandCall, CommandRegistry, RateDecision, RateLimiter};
use crate::error::RegistryResult;

/// User-facing texts sent by the router.
#[derive(Debug, Clone)]
pub struct RouterTexts {
    /// Sent when a private-only command is used in a channel.
    pub needs_private: String,
    /// Sent when an unprivileged caller uses a restricted command.
    pub needs_admin: String,
    /// Sent once per channel per window when the rate limit is hit.
    pub rate_limited: String,
    /// Phrases answered to unknown commands.
    pub wrong_command: Vec<String>,
    /// Chance of answering an unknown command at all.
    pub wrong_command_probability: f64,
}

impl Default for RouterTexts {
    fn default() -> Self {
        Self {
            needs_private: "That command only works in a private message.".to_string(),
            needs_admin: "You need to be an admin to do that.".to_string(),
            rate_limited: "Slow down, too many commands. Try again in a few minutes.".to_string(),
            wrong_command: vec![
                "Huh?".to_string(),
                "I don't know that one.".to_string(),
                "Say what?".to_string(),
                "Try 'help'.".to_string(),
            ],
            wrong_command_probability: 0.6,
        }
    }
}

/// What the router did with an event.
#[derive(Debug)]
pub enum RouteOutcome {
    /// Not a directed message, or an empty one.
    Ignored,
    /// No such command.
    Unknown,
    /// Suppressed by the rate limit.
    RateLimited,
    /// Refused by an authorization gate.
    Denied,
    /// Handed to a task running the handler.
    Executed(JoinHandle<()>),
}

/// Parses directed messages and runs commands.
pub struct CommandRouter {
    registry: Arc<CommandRegistry>,
    limiter: RateLimiter,
    bot: Arc<Bot>,
    privileges: Arc<dyn Privileges>,
    texts: RouterTexts,
}

impl CommandRouter {
    /// Creates a router allowing `ceiling` uses per command and identity per window.
    pub fn new(
        registry: Arc<CommandRegistry>,
        bot: Arc<Bot>,
        privileges: Arc<dyn Privileges>,
        ceiling: u32,
        texts: RouterTexts,
    ) -> Self {
        Self {
            registry,
            limiter: RateLimiter::new(ceiling),
            bot,
            privileges,
            texts,
        }
    }

    /// The command registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Registers a command.
    pub fn register_command(&self, command: Command) -> RegistryResult<()> {
        self.registry.register(command)
    }

    /// Clears rate-limit counters and warnings.
    pub fn reset_limits(&self) {
        self.limiter.reset();
    }

    /// Subscribes the router to directed messages and the periodic reset.
    pub fn attach(self: &Arc<Self>, dispatcher: &EventDispatcher) {
        let router = Arc::clone(self);
        dispatcher.register_multi_listener(
            &[EventKind::ChatMessage, EventKind::PrivateMessage],
            move |event| {
                let router = Arc::clone(&router);
                async move {
                    router.route(event).await;
                    Ok(())
                }
            },
        );

        let router = Arc::clone(self);
        dispatcher.register_listener(EventKind::PeriodicTick, move |_event| {
            let router = Arc::clone(&router);
            async move {
                router.reset_limits();
                Ok(())
            }
        });
    }

    /// Routes one event.
    pub async fn route(&self, event: Arc<Event>) -> RouteOutcome {
        if !event.directed {
            return RouteOutcome::Ignored;
        }
        let mut tokens = event.text.split_whitespace();
        let Some(name) = tokens.next() else {
            return RouteOutcome::Ignored;
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let Some(command) = self.registry.lookup(name) else {
            debug!(command = name, nick = %event.nick, "Unknown command");
            if let Some(phrase) = self.wrong_command_phrase() {
                self.reply(&event, &phrase).await;
            }
            return RouteOutcome::Unknown;
        };

        let privileged = self.privileges.is_privileged(&event);
        if !privileged && !event.is_private() {
            let channel_key = format!("{}/{}", event.transport, event.channel);
            match self
                .limiter
                .check(command.name(), &event.identity, &channel_key)
            {
                RateDecision::Allow => {}
                RateDecision::Warn => {
                    self.notice(&event, &self.texts.rate_limited).await;
                    return RouteOutcome::RateLimited;
                }
                RateDecision::Drop => return RouteOutcome::RateLimited,
            }
        }

        if command.is_private_only() && !event.is_private() {
            self.notice(&event, &self.texts.needs_private).await;
            return RouteOutcome::Denied;
        }
        let allowed = if command.is_owner_only() {
            self.privileges.is_owner(&event)
        } else if command.is_admin_only() {
            privileged
        } else {
            true
        };
        if !allowed {
            warn!(command = %command.name(), nick = %event.nick, identity = %event.identity, "Unauthorized command use");
            self.notice(&event, &self.texts.needs_admin).await;
            return RouteOutcome::Denied;
        }

        RouteOutcome::Executed(self.execute(command, args, event))
    }

    fn execute(&self, command: Arc<Command>, args: Vec<String>, event: Arc<Event>) -> JoinHandle<()> {
        let bot = Arc::clone(&self.bot);
        let span = info_span!("command", command = %command.name(), nick = %event.nick);
        tokio::spawn(
            async move {
                bot.work_started(&event).await;
                let call = CommandCall {
                    command: command.name().to_string(),
                    args,
                    event: Arc::clone(&event),
                    bot: Arc::clone(&bot),
                };
                match AssertUnwindSafe(command.invoke(call)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(command = %command.name(), error = %e, "Command failed"),
                    Err(panic) => error!(
                        command = %command.name(),
                        panic = %panic_message(panic.as_ref()),
                        "Command panicked"
                    ),
                }
                bot.work_done(&event).await;
            }
            .instrument(span),
        )
    }

    fn wrong_command_phrase(&self) -> Option<String> {
        let probability = self.texts.wrong_command_probability.clamp(0.0, 1.0);
        let mut rng = rand::thread_rng();
        if !rng.gen_bool(probability) {
            return None;
        }
        self.texts.wrong_command.choose(&mut rng).cloned()
    }

    async fn reply(&self, event: &Event, text: &str) {
        if let Err(e) = self.bot.send_message(event, text).await {
            warn!(error = %e, "Failed to send reply");
        }
    }

    async fn notice(&self, event: &Event, text: &str) {
        if let Err(e) = self.bot.send_private_notice(event, text).await {
            warn!(error = %e, "Failed to send notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use brass_core::{Event, NoPrivileges};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Owners(Vec<&'static str>);

    impl Privileges for Owners {
        fn is_owner(&self, event: &Event) -> bool {
            self.0.contains(&event.identity.as_str())
        }

        fn is_admin(&self, _event: &Event) -> bool {
            false
        }
    }

    fn setup(
        privileges: Arc<dyn Privileges>,
        ceiling: u32,
        texts: RouterTexts,
    ) -> (Arc<CommandRouter>, Arc<RecordingTransport>) {
        let bot = Arc::new(Bot::new());
        let transport = RecordingTransport::named("test");
        bot.add_transport(transport.clone()).unwrap();
        let router = Arc::new(CommandRouter::new(
            Arc::new(CommandRegistry::new()),
            bot,
            privileges,
            ceiling,
            texts,
        ));
        (router, transport)
    }

    fn counting_command(names: &[&str], counter: &Arc<AtomicUsize>) -> Command {
        let counter = Arc::clone(counter);
        Command::new(names, move |_call| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    fn directed(text: &str) -> Arc<Event> {
        Arc::new(
            Event::new(EventKind::ChatMessage)
                .transport("test")
                .sender("eve", "eve@host")
                .channel("#rust")
                .text(text)
                .directed(true),
        )
    }

    async fn finish(outcome: RouteOutcome) -> bool {
        match outcome {
            RouteOutcome::Executed(handle) => {
                handle.await.unwrap();
                true
            }
            _ => false,
        }
    }

    #[tokio::test]
    async fn test_arguments_are_split_on_whitespace() {
        let (router, _transport) = setup(Arc::new(NoPrivileges), 10, RouterTexts::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        router
            .register_command(Command::new(&["echo"], move |call| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock() = call.args.clone();
                    Ok(())
                }
            }))
            .unwrap();

        assert!(finish(router.route(directed("ECHO  one\ttwo   three")).await).await);
        assert_eq!(*seen.lock(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_rate_limit_warns_once_and_stops_execution() {
        let (router, transport) = setup(Arc::new(NoPrivileges), 3, RouterTexts::default());
        let runs = Arc::new(AtomicUsize::new(0));
        router.register_command(counting_command(&["x"], &runs)).unwrap();

        let mut executed = 0;
        for _ in 0..8 {
            if finish(router.route(directed("x")).await).await {
                executed += 1;
            }
        }

        assert_eq!(executed, 3);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        let warnings = transport
            .sent()
            .iter()
            .filter(|(_, _, text)| *text == RouterTexts::default().rate_limited)
            .count();
        assert_eq!(warnings, 1);

        router.reset_limits();
        assert!(finish(router.route(directed("x")).await).await);
    }

    #[tokio::test]
    async fn test_owners_and_private_conversations_bypass_rate_limit() {
        let (router, _transport) = setup(Arc::new(Owners(vec!["eve@host"])), 1, RouterTexts::default());
        let runs = Arc::new(AtomicUsize::new(0));
        router.register_command(counting_command(&["x"], &runs)).unwrap();

        for _ in 0..4 {
            assert!(finish(router.route(directed("x")).await).await);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_authorization_gates() {
        let (router, transport) = setup(Arc::new(NoPrivileges), 10, RouterTexts::default());
        let runs = Arc::new(AtomicUsize::new(0));
        router
            .register_command(counting_command(&["secret"], &runs).private_only())
            .unwrap();
        router
            .register_command(counting_command(&["shutdown"], &runs).admin_only())
            .unwrap();

        assert!(matches!(router.route(directed("secret")).await, RouteOutcome::Denied));
        assert!(matches!(router.route(directed("shutdown")).await, RouteOutcome::Denied));

        let private = Arc::new(
            Event::new(EventKind::PrivateMessage)
                .transport("test")
                .sender("eve", "eve@host")
                .channel("eve")
                .text("secret")
                .directed(true),
        );
        assert!(finish(router.route(private).await).await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let texts = RouterTexts::default();
        let sent = transport.sent();
        assert_eq!(sent[0], ("privnotice".into(), "eve".into(), texts.needs_private));
        assert_eq!(sent[1], ("privnotice".into(), "eve".into(), texts.needs_admin));
    }

    #[tokio::test]
    async fn test_unknown_command_phrases() {
        let texts = RouterTexts {
            wrong_command: vec!["Huh?".to_string()],
            wrong_command_probability: 1.0,
            ..RouterTexts::default()
        };
        let (router, transport) = setup(Arc::new(NoPrivileges), 10, texts);
        assert!(matches!(router.route(directed("nope")).await, RouteOutcome::Unknown));
        assert_eq!(transport.sent(), vec![("msg".into(), "#rust".into(), "Huh?".into())]);

        let silent = RouterTexts {
            wrong_command_probability: 0.0,
            ..RouterTexts::default()
        };
        let (router, transport) = setup(Arc::new(NoPrivileges), 10, silent);
        assert!(matches!(router.route(directed("nope")).await, RouteOutcome::Unknown));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_contained_and_bracketed() {
        let (router, transport) = setup(Arc::new(NoPrivileges), 10, RouterTexts::default());
        router
            .register_command(Command::new(&["boom"], |call| async move {
                assert!(call.args.is_empty(), "handler exploded");
                Ok(())
            }))
            .unwrap();
        router
            .register_command(Command::new(&["fail"], |_call| async {
                Err(anyhow::anyhow!("backend down"))
            }))
            .unwrap();

        assert!(finish(router.route(directed("boom now")).await).await);
        assert!(finish(router.route(directed("fail")).await).await);
        assert_eq!(transport.work_signals(), (2, 2));
    }

    #[tokio::test]
    async fn test_undirected_messages_are_ignored() {
        let (router, _transport) = setup(Arc::new(NoPrivileges), 10, RouterTexts::default());
        let event = Arc::new(Event::new(EventKind::ChatMessage).text("x"));
        assert!(matches!(router.route(event).await, RouteOutcome::Ignored));
        assert!(matches!(router.route(directed("   ")).await, RouteOutcome::Ignored));
    }
}
