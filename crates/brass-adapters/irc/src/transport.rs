//! The IRC transport.
//!
//! One [`IrcTransport`] owns one server connection. [`Transport::run`] loops
//! forever: connect, register, translate inbound lines into events, write
//! queued outbound lines, and on any I/O error reconnect after a quadratic
//! backoff delay.
//!
//! Outbound lines are queued on a channel owned by the transport rather than
//! by the socket, so anything sent while disconnected goes out after the next
//! successful registration.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::{debug, error, info, trace, warn};

use brass_core::{
    Event, EventDispatcher, EventKind, Format, Transport, TransportError, TransportResult,
    TransportState,
};
use brass_transport::{Backoff, FloodSemaphore, MAX_LINE_BYTES, split_message};

use crate::config::IrcConfig;
use crate::message::{Ctcp, Message, is_channel, parse_ctcp, strip_address};

/// Longest inbound line accepted before the connection is considered broken.
const MAX_INBOUND_LINE: usize = 16 * 1024;

/// IRC transport.
pub struct IrcTransport {
    config: IrcConfig,
    state: RwLock<TransportState>,
    current_nick: RwLock<String>,
    channels: RwLock<HashSet<String>>,
    /// Channels the bot was kicked from and has not rejoined yet.
    kicked: Mutex<HashSet<String>>,
    flood: Arc<FloodSemaphore>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl IrcTransport {
    /// Creates a disconnected transport.
    pub fn new(config: IrcConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            current_nick: RwLock::new(config.nick.clone()),
            flood: Arc::new(FloodSemaphore::new(config.flood_capacity)),
            config,
            state: RwLock::new(TransportState::Disconnected),
            channels: RwLock::new(HashSet::new()),
            kicked: Mutex::new(HashSet::new()),
            outbound_tx,
            outbound_rx: tokio::sync::Mutex::new(outbound_rx),
        }
    }

    /// Transport configuration.
    pub fn config(&self) -> &IrcConfig {
        &self.config
    }

    /// The nickname currently in use.
    pub fn current_nick(&self) -> String {
        self.current_nick.read().clone()
    }

    fn set_state(&self, state: TransportState) {
        *self.state.write() = state;
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .transport(&self.config.name)
            .format(Format::IrcControlCodes)
    }

    fn schedule_rejoin(&self, channel: &str) {
        let delay = self.config.rejoin_delay();
        let line = self.config.join_line(channel);
        let tx = self.outbound_tx.clone();
        debug!(transport = %self.config.name, channel, delay_secs = delay.as_secs(), "Rejoin scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(line);
        });
    }

    /// Splits, rate-limits and queues one outbound command.
    async fn queue(&self, command: &str, target: &str, text: &str) -> TransportResult<()> {
        if target.is_empty() || target.contains([' ', '\r', '\n']) {
            return Err(TransportError::SendFailed(format!(
                "invalid target '{}'",
                target.escape_debug()
            )));
        }
        for line in split_message(text, MAX_LINE_BYTES) {
            self.flood.acquire().await;
            self.outbound_tx
                .send(format!("{command} {target} :{line}"))
                .map_err(|_| TransportError::SendFailed("outbound queue closed".to_string()))?;
        }
        Ok(())
    }

    // =========================================================================
    // Session
    // =========================================================================

    async fn session(
        &self,
        dispatcher: &EventDispatcher,
        outbound: &mut mpsc::UnboundedReceiver<String>,
        backoff: &mut Backoff,
    ) -> TransportResult<()> {
        let addr = self.config.address();
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        let (reader, mut writer) = stream.into_split();
        let mut lines = FramedRead::new(
            reader,
            AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\r\n".to_vec(), MAX_INBOUND_LINE),
        );
        info!(transport = %self.config.name, addr = %addr, "Connected, registering");

        *self.current_nick.write() = self.config.nick.clone();
        if let Some(password) = &self.config.password {
            write_line(&mut writer, &format!("PASS {password}")).await?;
        }
        write_line(&mut writer, &format!("NICK {}", self.config.nick)).await?;
        write_line(
            &mut writer,
            &format!("USER {} 0 * :{}", self.config.user_name(), self.config.real_name),
        )
        .await?;

        let idle = self.config.idle_timeout();
        let mut deadline = Instant::now() + idle;
        loop {
            let registered = *self.state.read() == TransportState::Connected;
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(TransportError::IdleTimeout { secs: idle.as_secs() });
                }
                frame = lines.next() => {
                    let bytes = match frame {
                        None => {
                            return Err(TransportError::ConnectionClosed {
                                reason: "server closed the connection".to_string(),
                            });
                        }
                        Some(Err(e)) => return Err(TransportError::Io(e.to_string())),
                        Some(Ok(bytes)) => bytes,
                    };
                    deadline = Instant::now() + idle;

                    let raw = String::from_utf8_lossy(&bytes);
                    let Some(message) = Message::parse(&raw) else {
                        continue;
                    };
                    trace!(transport = %self.config.name, line = %raw.trim_end(), "<<");
                    if message.command == "001" {
                        backoff.reset();
                    }
                    for reply in self.handle(&message, dispatcher)? {
                        write_line(&mut writer, &reply).await?;
                    }
                }
                Some(line) = outbound.recv(), if registered => {
                    write_line(&mut writer, &line).await?;
                }
            }
        }
    }

    // =========================================================================
    // Inbound translation
    // =========================================================================

    /// Applies one inbound message and returns the protocol replies it needs.
    fn handle(
        &self,
        message: &Message,
        dispatcher: &EventDispatcher,
    ) -> TransportResult<Vec<String>> {
        let mut replies = Vec::new();
        match message.command.as_str() {
            "PING" => replies.push(format!("PONG :{}", message.trailing())),
            "001" => {
                if !message.param(0).is_empty() {
                    *self.current_nick.write() = message.param(0).to_string();
                }
                self.set_state(TransportState::Connected);
                info!(transport = %self.config.name, nick = %self.current_nick(), "Registered");
                replies.extend(self.config.channels.iter().map(|c| self.config.join_line(c)));
                dispatcher.trigger(self.event(EventKind::TransportConnected));
            }
            "433" => {
                let nick = {
                    let mut current = self.current_nick.write();
                    current.push('_');
                    current.clone()
                };
                warn!(transport = %self.config.name, nick = %nick, "Nickname in use, retrying");
                replies.push(format!("NICK {nick}"));
            }
            "432" => {
                return Err(TransportError::InvalidNickname {
                    nick: message.param(1).to_string(),
                    reason: message.trailing().to_string(),
                });
            }
            "471" | "473" | "474" | "475" => {
                let channel = message.param(1);
                warn!(
                    transport = %self.config.name,
                    channel,
                    code = %message.command,
                    reason = message.trailing(),
                    "Join rejected"
                );
                if message.command == "474" {
                    dispatcher.trigger(self.event(EventKind::ChannelBanned).channel(channel));
                }
                self.schedule_rejoin(channel);
            }
            "JOIN" => self.on_join(message, dispatcher),
            "PART" => {
                let channel = message.param(0);
                if self.nick_is_me(message.source_nick()) {
                    self.channels.write().remove(channel);
                    info!(transport = %self.config.name, channel, "Left channel");
                    dispatcher.trigger(self.sender_event(EventKind::ChannelPart, message).channel(channel));
                }
            }
            "KICK" => {
                let channel = message.param(0);
                if self.nick_is_me(message.param(1)) {
                    self.channels.write().remove(channel);
                    self.kicked.lock().insert(channel.to_string());
                    warn!(
                        transport = %self.config.name,
                        channel,
                        by = message.source_nick(),
                        reason = message.param(2),
                        "Kicked"
                    );
                    dispatcher.trigger(
                        self.sender_event(EventKind::ChannelKicked, message)
                            .channel(channel)
                            .text(message.param(2)),
                    );
                    self.schedule_rejoin(channel);
                }
            }
            "MODE" => {
                let channel = message.param(0);
                let modes = message.param(1);
                if is_channel(channel) && modes.contains('o') {
                    let text = message.params[1..].join(" ");
                    dispatcher.trigger(
                        self.sender_event(EventKind::ChannelOpsChange, message)
                            .channel(channel)
                            .text(text),
                    );
                }
            }
            "NICK" => {
                if self.nick_is_me(message.source_nick()) {
                    let nick = message.param(0).to_string();
                    info!(transport = %self.config.name, nick = %nick, "Nickname changed");
                    *self.current_nick.write() = nick;
                }
            }
            "PRIVMSG" | "NOTICE" => self.on_text(message, dispatcher),
            _ => {}
        }
        Ok(replies)
    }

    fn sender_event(&self, kind: EventKind, message: &Message) -> Event {
        let (nick, identity) = match &message.prefix {
            Some(prefix) => (prefix.nick.clone(), prefix.identity().unwrap_or_default()),
            None => (String::new(), String::new()),
        };
        self.event(kind).sender(nick, identity)
    }

    fn on_join(&self, message: &Message, dispatcher: &EventDispatcher) {
        if !self.nick_is_me(message.source_nick()) {
            return;
        }
        let channel = message.param(0);
        self.channels.write().insert(channel.to_string());
        let kind = if self.kicked.lock().remove(channel) {
            EventKind::ChannelRejoinedAfterKick
        } else {
            EventKind::ChannelJoined
        };
        info!(transport = %self.config.name, channel, "Joined channel");
        dispatcher.trigger(self.sender_event(kind, message).channel(channel));
    }

    fn on_text(&self, message: &Message, dispatcher: &EventDispatcher) {
        let Some(prefix) = &message.prefix else {
            return;
        };
        // Server notices carry no user@host and are not chat.
        let Some(identity) = prefix.identity() else {
            return;
        };
        if self.nick_is_me(&prefix.nick) {
            return;
        }

        let text = match parse_ctcp(message.trailing()) {
            Ctcp::Plain(text) | Ctcp::Action(text) => text,
            Ctcp::Other => return,
        };
        let target = message.param(0);
        let notice = message.command == "NOTICE";
        let nick = self.current_nick();

        let event = if is_channel(target) {
            let kind = if notice {
                EventKind::ChatNotice
            } else {
                EventKind::ChatMessage
            };
            let addressed = if notice {
                None
            } else {
                strip_address(text, &nick, &self.config.command_prefix)
            };
            self.event(kind)
                .channel(target)
                .text(addressed.unwrap_or(text))
                .directed(addressed.is_some())
        } else {
            if notice {
                return;
            }
            let text = strip_address(text, &nick, &self.config.command_prefix).unwrap_or(text);
            self.event(EventKind::PrivateMessage)
                .channel(&prefix.nick)
                .text(text)
                .directed(true)
        };

        dispatcher.trigger(event.sender(&prefix.nick, identity));
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> TransportResult<()> {
    trace!(line, ">>");
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    Ok(())
}

#[async_trait]
impl Transport for IrcTransport {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn format(&self) -> Format {
        Format::IrcControlCodes
    }

    fn state(&self) -> TransportState {
        *self.state.read()
    }

    async fn run(&self, dispatcher: Arc<EventDispatcher>) -> TransportResult<()> {
        let mut outbound = self.outbound_rx.try_lock().map_err(|_| {
            TransportError::InvalidConfig(format!("transport '{}' is already running", self.config.name))
        })?;
        let drain = self.flood.spawn_drain(self.config.antiflood_delay());
        let mut backoff = Backoff::new();

        let result = loop {
            let delay = backoff.next_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            info!(
                transport = %self.config.name,
                attempt = backoff.retry_count(),
                delay_secs = delay.as_secs(),
                "Connecting"
            );
            self.set_state(TransportState::Connecting);

            let outcome = self.session(&dispatcher, &mut outbound, &mut backoff).await;
            self.set_state(TransportState::Disconnected);
            self.channels.write().clear();
            match outcome {
                Err(e) if e.is_fatal() => {
                    error!(transport = %self.config.name, error = %e, "Fatal transport error");
                    break Err(e);
                }
                Err(e) => warn!(transport = %self.config.name, error = %e, "Connection lost"),
                Ok(()) => {}
            }
        };

        drain.abort();
        result
    }

    fn on_channels(&self) -> HashSet<String> {
        self.channels.read().clone()
    }

    fn nick_is_me(&self, name: &str) -> bool {
        !name.is_empty() && self.current_nick.read().eq_ignore_ascii_case(name)
    }

    async fn send_message(&self, target: &str, text: &str) -> TransportResult<()> {
        self.queue("PRIVMSG", target, text).await
    }

    async fn send_notice(&self, target: &str, text: &str) -> TransportResult<()> {
        self.queue("NOTICE", target, text).await
    }

    async fn send_priv_message(&self, nick: &str, text: &str) -> TransportResult<()> {
        self.queue("PRIVMSG", nick, text).await
    }

    async fn send_priv_notice(&self, nick: &str, text: &str) -> TransportResult<()> {
        self.queue("NOTICE", nick, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    fn transport() -> IrcTransport {
        IrcTransport::new(IrcConfig {
            name: "test".to_string(),
            server: "127.0.0.1".to_string(),
            nick: "brass".to_string(),
            channels: vec!["#rust".to_string()],
            rejoin_delay_secs: 1,
            ..IrcConfig::default()
        })
    }

    fn recorder(dispatcher: &EventDispatcher, kinds: &[EventKind]) -> Arc<SyncMutex<Vec<Event>>> {
        let seen = Arc::new(SyncMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.register_multi_listener(kinds, move |event: Arc<Event>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push((*event).clone());
                Ok(())
            }
        });
        seen
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn handle(t: &IrcTransport, d: &EventDispatcher, line: &str) -> TransportResult<Vec<String>> {
        t.handle(&Message::parse(line).unwrap(), d)
    }

    #[tokio::test]
    async fn test_ping_and_nick_collision() {
        let t = transport();
        let d = EventDispatcher::new();

        assert_eq!(handle(&t, &d, "PING :abc").unwrap(), vec!["PONG :abc"]);
        assert_eq!(
            handle(&t, &d, ":srv 433 * brass :Nickname is already in use").unwrap(),
            vec!["NICK brass_"]
        );
        assert!(t.nick_is_me("BRASS_"));
    }

    #[tokio::test]
    async fn test_invalid_nickname_is_fatal() {
        let t = transport();
        let d = EventDispatcher::new();
        let err = handle(&t, &d, ":srv 432 * 0brass :Erroneous Nickname").unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_directed_channel_message() {
        let t = transport();
        let d = EventDispatcher::new();
        let seen = recorder(&d, &[EventKind::ChatMessage, EventKind::PrivateMessage]);

        handle(&t, &d, ":alice!al@host PRIVMSG #rust :brass: search tokio").unwrap();
        handle(&t, &d, ":alice!al@host PRIVMSG #rust :!help").unwrap();
        handle(&t, &d, ":alice!al@host PRIVMSG #rust :just chatting").unwrap();
        handle(&t, &d, ":alice!al@host PRIVMSG brass :login alice pw").unwrap();
        settle().await;

        let mut seen = seen.lock().clone();
        seen.sort_by(|a, b| a.text.cmp(&b.text));
        let texts: Vec<(&str, bool)> = seen.iter().map(|e| (e.text.as_str(), e.directed)).collect();
        assert_eq!(
            texts,
            vec![
                ("help", true),
                ("just chatting", false),
                ("login alice pw", true),
                ("search tokio", true),
            ]
        );
        let private = seen.iter().find(|e| e.is_private()).unwrap();
        assert_eq!(private.channel, "alice");
        assert_eq!(private.identity, "al@host");
        assert_eq!(private.transport, "test");
    }

    #[tokio::test]
    async fn test_ctcp_action_and_server_notices() {
        let t = transport();
        let d = EventDispatcher::new();
        let seen = recorder(&d, &[EventKind::ChatMessage, EventKind::ChatNotice]);

        handle(&t, &d, ":alice!al@host PRIVMSG #rust :\u{1}ACTION waves\u{1}").unwrap();
        handle(&t, &d, ":alice!al@host PRIVMSG #rust :\u{1}VERSION\u{1}").unwrap();
        handle(&t, &d, ":irc.server NOTICE * :*** Looking up your hostname").unwrap();
        settle().await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "waves");
    }

    #[tokio::test(start_paused = true)]
    async fn test_kick_rejoin_cycle() {
        let t = transport();
        let d = EventDispatcher::new();
        let seen = recorder(
            &d,
            &[
                EventKind::ChannelJoined,
                EventKind::ChannelKicked,
                EventKind::ChannelRejoinedAfterKick,
            ],
        );

        handle(&t, &d, ":brass!b@host JOIN #rust").unwrap();
        assert!(t.on_channels().contains("#rust"));
        handle(&t, &d, ":op!o@host KICK #rust brass :behave").unwrap();
        assert!(t.on_channels().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let queued = t.outbound_rx.lock().await.try_recv().unwrap();
        assert_eq!(queued, "JOIN #rust");

        handle(&t, &d, ":brass!b@host JOIN #rust").unwrap();
        settle().await;

        let kinds: Vec<EventKind> = seen.lock().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ChannelJoined,
                EventKind::ChannelKicked,
                EventKind::ChannelRejoinedAfterKick,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ban_triggers_event_and_retry() {
        let t = transport();
        let d = EventDispatcher::new();
        let seen = recorder(&d, &[EventKind::ChannelBanned]);

        handle(&t, &d, ":srv 474 brass #rust :Cannot join channel (+b)").unwrap();
        handle(&t, &d, ":srv 471 brass #full :Cannot join channel (+l)").unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let mut rx = t.outbound_rx.lock().await;
        let mut joins = vec![rx.try_recv().unwrap(), rx.try_recv().unwrap()];
        joins.sort();
        assert_eq!(joins, vec!["JOIN #full", "JOIN #rust"]);
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_ops_change_and_own_nick_change() {
        let t = transport();
        let d = EventDispatcher::new();
        let seen = recorder(&d, &[EventKind::ChannelOpsChange]);

        handle(&t, &d, ":op!o@host MODE #rust +o brass").unwrap();
        handle(&t, &d, ":op!o@host MODE #rust +v alice").unwrap();
        handle(&t, &d, ":brass!b@host NICK brass2").unwrap();
        settle().await;

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].text, "+o brass");
        assert!(t.nick_is_me("brass2"));
        assert!(!t.nick_is_me("brass"));
    }

    #[tokio::test]
    async fn test_long_messages_are_split() {
        let t = transport();
        t.send_message("#rust", &"x".repeat(500)).await.unwrap();
        let mut rx = t.outbound_rx.lock().await;
        assert_eq!(rx.try_recv().unwrap().len(), "PRIVMSG #rust :".len() + 440);
        assert_eq!(rx.try_recv().unwrap(), format!("PRIVMSG #rust :{}", "x".repeat(60)));
        assert!(t.send_message("bad target", "hi").await.is_err());
    }

    #[tokio::test]
    async fn test_session_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let t = Arc::new(IrcTransport::new(IrcConfig {
            name: "local".to_string(),
            server: "127.0.0.1".to_string(),
            port,
            nick: "brass".to_string(),
            channels: vec!["#rust".to_string()],
            ..IrcConfig::default()
        }));
        let d = Arc::new(EventDispatcher::new());
        let seen = recorder(&d, &[EventKind::ChatMessage]);

        // Queued before the connection exists; delivered after registration.
        t.send_message("#rust", "early bird").await.unwrap();

        let runner = {
            let t = Arc::clone(&t);
            let d = Arc::clone(&d);
            tokio::spawn(async move { t.run(d).await })
        };

        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();

        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NICK brass");
        assert!(lines.next_line().await.unwrap().unwrap().starts_with("USER brass 0 *"));

        write
            .write_all(b":srv 001 brass :Welcome\r\n:alice!al@host PRIVMSG #rust :brass: hi\r\n")
            .await
            .unwrap();

        let mut received = Vec::new();
        while received.len() < 2 {
            received.push(lines.next_line().await.unwrap().unwrap());
        }
        received.sort();
        assert_eq!(received, vec!["JOIN #rust", "PRIVMSG #rust :early bird"]);
        assert_eq!(t.state(), TransportState::Connected);

        settle().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let seen = seen.lock().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "hi");
        assert!(seen[0].directed);

        runner.abort();
    }

    fn local_transport(port: u16, idle_timeout_secs: u64) -> Arc<IrcTransport> {
        Arc::new(IrcTransport::new(IrcConfig {
            name: "local".to_string(),
            server: "127.0.0.1".to_string(),
            port,
            nick: "brass".to_string(),
            channels: vec!["#rust".to_string()],
            idle_timeout_secs,
            ..IrcConfig::default()
        }))
    }

    /// Accepts one connection, reads the registration and welcomes the bot.
    async fn register(listener: &TcpListener) -> TcpStream {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let mut line = String::new();
        while !line.starts_with("USER ") {
            line.clear();
            reader.read_line(&mut line).await.unwrap();
        }
        reader.write_all(b":srv 001 brass :Welcome\r\n").await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim_end(), "JOIN #rust");
        reader.into_inner()
    }

    #[tokio::test]
    async fn test_reconnects_with_quadratic_backoff_after_drop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let t = local_transport(listener.local_addr().unwrap().port(), 300);
        let d = Arc::new(EventDispatcher::new());
        let runner = {
            let t = Arc::clone(&t);
            let d = Arc::clone(&d);
            tokio::spawn(async move { t.run(d).await })
        };

        let socket = register(&listener).await;
        assert_eq!(t.state(), TransportState::Connected);
        let dropped_at = Instant::now();
        drop(socket);

        // Each attempt is refused right after accept, so the counter keeps growing.
        let mut offsets = Vec::new();
        for _ in 0..3 {
            let (socket, _) = listener.accept().await.unwrap();
            offsets.push(dropped_at.elapsed());
            drop(socket);
        }

        assert!(offsets[0] < Duration::from_millis(900), "{offsets:?}");
        assert!(offsets[1] >= Duration::from_secs(1), "{offsets:?}");
        assert!(offsets[1] < Duration::from_millis(2500), "{offsets:?}");
        assert!(offsets[2] >= Duration::from_secs(5), "{offsets:?}");
        assert!(offsets[2] < Duration::from_secs(7), "{offsets:?}");
        assert!(!runner.is_finished());

        runner.abort();
    }

    #[tokio::test]
    async fn test_silent_server_hits_idle_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let t = local_transport(listener.local_addr().unwrap().port(), 1);
        let d = EventDispatcher::new();

        let server = tokio::spawn(async move {
            let socket = register(&listener).await;
            tokio::time::sleep(Duration::from_secs(3)).await;
            drop(socket);
        });

        let mut outbound = t.outbound_rx.try_lock().unwrap();
        let mut backoff = Backoff::new();
        backoff.next_delay();
        let started = Instant::now();
        let err = t.session(&d, &mut outbound, &mut backoff).await.unwrap_err();

        assert!(matches!(err, TransportError::IdleTimeout { secs: 1 }));
        assert!(!err.is_fatal());
        assert!(started.elapsed() >= Duration::from_secs(1));
        // The welcome counted as a successful connection.
        assert_eq!(backoff.retry_count(), 0);
        server.abort();
    }

    #[tokio::test]
    async fn test_idle_timeout_leads_to_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let t = local_transport(listener.local_addr().unwrap().port(), 1);
        let d = Arc::new(EventDispatcher::new());
        let runner = {
            let t = Arc::clone(&t);
            let d = Arc::clone(&d);
            tokio::spawn(async move { t.run(d).await })
        };

        // Kept open but silent.
        let _first = register(&listener).await;
        let welcomed_at = Instant::now();

        let (_second, _) = listener.accept().await.unwrap();
        let elapsed = welcomed_at.elapsed();
        assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");

        runner.abort();
    }
}
