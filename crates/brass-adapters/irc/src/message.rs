//! IRC line parsing.

/// Source of a message: `nick!user@host` or a server name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefix {
    /// Nickname, or the server name for server messages.
    pub nick: String,
    /// User name, empty for server messages.
    pub user: String,
    /// Host, empty for server messages.
    pub host: String,
}

impl Prefix {
    /// Parses a prefix without its leading `:`.
    pub fn parse(raw: &str) -> Self {
        let (nick, rest) = raw.split_once('!').unwrap_or((raw, ""));
        let (user, host) = rest.split_once('@').unwrap_or((rest, ""));
        Self {
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
        }
    }

    /// Durable identity (`user@host`), `None` for server prefixes.
    pub fn identity(&self) -> Option<String> {
        (!self.user.is_empty() && !self.host.is_empty())
            .then(|| format!("{}@{}", self.user, self.host))
    }
}

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message source.
    pub prefix: Option<Prefix>,
    /// Upper-cased command or numeric.
    pub command: String,
    /// Parameters, trailing parameter last.
    pub params: Vec<String>,
}

impl Message {
    /// Parses a line, ignoring IRCv3 tags. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        if rest.starts_with('@') {
            rest = rest.split_once(' ')?.1;
        }
        rest = rest.trim_start_matches(' ');

        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (raw, tail) = stripped.split_once(' ')?;
            prefix = Some(Prefix::parse(raw));
            rest = tail.trim_start_matches(' ');
        }

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, tail)) => {
                    params.push(param.to_string());
                    rest = tail;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Parameter at `index`, empty if absent.
    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map(String::as_str).unwrap_or_default()
    }

    /// Last parameter, empty if there are none.
    pub fn trailing(&self) -> &str {
        self.params.last().map(String::as_str).unwrap_or_default()
    }

    /// Nickname of the source, empty if there is no prefix.
    pub fn source_nick(&self) -> &str {
        self.prefix.as_ref().map(|p| p.nick.as_str()).unwrap_or_default()
    }
}

/// Returns true if `target` names a channel.
pub fn is_channel(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}

/// Result of looking for CTCP framing in a message body.
#[derive(Debug, PartialEq, Eq)]
pub enum Ctcp<'a> {
    /// Ordinary text.
    Plain(&'a str),
    /// `ACTION` payload ("/me").
    Action(&'a str),
    /// Any other CTCP request.
    Other,
}

/// Unwraps CTCP framing (`\x01VERB args\x01`).
pub fn parse_ctcp(text: &str) -> Ctcp<'_> {
    let Some(inner) = text.strip_prefix('\u{1}') else {
        return Ctcp::Plain(text);
    };
    let inner = inner.strip_suffix('\u{1}').unwrap_or(inner);
    let (verb, args) = inner.split_once(' ').unwrap_or((inner, ""));
    if verb.eq_ignore_ascii_case("ACTION") {
        Ctcp::Action(args)
    } else {
        Ctcp::Other
    }
}

/// Strips a bot-addressing prefix.
///
/// `text` is addressed to the bot when it starts with `nick` followed by one
/// of `,:; `, or with `command_prefix`. Returns the remaining text.
pub fn strip_address<'a>(text: &'a str, nick: &str, command_prefix: &str) -> Option<&'a str> {
    if !nick.is_empty()
        && text.len() > nick.len()
        && text.is_char_boundary(nick.len())
        && text[..nick.len()].eq_ignore_ascii_case(nick)
    {
        let rest = &text[nick.len()..];
        if rest.starts_with([',', ':', ';', ' ']) {
            return Some(rest[1..].trim_start());
        }
    }
    if !command_prefix.is_empty() {
        if let Some(rest) = text.strip_prefix(command_prefix) {
            return Some(rest);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg() {
        let msg = Message::parse(":alice!al@example.org PRIVMSG #rust :hello there\r\n").unwrap();
        let prefix = msg.prefix.clone().unwrap();
        assert_eq!(prefix.nick, "alice");
        assert_eq!(prefix.identity().as_deref(), Some("al@example.org"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#rust", "hello there"]);
        assert_eq!(msg.trailing(), "hello there");
    }

    #[test]
    fn test_parse_without_prefix_and_with_tags() {
        let ping = Message::parse("PING :irc.example.org").unwrap();
        assert!(ping.prefix.is_none());
        assert_eq!(ping.command, "PING");
        assert_eq!(ping.trailing(), "irc.example.org");

        let tagged = Message::parse("@time=2024-01-01T00:00:00Z :srv 001 brass :Welcome").unwrap();
        assert_eq!(tagged.command, "001");
        assert_eq!(tagged.param(0), "brass");
        assert_eq!(tagged.prefix.unwrap().identity(), None);
    }

    #[test]
    fn test_parse_middle_params() {
        let msg = Message::parse(":op!o@h MODE #rust +ov alice bob").unwrap();
        assert_eq!(msg.params, vec!["#rust", "+ov", "alice", "bob"]);
        assert_eq!(msg.param(9), "");
        assert!(Message::parse("").is_none());
    }

    #[test]
    fn test_ctcp() {
        assert_eq!(parse_ctcp("\u{1}ACTION waves\u{1}"), Ctcp::Action("waves"));
        assert_eq!(parse_ctcp("\u{1}VERSION\u{1}"), Ctcp::Other);
        assert_eq!(parse_ctcp("hi"), Ctcp::Plain("hi"));
    }

    #[test]
    fn test_strip_address() {
        assert_eq!(strip_address("brass: help", "brass", "!"), Some("help"));
        assert_eq!(strip_address("Brass, help", "brass", "!"), Some("help"));
        assert_eq!(strip_address("brass; help", "brass", "!"), Some("help"));
        assert_eq!(strip_address("brass help", "brass", "!"), Some("help"));
        assert_eq!(strip_address("!help me", "brass", "!"), Some("help me"));
        assert_eq!(strip_address("brassy help", "brass", "!"), None);
        assert_eq!(strip_address("hello brass", "brass", "!"), None);
    }

    #[test]
    fn test_is_channel() {
        assert!(is_channel("#rust"));
        assert!(is_channel("&local"));
        assert!(!is_channel("alice"));
    }
}
