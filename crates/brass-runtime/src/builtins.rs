//! Commands every bot has: `help`, `more`, `search`, `login`, `logout`.
//!
//! They are registered through the same [`Extension`] API as any plugin.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use brass_core::Privileges;
use brass_framework::{
    Command, CommandCall, CommandRegistry, Extension, ExtensionContext, Grant, MoreStash,
    SessionStore,
};

use crate::storage::Storage;

/// Results returned by `search`.
pub const SEARCH_LIMIT: u32 = 3;

/// The built-in command set.
pub struct Builtins {
    storage: Arc<Storage>,
}

impl Builtins {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Extension for Builtins {
    fn name(&self) -> &str {
        "builtins"
    }

    async fn init(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
        ctx.register_command(help(Arc::clone(&ctx.commands), Arc::clone(&ctx.sessions)))?;
        ctx.register_command(more(Arc::clone(&ctx.stash)))?;
        ctx.register_command(search(Arc::clone(&self.storage)))?;
        ctx.register_command(login(Arc::clone(&self.storage), Arc::clone(&ctx.sessions)))?;
        ctx.register_command(logout(Arc::clone(&ctx.sessions)))?;
        Ok(())
    }
}

fn help(registry: Arc<CommandRegistry>, sessions: Arc<SessionStore>) -> Command {
    Command::new(&["help", "commands"], move |call: CommandCall| {
        let registry = Arc::clone(&registry);
        let sessions = Arc::clone(&sessions);
        async move {
            if let Some(name) = call.args.first() {
                let text = match registry.lookup(name) {
                    Some(cmd) => {
                        let usage = if cmd.usage_text().is_empty() {
                            cmd.name()
                        } else {
                            cmd.usage_text()
                        };
                        if cmd.help_text().is_empty() {
                            format!("Usage: {usage}")
                        } else {
                            format!("Usage: {usage} - {}", cmd.help_text())
                        }
                    }
                    None => format!("No such command: {name}"),
                };
                call.notice(&text).await?;
                return Ok(());
            }

            let owner = sessions.is_owner(&call.event);
            let privileged = sessions.is_privileged(&call.event);
            let mut names: Vec<String> = registry
                .commands()
                .iter()
                .filter(|cmd| {
                    if cmd.is_owner_only() {
                        owner
                    } else if cmd.is_admin_only() {
                        privileged
                    } else {
                        true
                    }
                })
                .map(|cmd| cmd.name().to_string())
                .collect();
            names.sort();
            call.notice(&format!("Commands: {}", names.join(", "))).await?;
            Ok(())
        }
    })
    .usage("help [command]")
    .help("Lists commands, or shows how to use one.")
}

fn more(stash: Arc<MoreStash>) -> Command {
    Command::new(&["more"], move |call: CommandCall| {
        let stash = Arc::clone(&stash);
        async move {
            match stash.take(&call.event.transport, &call.event.channel) {
                Some(text) => call.reply(&text).await?,
                None => call.notice("Nothing more to tell.").await?,
            }
            Ok(())
        }
    })
    .help("Tells more about the last announced link.")
}

fn search(storage: Arc<Storage>) -> Command {
    Command::new(&["search", "find"], move |call: CommandCall| {
        let storage = Arc::clone(&storage);
        async move {
            let terms = call.rest();
            if terms.is_empty() {
                call.notice("Usage: search <terms>").await?;
                return Ok(());
            }
            let results = storage.search_links(&terms, SEARCH_LIMIT).await?;
            if results.is_empty() {
                call.reply("No links found.").await?;
            }
            for link in results {
                call.reply(&link.line()).await?;
            }
            Ok(())
        }
    })
    .usage("search <terms>")
    .help("Searches links posted earlier, newest first.")
}

fn login(storage: Arc<Storage>, sessions: Arc<SessionStore>) -> Command {
    Command::new(&["login", "identify"], move |call: CommandCall| {
        let storage = Arc::clone(&storage);
        let sessions = Arc::clone(&sessions);
        async move {
            let [nick, password] = call.args.as_slice() else {
                call.reply("Usage: login <nick> <password>").await?;
                return Ok(());
            };
            if call.event.identity.is_empty() {
                call.reply("Login failed.").await?;
                return Ok(());
            }

            match storage.verify_user(nick, password).await? {
                Some(user) => {
                    sessions.login(
                        &call.event.identity,
                        Grant {
                            account: user.nick.clone(),
                            owner: user.owner,
                            admin: user.admin,
                        },
                    );
                    call.reply(&format!("Logged in as {}.", user.nick)).await?;
                }
                None => {
                    warn!(nick = %call.event.nick, identity = %call.event.identity, account = %nick, "Failed login");
                    call.reply("Login failed.").await?;
                }
            }
            Ok(())
        }
    })
    .private_only()
    .usage("login <nick> <password>")
    .help("Logs in to gain owner or admin rights.")
}

fn logout(sessions: Arc<SessionStore>) -> Command {
    Command::new(&["logout"], move |call: CommandCall| {
        let sessions = Arc::clone(&sessions);
        async move {
            if sessions.logout(&call.event.identity) {
                info!(identity = %call.event.identity, "Logged out");
                call.notice("Logged out.").await?;
            } else {
                call.notice("You were not logged in.").await?;
            }
            Ok(())
        }
    })
    .help("Drops owner or admin rights gained by login.")
}
