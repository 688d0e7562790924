//! brass - run the bot, or manage its accounts.
//!
//! ```bash
//! # Run with ./brass.toml (or ~/.config/brass/brass.toml)
//! brass
//!
//! # Run a specific file and profile
//! brass --config /etc/brass/brass.toml --profile prod run
//!
//! # Create an owner account; log in with "/msg brass login alice <password>"
//! BRASS_PASSWORD=secret brass add-user alice --owner
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use brass::runtime::{BrassRuntime, ConfigLoader, Storage, logging};

#[derive(Debug, Parser)]
#[command(name = "brass", version, about = "A multi-transport chat bot")]
struct Cli {
    /// Configuration file; searched for in the working and user config directories if unset.
    #[arg(short, long, global = true, env = "BRASS_CONFIG")]
    config: Option<PathBuf>,

    /// Configuration profile (dev or prod).
    #[arg(short, long, global = true, env = "BRASS_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect every configured transport and run until stopped (default).
    Run,

    /// Create an account that can log in with the `login` command.
    AddUser {
        /// Account name.
        nick: String,

        /// Account password.
        #[arg(long, env = "BRASS_PASSWORD", hide_env_values = true)]
        password: String,

        /// Grant owner rights.
        #[arg(long)]
        owner: bool,

        /// Grant admin rights.
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(profile) = &cli.profile {
        loader = loader.profile(profile);
    }
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let config = loader.load()?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let runtime = BrassRuntime::from_config(config)?;
            runtime.run().await?;
        }
        Command::AddUser {
            nick,
            password,
            owner,
            admin,
        } => {
            logging::init_from_config(&config.logging);
            let storage = Storage::open(&config.database.path).await?;
            let result = storage.add_user(&nick, &password, owner, admin).await;
            storage.close().await;
            let user = result?;
            info!(nick = %user.nick, owner = user.owner, admin = user.admin, "Account created");
            println!("Created account '{}'.", user.nick);
        }
    }

    Ok(())
}
