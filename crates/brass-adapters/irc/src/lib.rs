//! # Brass IRC Adapter
//!
//! The reference line-protocol transport for Brass.
//!
//! ## Inbound mapping
//!
//! | Wire | Event kind |
//! |------|------------|
//! | `001` | transport-connected (after joining configured channels) |
//! | `PRIVMSG #chan` | chat-message (`directed` when addressed to the bot) |
//! | `NOTICE #chan` | chat-notice |
//! | `PRIVMSG <bot>` | private-message (always directed) |
//! | own `JOIN` | channel-joined, or channel-rejoined-after-kick |
//! | own `PART` | channel-part |
//! | `KICK` of the bot | channel-kicked, then a delayed rejoin |
//! | `474` | channel-banned, then a delayed rejoin |
//! | `MODE` with `o` | channel-ops-change |
//!
//! `PING`, nickname collisions (`433`) and other join rejections
//! (`471`/`473`/`475`) are handled inside the transport. An invalid
//! nickname (`432`) ends [`IrcTransport`]'s run loop with a fatal error.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brass_adapter_irc::{IrcConfig, IrcTransport};
//!
//! let transport = Arc::new(IrcTransport::new(IrcConfig {
//!     server: "irc.libera.chat".into(),
//!     channels: vec!["#brass".into()],
//!     ..IrcConfig::default()
//! }));
//! bot.add_transport(transport.clone())?;
//! transport.run(dispatcher).await?;
//! ```

pub mod config;
pub mod message;
pub mod transport;

pub use config::IrcConfig;
pub use transport::IrcTransport;
