//! Link announcement and deduplication.
//!
//! ```text
//! chat-message ──▶ extract ──▶ canonicalize ──▶ store
//!                                   │
//!                                   ▼
//!                     summarize ──▶ throttle ──▶ announce + stash + url-found
//! ```

pub mod canonical;
pub mod engine;
pub mod extract;
pub mod stash;
pub mod summary;
pub mod throttle;

pub use canonical::canonicalize;
pub use engine::{LinkEngine, LinkRecord, LinkStore};
pub use extract::LinkExtractor;
pub use stash::MoreStash;
pub use summary::{PageSummarizer, PageSummary};
pub use throttle::{AnnounceThrottle, DEFAULT_COOLDOWN, DEFAULT_LINE_HORIZON};
